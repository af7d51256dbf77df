//! # Tools Module
//!
//! The single tool offered to the model: policy-gated execution of the cluster CLI.

pub mod executor;
pub mod policy;
pub mod schema;
