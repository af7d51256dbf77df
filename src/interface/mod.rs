//! # Interface Layer
//!
//! The HTTP surface that exposes the chat orchestrator.

pub mod http;
