//! # Infrastructure Layer
//!
//! Handles interactions with external systems: the language model API and the cluster CLI.
//! Implements the traits defined in the Domain layer (`ChatModel`, `ProcessRunner`).

pub mod llm;
pub mod tools;
