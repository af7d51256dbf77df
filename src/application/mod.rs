//! # Application Layer
//!
//! Contains the conversation state and the orchestration of a chat exchange:
//! model turns, tool dispatch, and history retention.

pub mod conversation;
pub mod orchestrator;
