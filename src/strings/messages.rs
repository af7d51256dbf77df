//! # Messages
//!
//! Contains constant strings and format functions for user-facing messages,
//! and the result/error texts fed back to the model after a tool call.

pub const EMPTY_MESSAGE_REPLY: &str = "Please send a message.";
pub const NO_COMMAND: &str = "Error: No command provided.";
pub const NO_OUTPUT: &str = "Success (no output)";

pub fn command_output(command: &str, output: &str) -> String {
    format!("Command: {command}\n\n{output}")
}

pub fn command_no_output(command: &str) -> String {
    format!("Command: {command}\n{NO_OUTPUT}")
}

pub fn command_failed(stderr: &str) -> String {
    let detail = if stderr.is_empty() {
        "Command failed"
    } else {
        stderr
    };
    format!("Error:\n{detail}")
}

pub fn command_timed_out(secs: u64) -> String {
    format!("Error: Command timed out after {secs} seconds")
}

pub fn verb_not_allowed(verb: &str) -> String {
    format!("Error: Command verb '{verb}' is not allowed for safety reasons.")
}

pub fn execution_error(err: &str) -> String {
    format!("Execution error: {err}")
}

pub fn tool_failed(err: &str) -> String {
    format!("Tool execution failed: {err}")
}
