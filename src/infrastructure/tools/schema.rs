//! Function-calling schema of the command tool, and decoding of its arguments.

use serde::Deserialize;
use serde_json::json;

use crate::domain::types::{ToolCallRequest, ToolDefinition};
use crate::strings::prompts;

/// Name the model uses to call the command tool.
pub const TOOL_NAME: &str = "execute_kubectl";

/// Problems with a tool call that stop it before the executor sees it.
#[derive(Debug, thiserror::Error)]
pub enum ToolCallError {
    #[error("invalid arguments: {0}")]
    ArgumentParse(#[from] serde_json::Error),
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
}

/// Decoded arguments of an `execute_kubectl` call. A missing `command_parts`
/// decodes as empty and is rejected downstream as an empty command.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommandArgs {
    #[serde(default)]
    pub command_parts: Vec<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: prompts::TOOL_DESCRIPTION.to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "command_parts": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": prompts::COMMAND_PARTS_DESCRIPTION,
                }
            },
            "required": ["command_parts"],
        }),
    }
}

pub fn parse_call(call: &ToolCallRequest) -> Result<CommandArgs, ToolCallError> {
    if call.function_name != TOOL_NAME {
        return Err(ToolCallError::UnknownTool(call.function_name.clone()));
    }
    // Some models send an empty string for "no arguments".
    if call.arguments.trim().is_empty() {
        return Ok(CommandArgs::default());
    }
    Ok(serde_json::from_str(&call.arguments)?)
}
