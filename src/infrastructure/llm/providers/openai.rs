//! OpenAI-compatible API provider
//!
//! Supports OpenAI, Groq, XAI, DeepAI and other OpenAI-compatible APIs,
//! including the function-calling fields (`tools`, `tool_calls`, `tool_call_id`).

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ProviderConfig;
use crate::domain::types::{ChatRequest, Message, ModelReply, ToolCallRequest, ToolDefinition};
use crate::infrastructure::llm::{Error, Provider, Response, TokenUsage};

/// HTTP client reused across requests
fn http_client() -> &'static Client {
    use std::sync::OnceLock;
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client")
    })
}

/// OpenAI API request format
#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: String,
    messages: Vec<OpenAIMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAITool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAIToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct OpenAITool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: &'a ToolDefinition,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct OpenAIResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct OpenAIChoice {
    message: OpenAIChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

fn to_wire_message(msg: &Message) -> OpenAIMessage<'_> {
    OpenAIMessage {
        role: msg.role.as_str(),
        content: msg.content.as_deref(),
        tool_calls: msg
            .tool_calls
            .iter()
            .map(|call| OpenAIToolCall {
                id: call.id.clone(),
                call_type: function_type(),
                function: OpenAIFunctionCall {
                    name: call.function_name.clone(),
                    arguments: call.arguments.clone(),
                },
            })
            .collect(),
        tool_call_id: msg.tool_call_id.as_deref(),
        name: msg.name.as_deref(),
    }
}

fn build_request<'a>(model: String, request: &'a ChatRequest) -> OpenAIRequest<'a> {
    let tools: Vec<OpenAITool<'a>> = request
        .tools
        .iter()
        .map(|function| OpenAITool {
            tool_type: "function",
            function,
        })
        .collect();
    let tool_choice = (!tools.is_empty()).then_some("auto");

    OpenAIRequest {
        model,
        messages: request.messages.iter().map(to_wire_message).collect(),
        tools,
        tool_choice,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

fn into_response(provider: Provider, body: OpenAIResponse) -> Result<Response, Error> {
    let Some(choice) = body.choices.into_iter().next() else {
        return Err(Error::new(provider.display_name(), "No choices in response"));
    };

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCallRequest {
            id: call.id,
            function_name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect();

    let usage = body
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(Response {
        reply: ModelReply {
            content: choice.message.content,
            tool_calls,
        },
        model: body.model,
        usage,
    })
}

/// Execute a chat request using OpenAI-compatible API
pub async fn chat(
    provider: Provider,
    config: ProviderConfig,
    request: ChatRequest,
) -> Result<Response, Error> {
    let name = provider.display_name();
    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| provider.default_base_url().to_string());
    let model = if config.default_model.is_empty() {
        "gpt-4o".to_string()
    } else {
        config.default_model.clone()
    };

    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    let body = build_request(model, &request);

    // Make HTTP request
    let mut request_builder = http_client()
        .post(&url)
        .header("Authorization", format!("Bearer {}", config.api_key))
        .header("Content-Type", "application/json")
        .json(&body);

    if let Some(timeout_secs) = config.timeout {
        request_builder = request_builder.timeout(std::time::Duration::from_secs(timeout_secs));
    }

    let response = request_builder
        .send()
        .await
        .map_err(|e| Error::new(name, format!("HTTP request failed: {}", e)))?;

    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        // Try to parse error message from response
        if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(&error_text)
            && let Some(error_msg) = error_json
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
        {
            return Err(Error::new(name, error_msg));
        }

        return Err(Error::new(name, format!("HTTP {}: {}", status, error_text)));
    }

    // Parse response
    let openai_response: OpenAIResponse = response
        .json()
        .await
        .map_err(|e| Error::new(name, format!("Failed to parse response: {}", e)))?;

    let response = into_response(provider, openai_response)?;
    tracing::debug!(
        model = %response.model,
        prompt_tokens = response.usage.prompt_tokens,
        completion_tokens = response.usage.completion_tokens,
        total_tokens = response.usage.total_tokens,
        tool_calls = response.reply.tool_calls.len(),
        "Model response received"
    );
    Ok(response)
}
