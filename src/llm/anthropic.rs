use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::AppError;
use crate::history::{Role, ToolCall, Turn};

use super::types::{LlmRequest, LlmResponse, TokenUsage, ToolChoice};
use super::LlmProviderTrait;

pub struct AnthropicProvider {
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn from_env() -> Result<Self, AppError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            AppError::LlmError("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::LlmError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { api_key, client })
    }
}

// Anthropic API request/response types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    temperature: f64,
    max_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<AnthropicToolChoice>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicMessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicMessageContent {
    Text(String),
    Blocks(Vec<AnthropicContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct AnthropicToolChoice {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseContent>,
    model: String,
    usage: AnthropicUsage,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicResponseContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

/// Tool inputs must be objects on this API; unparseable arguments are sent
/// as an empty object so the history stays replayable.
fn arguments_to_input(arguments: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(arguments) {
        Ok(v @ serde_json::Value::Object(_)) => v,
        _ => serde_json::json!({}),
    }
}

/// Converts history into alternating user/assistant messages. Consecutive
/// tool results collapse into a single user message of `tool_result` blocks.
/// Assistant turns with neither text nor calls are dropped.
fn build_messages(turns: &[Turn]) -> Vec<AnthropicMessage> {
    let mut messages: Vec<AnthropicMessage> = Vec::with_capacity(turns.len());

    for turn in turns {
        match turn.role {
            Role::User => messages.push(AnthropicMessage {
                role: ROLE_USER.to_string(),
                content: AnthropicMessageContent::Text(turn.content.clone()),
            }),
            Role::Assistant if turn.has_calls() => {
                let mut blocks = Vec::with_capacity(turn.requested_calls.len() + 1);
                if !turn.content.is_empty() {
                    blocks.push(AnthropicContentBlock::Text {
                        text: turn.content.clone(),
                    });
                }
                blocks.extend(turn.requested_calls.iter().map(|c| {
                    AnthropicContentBlock::ToolUse {
                        id: c.call_id.clone(),
                        name: c.tool_name.clone(),
                        input: arguments_to_input(&c.arguments),
                    }
                }));
                messages.push(AnthropicMessage {
                    role: ROLE_ASSISTANT.to_string(),
                    content: AnthropicMessageContent::Blocks(blocks),
                });
            }
            Role::Assistant if turn.content.is_empty() => {}
            Role::Assistant => messages.push(AnthropicMessage {
                role: ROLE_ASSISTANT.to_string(),
                content: AnthropicMessageContent::Text(turn.content.clone()),
            }),
            Role::ToolResult => {
                let block = AnthropicContentBlock::ToolResult {
                    tool_use_id: turn.call_id.clone().unwrap_or_default(),
                    content: turn.content.clone(),
                };
                match messages.last_mut() {
                    Some(AnthropicMessage {
                        role,
                        content: AnthropicMessageContent::Blocks(blocks),
                    }) if *role == ROLE_USER => blocks.push(block),
                    _ => messages.push(AnthropicMessage {
                        role: ROLE_USER.to_string(),
                        content: AnthropicMessageContent::Blocks(vec![block]),
                    }),
                }
            }
        }
    }

    messages
}

/// Tools named by `tool_use` blocks in the history, in first-use order.
fn referenced_tools(turns: &[Turn]) -> Vec<AnthropicTool> {
    let mut names: Vec<&str> = Vec::new();
    for call in turns.iter().flat_map(|t| t.requested_calls.iter()) {
        if !names.contains(&call.tool_name.as_str()) {
            names.push(&call.tool_name);
        }
    }
    names
        .into_iter()
        .map(|name| AnthropicTool {
            name: name.to_string(),
            description: String::new(),
            input_schema: serde_json::json!({ "type": "object" }),
        })
        .collect()
}

fn build_request(request: &LlmRequest) -> AnthropicRequest {
    let (tools, tool_choice) = match &request.tools {
        Some(specs) => {
            let tools = specs
                .iter()
                .map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t.input_schema(),
                })
                .collect();
            let tool_choice = request.tool_choice.map(|choice| AnthropicToolChoice {
                kind: match choice {
                    ToolChoice::Auto => "auto",
                    ToolChoice::None => "none",
                },
            });
            (Some(tools), tool_choice)
        }
        // The Messages API rejects tool_use blocks unless their tools are
        // declared, so a tool-less request declares them with calls disabled.
        None => {
            let referenced = referenced_tools(&request.messages);
            if referenced.is_empty() {
                (None, None)
            } else {
                (Some(referenced), Some(AnthropicToolChoice { kind: "none" }))
            }
        }
    };

    AnthropicRequest {
        model: request.model.clone(),
        messages: build_messages(&request.messages),
        system: request.system.clone(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        tools,
        tool_choice,
    }
}

fn parse_response(api_response: AnthropicResponse) -> LlmResponse {
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for block in api_response.content {
        match block {
            AnthropicResponseContent::Text { text: t } => text.push_str(&t),
            AnthropicResponseContent::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::new(id, name, input.to_string()));
            }
        }
    }

    LlmResponse {
        content: if text.is_empty() { None } else { Some(text) },
        tool_calls,
        model: api_response.model,
        token_usage: TokenUsage {
            input_tokens: api_response.usage.input_tokens,
            output_tokens: api_response.usage.output_tokens,
        },
        stop_reason: api_response.stop_reason,
    }
}

#[async_trait]
impl LlmProviderTrait for AnthropicProvider {
    fn name(&self) -> &str {
        PROVIDER_ANTHROPIC
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, AppError> {
        let api_request = build_request(request);

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| AppError::LlmError(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if let Ok(err) = serde_json::from_str::<AnthropicError>(&body) {
                return Err(AppError::LlmError(format!(
                    "Anthropic API error ({}): {}",
                    status, err.error.message
                )));
            }
            return Err(AppError::LlmError(format!(
                "Anthropic API error ({}): {}",
                status, body
            )));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AppError::LlmError(format!("Failed to parse response: {e}")))?;

        Ok(parse_response(api_response))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::LlmError("Anthropic API key is empty".to_string()));
        }
        Ok(())
    }
}
