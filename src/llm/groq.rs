use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::AppError;
use crate::history::{Role, ToolCall, Turn};

use super::types::{LlmRequest, LlmResponse, TokenUsage, ToolChoice};
use super::LlmProviderTrait;

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Groq's OpenAI-compatible chat completions endpoint.
pub struct GroqProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GroqProvider {
    pub fn from_env() -> Result<Self, AppError> {
        let api_key = std::env::var("GROQ_API_KEY").map_err(|_| {
            AppError::LlmError("GROQ_API_KEY environment variable not set".to_string())
        })?;
        let provider = Self::new(api_key)?;
        Ok(match std::env::var("GROQ_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => provider.with_base_url(&url),
            _ => provider,
        })
    }

    pub fn new(api_key: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::LlmError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key,
            base_url: GROQ_BASE_URL.to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

// Chat completions request/response types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ChatToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: ChatFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    model: String,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    error: ChatErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ChatErrorDetail {
    message: String,
}

fn turn_to_message(turn: &Turn) -> ChatMessage {
    match turn.role {
        Role::User => ChatMessage {
            role: ROLE_USER.to_string(),
            content: Some(turn.content.clone()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        },
        Role::Assistant => ChatMessage {
            role: ROLE_ASSISTANT.to_string(),
            content: Some(turn.content.clone()),
            tool_calls: turn
                .requested_calls
                .iter()
                .map(|c| ChatToolCall {
                    id: c.call_id.clone(),
                    kind: function_type(),
                    function: ChatFunctionCall {
                        name: c.tool_name.clone(),
                        arguments: c.arguments.clone(),
                    },
                })
                .collect(),
            tool_call_id: None,
        },
        Role::ToolResult => ChatMessage {
            role: ROLE_TOOL.to_string(),
            content: Some(turn.content.clone()),
            tool_calls: Vec::new(),
            tool_call_id: turn.call_id.clone(),
        },
    }
}

fn build_request(request: &LlmRequest) -> ChatRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: Some(system.clone()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        });
    }
    messages.extend(request.messages.iter().map(turn_to_message));

    let tools = request.tools.as_ref().map(|specs| {
        specs
            .iter()
            .map(|t| ChatTool {
                kind: "function",
                function: ChatFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema(),
                },
            })
            .collect()
    });

    let tool_choice = request.tool_choice.map(|choice| match choice {
        ToolChoice::Auto => "auto",
        ToolChoice::None => "none",
    });

    ChatRequest {
        model: request.model.clone(),
        messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        tools,
        tool_choice,
    }
}

fn map_finish_reason(reason: &str) -> String {
    match reason {
        STOP_STOP => STOP_END_TURN.to_string(),
        "tool_calls" => STOP_TOOL_USE.to_string(),
        "length" => "max_tokens".to_string(),
        other => other.to_string(),
    }
}

fn parse_response(api_response: ChatResponse) -> Result<LlmResponse, AppError> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AppError::LlmError("No choices in response".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|c| ToolCall::new(c.id, c.function.name, c.function.arguments))
        .collect();

    let token_usage = api_response
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(LlmResponse {
        content: choice.message.content,
        tool_calls,
        model: api_response.model,
        token_usage,
        stop_reason: choice.finish_reason.as_deref().map(map_finish_reason),
    })
}

#[async_trait]
impl LlmProviderTrait for GroqProvider {
    fn name(&self) -> &str {
        PROVIDER_GROQ
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, AppError> {
        let api_request = build_request(request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| AppError::LlmError(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if let Ok(err) = serde_json::from_str::<ChatError>(&body) {
                return Err(AppError::LlmError(format!(
                    "Groq API error ({}): {}",
                    status, err.error.message
                )));
            }
            return Err(AppError::LlmError(format!(
                "Groq API error ({}): {}",
                status, body
            )));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::LlmError(format!("Failed to parse response: {e}")))?;

        parse_response(api_response)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::LlmError("Groq API key is empty".to_string()));
        }
        Ok(())
    }
}
