//! Test double that replays canned model responses and records every request.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AppError;
use crate::history::ToolCall;

use super::types::{LlmRequest, LlmResponse, TokenUsage};
use super::LlmProviderTrait;

pub(crate) enum Scripted {
    Reply(LlmResponse),
    Fail(String),
}

pub(crate) struct ScriptedProvider {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<LlmRequest>>,
    health_error: Option<String>,
}

impl ScriptedProvider {
    pub(crate) fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            health_error: None,
        }
    }

    pub(crate) fn unhealthy(mut self, message: &str) -> Self {
        self.health_error = Some(message.to_string());
        self
    }

    pub(crate) fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub(crate) fn text(content: &str) -> Scripted {
    Scripted::Reply(LlmResponse {
        content: Some(content.to_string()),
        tool_calls: Vec::new(),
        model: "scripted-model".into(),
        token_usage: TokenUsage::default(),
        stop_reason: Some("end_turn".into()),
    })
}

pub(crate) fn calls(calls: &[(&str, &str, &str)]) -> Scripted {
    Scripted::Reply(LlmResponse {
        content: None,
        tool_calls: calls
            .iter()
            .map(|(id, name, args)| ToolCall::new(*id, *name, *args))
            .collect(),
        model: "scripted-model".into(),
        token_usage: TokenUsage::default(),
        stop_reason: Some("tool_use".into()),
    })
}

pub(crate) fn fail(message: &str) -> Scripted {
    Scripted::Fail(message.to_string())
}

#[async_trait]
impl LlmProviderTrait for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, AppError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(AppError::LlmError(message)),
            None => Err(AppError::LlmError("script exhausted".into())),
        }
    }

    async fn health_check(&self) -> Result<(), AppError> {
        match &self.health_error {
            Some(message) => Err(AppError::LlmError(message.clone())),
            None => Ok(()),
        }
    }
}
