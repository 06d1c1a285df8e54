use crate::error::AppError;
use crate::history::{ToolCall, Turn};
use crate::llm::types::{LlmRequest, LlmResponse, ToolChoice};
use crate::tools::types::ToolSpec;

use super::phase::TurnPhase;
use super::Orchestrator;

impl Orchestrator {
    /// Runs one user turn through planning, dispatch and finalization and
    /// returns the assistant's reply.
    ///
    /// Every turn produced before a failure stays in the history; nothing is
    /// rolled back.
    pub async fn process_turn(&mut self, user_text: &str) -> Result<String, AppError> {
        self.history.append(Turn::user(user_text));

        let mut phase = TurnPhase::Planning;
        loop {
            tracing::debug!(phase = phase.name(), turns = self.history.len(), "turn phase");
            phase = match phase {
                TurnPhase::Planning => {
                    let request =
                        self.request(Some(self.tools.list_tools()), Some(ToolChoice::Auto));
                    let outcome = self.provider.complete(&request).await;
                    if let Ok(response) = &outcome {
                        self.record_plan(response);
                    }
                    TurnPhase::Planning.after_model_call(outcome)
                }
                TurnPhase::Dispatching(calls) => {
                    self.dispatch(&calls).await;
                    TurnPhase::Dispatching(calls).after_dispatch()
                }
                TurnPhase::Finalizing => {
                    self.warn_unanswered();
                    let outcome = self.provider.complete(&self.request(None, None)).await;
                    if let Ok(response) = &outcome {
                        self.record_final(response);
                    }
                    TurnPhase::Finalizing.after_model_call(outcome)
                }
                TurnPhase::Done(reply) => return Ok(reply),
                TurnPhase::Failed(e) => {
                    tracing::warn!("Turn failed: {e}");
                    return Err(e);
                }
            };
        }
    }

    /// Records the planning reply: a plain answer, or the requested calls.
    fn record_plan(&mut self, response: &LlmResponse) {
        log_usage("planning", response);
        let content = response.text().to_string();
        if response.tool_calls.is_empty() {
            self.history.append(Turn::assistant(content));
            return;
        }

        tracing::info!(
            "Model requested {} tool call(s): {}",
            response.tool_calls.len(),
            response
                .tool_calls
                .iter()
                .map(|c| c.tool_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.history
            .append(Turn::assistant_with_calls(content, response.tool_calls.clone()));
    }

    /// Runs the requested calls strictly in order, recording each result as
    /// soon as it is produced.
    async fn dispatch(&mut self, calls: &[ToolCall]) {
        for call in calls {
            let result = self.tools.dispatch(call).await;
            self.history
                .append(Turn::tool_result(call.call_id.clone(), result.to_content()));
        }
    }

    fn warn_unanswered(&self) {
        let unanswered = self.history.unanswered_calls();
        if !unanswered.is_empty() {
            tracing::warn!(
                "Finalizing with unanswered tool calls: {}",
                unanswered.join(", ")
            );
        }
    }

    fn record_final(&mut self, response: &LlmResponse) {
        log_usage("finalization", response);
        if !response.tool_calls.is_empty() {
            tracing::warn!(
                "Ignoring {} tool call(s) returned by the finalization call",
                response.tool_calls.len()
            );
        }
        self.history.append(Turn::assistant(response.text()));
    }

    fn request(&self, tools: Option<Vec<ToolSpec>>, tool_choice: Option<ToolChoice>) -> LlmRequest {
        LlmRequest {
            model: self.settings.model.clone(),
            system: Some(self.settings.system_prompt.clone()),
            messages: self.history.snapshot().to_vec(),
            tools,
            tool_choice,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }
}

fn log_usage(call: &str, response: &LlmResponse) {
    tracing::debug!(
        call,
        model = %response.model,
        input_tokens = response.token_usage.input_tokens,
        output_tokens = response.token_usage.output_tokens,
        stop_reason = response.stop_reason.as_deref().unwrap_or("-"),
        "model call completed"
    );
}
