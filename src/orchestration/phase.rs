use crate::error::AppError;
use crate::history::ToolCall;
use crate::llm::types::LlmResponse;

/// Where a user turn currently is.
///
/// `Planning` and `Finalizing` make a model call and are the only phases
/// that can reach `Failed`. `Dispatching` always leads to `Finalizing`, and
/// a `Finalizing` reply always ends the turn, so a turn contains at most one
/// tool round.
#[derive(Debug)]
pub enum TurnPhase {
    Planning,
    Dispatching(Vec<ToolCall>),
    Finalizing,
    Done(String),
    Failed(AppError),
}

impl TurnPhase {
    pub fn name(&self) -> &'static str {
        match self {
            TurnPhase::Planning => "planning",
            TurnPhase::Dispatching(_) => "dispatching",
            TurnPhase::Finalizing => "finalizing",
            TurnPhase::Done(_) => "done",
            TurnPhase::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnPhase::Done(_) | TurnPhase::Failed(_))
    }

    /// Next phase once the model call made in this phase has returned.
    pub fn after_model_call(self, outcome: Result<LlmResponse, AppError>) -> TurnPhase {
        match (self, outcome) {
            (TurnPhase::Planning | TurnPhase::Finalizing, Err(e)) => TurnPhase::Failed(e),
            (TurnPhase::Planning, Ok(response)) if !response.tool_calls.is_empty() => {
                TurnPhase::Dispatching(response.tool_calls)
            }
            (TurnPhase::Planning | TurnPhase::Finalizing, Ok(response)) => {
                TurnPhase::Done(response.content.unwrap_or_default())
            }
            (phase, _) => TurnPhase::Failed(AppError::Internal(format!(
                "no model call is made in the {} phase",
                phase.name()
            ))),
        }
    }

    /// Next phase once every requested call has a recorded result.
    pub fn after_dispatch(self) -> TurnPhase {
        match self {
            TurnPhase::Dispatching(_) => TurnPhase::Finalizing,
            phase => TurnPhase::Failed(AppError::Internal(format!(
                "nothing is dispatched in the {} phase",
                phase.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::TokenUsage;

    fn reply(content: Option<&str>, calls: &[&str]) -> Result<LlmResponse, AppError> {
        Ok(LlmResponse {
            content: content.map(str::to_string),
            tool_calls: calls
                .iter()
                .enumerate()
                .map(|(i, name)| ToolCall::new(format!("c{i}"), *name, "{}"))
                .collect(),
            model: "test-model".into(),
            token_usage: TokenUsage::default(),
            stop_reason: None,
        })
    }

    fn failure() -> Result<LlmResponse, AppError> {
        Err(AppError::LlmError("connection reset".into()))
    }

    #[test]
    fn planning_without_calls_is_done() {
        let next = TurnPhase::Planning.after_model_call(reply(Some("Hi!"), &[]));
        assert!(matches!(next, TurnPhase::Done(ref text) if text == "Hi!"));
    }

    #[test]
    fn planning_with_calls_dispatches_them_in_order() {
        let next = TurnPhase::Planning
            .after_model_call(reply(None, &["list_policies", "list_announcements"]));
        let calls = match next {
            TurnPhase::Dispatching(calls) => calls,
            other => panic!("expected dispatching, got {}", other.name()),
        };
        let names: Vec<_> = calls.iter().map(|c| c.tool_name.as_str()).collect();
        assert_eq!(names, vec!["list_policies", "list_announcements"]);
    }

    #[test]
    fn dispatching_always_leads_to_finalizing() {
        let next = TurnPhase::Dispatching(Vec::new()).after_dispatch();
        assert!(matches!(next, TurnPhase::Finalizing));
    }

    #[test]
    fn finalizing_never_opens_another_tool_round() {
        let next = TurnPhase::Finalizing.after_model_call(reply(Some("Done."), &["list_policies"]));
        assert!(matches!(next, TurnPhase::Done(ref text) if text == "Done."));

        let next = TurnPhase::Finalizing.after_model_call(reply(None, &[]));
        assert!(matches!(next, TurnPhase::Done(ref text) if text.is_empty()));
    }

    #[test]
    fn model_failures_fail_the_turn() {
        let planning = TurnPhase::Planning.after_model_call(failure());
        assert!(matches!(planning, TurnPhase::Failed(AppError::LlmError(_))));

        let finalizing = TurnPhase::Finalizing.after_model_call(failure());
        assert!(matches!(finalizing, TurnPhase::Failed(AppError::LlmError(_))));
        assert!(finalizing.is_terminal());
    }

    #[test]
    fn other_phases_cannot_take_model_replies() {
        for phase in [
            TurnPhase::Dispatching(Vec::new()),
            TurnPhase::Done("x".into()),
        ] {
            let next = phase.after_model_call(failure());
            assert!(matches!(next, TurnPhase::Failed(AppError::Internal(_))));
        }
        let next = TurnPhase::Planning.after_dispatch();
        assert!(matches!(next, TurnPhase::Failed(AppError::Internal(_))));
    }
}
