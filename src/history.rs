use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolResult,
}

/// A single tool invocation requested by the model.
///
/// `arguments` is kept in the serialized form the model produced. Parsing
/// happens at dispatch time so a malformed payload becomes a tool error
/// instead of a protocol failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments: arguments.into(),
        }
    }
}

/// One role-tagged entry in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requested_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            requested_calls: Vec::new(),
            call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            requested_calls: Vec::new(),
            call_id: None,
        }
    }

    /// Assistant turn that asks for tools. `content` may be empty.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            requested_calls: calls,
            call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::ToolResult,
            content: content.into(),
            requested_calls: Vec::new(),
            call_id: Some(call_id.into()),
        }
    }

    pub fn has_calls(&self) -> bool {
        !self.requested_calls.is_empty()
    }
}

/// Append-only conversation log for one session.
#[derive(Debug, Default)]
pub struct HistoryStore {
    turns: Vec<Turn>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Read-only view of every turn in order.
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Call ids requested by the most recent tool-requesting assistant turn
    /// that have no matching tool-result turn after it.
    pub fn unanswered_calls(&self) -> Vec<String> {
        let Some(pos) = self.turns.iter().rposition(Turn::has_calls) else {
            return Vec::new();
        };
        let answered: HashSet<&str> = self.turns[pos + 1..]
            .iter()
            .filter(|t| t.role == Role::ToolResult)
            .filter_map(|t| t.call_id.as_deref())
            .collect();
        self.turns[pos]
            .requested_calls
            .iter()
            .filter(|c| !answered.contains(c.call_id.as_str()))
            .map(|c| c.call_id.clone())
            .collect()
    }

    /// Tool names requested in turns appended at or after `mark`, in request
    /// order. Callers take `len()` before a turn and pass it here afterwards.
    pub fn tools_requested_since(&self, mark: usize) -> Vec<String> {
        self.turns
            .iter()
            .skip(mark)
            .flat_map(|t| t.requested_calls.iter().map(|c| c.tool_name.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall::new(id, name, "{}")
    }

    #[test]
    fn reset_empties_history() {
        let mut history = HistoryStore::new();
        history.append(Turn::user("hi"));
        history.append(Turn::assistant("hello"));
        assert_eq!(history.len(), 2);

        history.reset();
        assert!(history.is_empty());
        assert!(history.snapshot().is_empty());
    }

    #[test]
    fn unanswered_calls_tracks_latest_request() {
        let mut history = HistoryStore::new();
        history.append(Turn::user("who is in HR and Sales?"));
        history.append(Turn::assistant_with_calls(
            "",
            vec![
                call("c1", "get_employees_by_department"),
                call("c2", "get_employees_by_department"),
            ],
        ));
        history.append(Turn::tool_result("c1", "{}"));

        assert_eq!(history.unanswered_calls(), vec!["c2".to_string()]);

        history.append(Turn::tool_result("c2", "{}"));
        assert!(history.unanswered_calls().is_empty());
    }

    #[test]
    fn unanswered_calls_empty_without_requests() {
        let mut history = HistoryStore::new();
        history.append(Turn::user("Hello"));
        history.append(Turn::assistant("Hi there"));
        assert!(history.unanswered_calls().is_empty());
    }

    #[test]
    fn tools_requested_since_only_counts_new_turns() {
        let mut history = HistoryStore::new();
        history.append(Turn::user("first"));
        history.append(Turn::assistant_with_calls("", vec![call("a", "list_policies")]));
        history.append(Turn::tool_result("a", "{}"));
        history.append(Turn::assistant("done"));

        let mark = history.len();
        history.append(Turn::user("second"));
        history.append(Turn::assistant_with_calls(
            "",
            vec![call("b", "search_employees"), call("c", "list_announcements")],
        ));

        assert_eq!(
            history.tools_requested_since(mark),
            vec!["search_employees".to_string(), "list_announcements".to_string()]
        );
    }

    #[test]
    fn turn_serialization_omits_empty_fields() {
        let json = serde_json::to_value(Turn::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "user", "content": "hi" }));

        let json = serde_json::to_value(Turn::tool_result("c9", "{\"count\":0}")).unwrap();
        assert_eq!(json["role"], "tool_result");
        assert_eq!(json["call_id"], "c9");
    }
}
