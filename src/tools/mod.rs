pub mod announcements;
pub mod employees;
pub mod policies;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backends::{AnnouncementStore, BackendError, EmployeeDirectory, PolicyIndex};
use crate::error::AppError;
use crate::history::ToolCall;
use types::{ToolResult, ToolSpec};

/// Implemented by every tool offered to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Identifier passed to the LLM API.
    fn name(&self) -> &str;

    /// Which backend the tool reads from (display and analytics only).
    fn category(&self) -> ToolCategory;

    fn definition(&self) -> ToolSpec;

    /// Runs the tool. Arguments have already been parsed and checked for the
    /// required parameters.
    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Employees,
    Announcements,
    Policies,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub category: ToolCategory,
    pub description: String,
}

/// Name → tool lookup that preserves registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The nine HR tools, in the order they are offered to the model.
    pub fn with_backends(
        employees: Arc<dyn EmployeeDirectory>,
        announcements: Arc<dyn AnnouncementStore>,
        policies: Arc<dyn PolicyIndex>,
    ) -> Result<Self, AppError> {
        let mut registry = Self::new();
        registry.register(Box::new(employees::GetEmployeeTool::new(employees.clone())))?;
        registry.register(Box::new(employees::SearchEmployeesTool::new(employees.clone())))?;
        registry.register(Box::new(employees::EmployeesByDepartmentTool::new(
            employees.clone(),
        )))?;
        registry.register(Box::new(employees::AllEmployeesTool::new(employees)))?;
        registry.register(Box::new(announcements::ListAnnouncementsTool::new(
            announcements.clone(),
        )))?;
        registry.register(Box::new(announcements::ReadAnnouncementTool::new(
            announcements.clone(),
        )))?;
        registry.register(Box::new(announcements::SearchAnnouncementsTool::new(
            announcements,
        )))?;
        registry.register(Box::new(policies::SearchPoliciesTool::new(policies.clone())))?;
        registry.register(Box::new(policies::ListPoliciesTool::new(policies)))?;
        Ok(registry)
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), AppError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(AppError::InvalidInput(format!(
                "Tool '{name}' is already registered"
            )));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// Tool catalog in registration order.
    pub fn list_tools(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn tool_infos(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                category: t.category(),
                description: t.definition().description,
            })
            .collect()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Parses the model's serialized arguments and executes the call. Never
    /// fails: every problem is reported as a [`ToolResult::Error`].
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        if self.get(&call.tool_name).is_none() {
            return ToolResult::error(format!("Unknown tool: {}", call.tool_name));
        }
        match parse_arguments(&call.arguments) {
            Ok(args) => self.execute(&call.tool_name, &args).await,
            Err(reason) => {
                ToolResult::error(format!("Invalid arguments for {}: {reason}", call.tool_name))
            }
        }
    }

    /// Executes a tool with already-parsed arguments.
    pub async fn execute(&self, name: &str, args: &Map<String, Value>) -> ToolResult {
        let Some(tool) = self.get(name) else {
            return ToolResult::error(format!("Unknown tool: {name}"));
        };

        let definition = tool.definition();
        if let Some(missing) = definition
            .required_params()
            .find(|p| args.get(*p).map_or(true, Value::is_null))
        {
            return ToolResult::error(format!(
                "Missing required argument '{missing}' for {name}"
            ));
        }

        let rendered = Value::Object(args.clone()).to_string();
        tracing::debug!("Executing tool {name} with {rendered}");
        match tool.execute(args).await {
            Ok(value) => {
                tracing::info!("Tool {name} succeeded");
                ToolResult::ok(value)
            }
            Err(e) => {
                tracing::warn!("Tool {name} failed: {e}");
                ToolResult::error(format!("Tool execution failed: {e}"))
            }
        }
    }
}

/// Blank payloads mean "no arguments"; anything else must be a JSON object.
fn parse_arguments(raw: &str) -> Result<Map<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(e) => Err(e.to_string()),
    }
}

pub(crate) fn string_arg<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, BackendError> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(BackendError::InvalidInput(format!(
            "'{key}' must be a string, got {other}"
        ))),
        None => Err(BackendError::InvalidInput(format!("'{key}' is required"))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backends::announcements::tests::fixture;
    use crate::backends::employees::tests::seeded;
    use crate::backends::policies::tests::sample_index;
    use crate::backends::FsAnnouncementStore;

    /// Registry wired to seeded in-memory backends. The returned directory
    /// guard must outlive the registry.
    pub(crate) async fn demo_registry() -> (ToolRegistry, tempfile::TempDir) {
        let dir = fixture();
        let registry = ToolRegistry::with_backends(
            Arc::new(seeded().await),
            Arc::new(FsAnnouncementStore::new(dir.path())),
            Arc::new(sample_index()),
        )
        .unwrap();
        (registry, dir)
    }

    fn call(name: &str, args: &str) -> ToolCall {
        ToolCall::new("call_1", name, args)
    }

    #[tokio::test]
    async fn catalog_is_ordered_and_stable() {
        let (registry, _dir) = demo_registry().await;
        let first = registry.list_tools();
        let second = registry.list_tools();

        assert_eq!(first, second);
        let names: Vec<&str> = first.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "get_employee",
                "search_employees",
                "get_employees_by_department",
                "get_all_employees",
                "list_announcements",
                "read_announcement",
                "search_announcements",
                "search_policies",
                "list_policies",
            ]
        );
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let (mut registry, _dir) = demo_registry().await;
        let duplicate = policies::ListPoliciesTool::new(Arc::new(sample_index()));
        assert!(registry.register(Box::new(duplicate)).is_err());
        assert_eq!(registry.len(), 9);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_payload() {
        let (registry, _dir) = demo_registry().await;
        let result = registry.dispatch(&call("fly_to_moon", "{}")).await;
        assert_eq!(result, ToolResult::error("Unknown tool: fly_to_moon"));
    }

    #[tokio::test]
    async fn malformed_arguments_are_an_error_payload() {
        let (registry, _dir) = demo_registry().await;

        let result = registry.dispatch(&call("search_employees", "{\"name\": ")).await;
        let ToolResult::Error(message) = result else {
            panic!("expected error");
        };
        assert!(message.starts_with("Invalid arguments for search_employees"));

        let result = registry.dispatch(&call("search_employees", "[\"Priya\"]")).await;
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn missing_required_argument_is_reported() {
        let (registry, _dir) = demo_registry().await;
        let result = registry.dispatch(&call("get_employees_by_department", "{}")).await;
        assert_eq!(
            result,
            ToolResult::error(
                "Missing required argument 'department' for get_employees_by_department"
            )
        );
    }

    #[tokio::test]
    async fn blank_arguments_mean_no_arguments() {
        let (registry, _dir) = demo_registry().await;
        let result = registry.dispatch(&call("get_all_employees", "")).await;
        let ToolResult::Success(value) = result else {
            panic!("expected success");
        };
        assert_eq!(value["count"], 10);
    }

    #[tokio::test]
    async fn backend_failure_is_wrapped() {
        let (registry, _dir) = demo_registry().await;
        let result = registry
            .dispatch(&call("get_employee", r#"{"employee_id": "EMP404"}"#))
            .await;
        assert_eq!(
            result,
            ToolResult::error("Tool execution failed: Employee EMP404 not found")
        );
    }

    #[tokio::test]
    async fn department_lookup_returns_records() {
        let (registry, _dir) = demo_registry().await;
        let result = registry
            .dispatch(&call(
                "get_employees_by_department",
                r#"{"department": "Engineering"}"#,
            ))
            .await;
        let value = result.to_json();
        assert_eq!(value["count"], 3);
        assert_eq!(value["employees"][0]["name"], "Rajesh Kumar");
    }
}
