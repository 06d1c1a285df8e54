use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::backends::{BackendError, EmployeeDirectory};
use crate::constants::*;

use super::types::{ParamKind, ParamSpec, ToolSpec};
use super::{string_arg, Tool, ToolCategory};

pub struct GetEmployeeTool {
    directory: Arc<dyn EmployeeDirectory>,
}

impl GetEmployeeTool {
    pub fn new(directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for GetEmployeeTool {
    fn name(&self) -> &str {
        TOOL_GET_EMPLOYEE
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Employees
    }

    fn definition(&self) -> ToolSpec {
        ToolSpec::new(
            TOOL_GET_EMPLOYEE,
            "Get detailed information about an employee by ID, \
             including their remaining leave balance",
        )
        .param(ParamSpec::new(
            "employee_id",
            ParamKind::String,
            "The employee ID (e.g., 'EMP001')",
            true,
        ))
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, BackendError> {
        // Models often send the numeric part only; the directory resolves both.
        let emp_id = match args.get("employee_id") {
            Some(Value::Number(n)) => n.to_string(),
            _ => string_arg(args, "employee_id")?.to_string(),
        };
        let detail = self.directory.get_employee(&emp_id).await?;
        Ok(json!({ "employee": detail }))
    }
}

pub struct SearchEmployeesTool {
    directory: Arc<dyn EmployeeDirectory>,
}

impl SearchEmployeesTool {
    pub fn new(directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for SearchEmployeesTool {
    fn name(&self) -> &str {
        TOOL_SEARCH_EMPLOYEES
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Employees
    }

    fn definition(&self) -> ToolSpec {
        ToolSpec::new(TOOL_SEARCH_EMPLOYEES, "Search for employees by name (partial match)").param(
            ParamSpec::new(
                "name",
                ParamKind::String,
                "Name or partial name to search for",
                true,
            ),
        )
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, BackendError> {
        let name = string_arg(args, "name")?;
        let employees = self.directory.search_employees(name).await?;
        Ok(json!({
            "query": name,
            "count": employees.len(),
            "employees": employees,
        }))
    }
}

pub struct EmployeesByDepartmentTool {
    directory: Arc<dyn EmployeeDirectory>,
}

impl EmployeesByDepartmentTool {
    pub fn new(directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for EmployeesByDepartmentTool {
    fn name(&self) -> &str {
        TOOL_GET_EMPLOYEES_BY_DEPARTMENT
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Employees
    }

    fn definition(&self) -> ToolSpec {
        ToolSpec::new(
            TOOL_GET_EMPLOYEES_BY_DEPARTMENT,
            "Get all employees in a specific department",
        )
        .param(ParamSpec::new(
            "department",
            ParamKind::String,
            "Department name (e.g., 'Engineering', 'HR', 'Sales')",
            true,
        ))
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, BackendError> {
        let department = string_arg(args, "department")?;
        let employees = self.directory.employees_by_department(department).await?;
        Ok(json!({
            "department": department,
            "count": employees.len(),
            "employees": employees,
        }))
    }
}

pub struct AllEmployeesTool {
    directory: Arc<dyn EmployeeDirectory>,
}

impl AllEmployeesTool {
    pub fn new(directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for AllEmployeesTool {
    fn name(&self) -> &str {
        TOOL_GET_ALL_EMPLOYEES
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Employees
    }

    fn definition(&self) -> ToolSpec {
        ToolSpec::new(
            TOOL_GET_ALL_EMPLOYEES,
            "Get a list of all employees in the database",
        )
    }

    async fn execute(&self, _args: &Map<String, Value>) -> Result<Value, BackendError> {
        let employees = self.directory.all_employees().await?;
        Ok(json!({
            "count": employees.len(),
            "employees": employees,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::employees::tests::seeded;

    #[tokio::test]
    async fn numeric_employee_id_is_accepted() {
        let tool = GetEmployeeTool::new(Arc::new(seeded().await));
        let mut args = Map::new();
        args.insert("employee_id".into(), json!(2));

        let value = tool.execute(&args).await.unwrap();
        assert_eq!(value["employee"]["emp_id"], "EMP002");
        assert_eq!(value["employee"]["department"], "HR");
        assert!(value["employee"]["leave_balance"]["sick_leave"].is_number());
    }

    #[tokio::test]
    async fn wrong_argument_type_is_invalid_input() {
        let tool = SearchEmployeesTool::new(Arc::new(seeded().await));
        let mut args = Map::new();
        args.insert("name".into(), json!(["Priya"]));

        let err = tool.execute(&args).await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidInput(_)));
    }
}
