//! Data collaborators behind the tools.
//!
//! Each backend is a narrow async accessor. Failures are reported as
//! [`BackendError`] and turned into `{error}` payloads by the dispatcher, so
//! nothing here ever needs to know about the model or the conversation.

pub mod announcements;
pub mod employees;
pub mod policies;

use async_trait::async_trait;
use serde::Serialize;

pub use announcements::FsAnnouncementStore;
pub use employees::SqliteEmployeeDirectory;
pub use policies::LexicalPolicyIndex;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// --- Employee records ---

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Employee {
    pub emp_id: String,
    pub name: String,
    pub department: String,
    pub position: String,
    pub join_date: String,
    pub manager: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaveBalance {
    pub casual_leave: i64,
    pub earned_leave: i64,
    pub sick_leave: i64,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub employee: Employee,
    pub leave_balance: Option<LeaveBalance>,
}

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Accepts `EMP001`, `emp001` or a bare number such as `1`.
    async fn get_employee(&self, emp_id: &str) -> Result<EmployeeDetail, BackendError>;
    /// Case-insensitive substring match on the employee name.
    async fn search_employees(&self, name: &str) -> Result<Vec<Employee>, BackendError>;
    async fn employees_by_department(&self, department: &str)
        -> Result<Vec<Employee>, BackendError>;
    async fn all_employees(&self) -> Result<Vec<Employee>, BackendError>;
}

// --- Announcements ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Announcement {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnouncementMatch {
    pub filename: String,
    pub matching_lines: Vec<String>,
}

#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    async fn list_announcements(&self) -> Result<Vec<String>, BackendError>;
    async fn read_announcement(&self, filename: &str) -> Result<Announcement, BackendError>;
    async fn search_announcements(
        &self,
        keyword: &str,
    ) -> Result<Vec<AnnouncementMatch>, BackendError>;
}

// --- Policy documents ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyPassage {
    pub document: String,
    pub excerpt: String,
    pub score: f64,
}

#[async_trait]
pub trait PolicyIndex: Send + Sync {
    async fn search_policies(&self, query: &str) -> Result<Vec<PolicyPassage>, BackendError>;
    async fn list_policies(&self) -> Result<Vec<String>, BackendError>;
}
