use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::backends::{AnnouncementStore, BackendError};
use crate::constants::*;

use super::types::{ParamKind, ParamSpec, ToolSpec};
use super::{string_arg, Tool, ToolCategory};

pub struct ListAnnouncementsTool {
    store: Arc<dyn AnnouncementStore>,
}

impl ListAnnouncementsTool {
    pub fn new(store: Arc<dyn AnnouncementStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListAnnouncementsTool {
    fn name(&self) -> &str {
        TOOL_LIST_ANNOUNCEMENTS
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Announcements
    }

    fn definition(&self) -> ToolSpec {
        ToolSpec::new(TOOL_LIST_ANNOUNCEMENTS, "List all available announcement files")
    }

    async fn execute(&self, _args: &Map<String, Value>) -> Result<Value, BackendError> {
        let files = self.store.list_announcements().await?;
        Ok(json!({ "count": files.len(), "announcements": files }))
    }
}

pub struct ReadAnnouncementTool {
    store: Arc<dyn AnnouncementStore>,
}

impl ReadAnnouncementTool {
    pub fn new(store: Arc<dyn AnnouncementStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadAnnouncementTool {
    fn name(&self) -> &str {
        TOOL_READ_ANNOUNCEMENT
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Announcements
    }

    fn definition(&self) -> ToolSpec {
        ToolSpec::new(
            TOOL_READ_ANNOUNCEMENT,
            "Read the full content of a specific announcement file",
        )
        .param(ParamSpec::new(
            "filename",
            ParamKind::String,
            "Name of the announcement file (e.g., 'holiday_2024.txt')",
            true,
        ))
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, BackendError> {
        let filename = string_arg(args, "filename")?;
        let announcement = self.store.read_announcement(filename).await?;
        Ok(json!(announcement))
    }
}

pub struct SearchAnnouncementsTool {
    store: Arc<dyn AnnouncementStore>,
}

impl SearchAnnouncementsTool {
    pub fn new(store: Arc<dyn AnnouncementStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SearchAnnouncementsTool {
    fn name(&self) -> &str {
        TOOL_SEARCH_ANNOUNCEMENTS
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Announcements
    }

    fn definition(&self) -> ToolSpec {
        ToolSpec::new(TOOL_SEARCH_ANNOUNCEMENTS, "Search announcements by keyword").param(
            ParamSpec::new(
                "keyword",
                ParamKind::String,
                "Keyword to search for in announcements",
                true,
            ),
        )
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, BackendError> {
        let keyword = string_arg(args, "keyword")?;
        let matches = self.store.search_announcements(keyword).await?;
        Ok(json!({
            "keyword": keyword,
            "count": matches.len(),
            "results": matches,
        }))
    }
}
