use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::backends::{BackendError, PolicyIndex};
use crate::constants::*;

use super::types::{ParamKind, ParamSpec, ToolSpec};
use super::{string_arg, Tool, ToolCategory};

pub struct SearchPoliciesTool {
    index: Arc<dyn PolicyIndex>,
}

impl SearchPoliciesTool {
    pub fn new(index: Arc<dyn PolicyIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for SearchPoliciesTool {
    fn name(&self) -> &str {
        TOOL_SEARCH_POLICIES
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Policies
    }

    fn definition(&self) -> ToolSpec {
        ToolSpec::new(
            TOOL_SEARCH_POLICIES,
            "Search policy documents. Use this for questions about leave policy, \
             salary policy, or other HR policies.",
        )
        .param(ParamSpec::new(
            "query",
            ParamKind::String,
            "Natural language question about policies",
            true,
        ))
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, BackendError> {
        let query = string_arg(args, "query")?;
        let passages = self.index.search_policies(query).await?;
        Ok(json!({
            "query": query,
            "count": passages.len(),
            "results": passages,
        }))
    }
}

pub struct ListPoliciesTool {
    index: Arc<dyn PolicyIndex>,
}

impl ListPoliciesTool {
    pub fn new(index: Arc<dyn PolicyIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for ListPoliciesTool {
    fn name(&self) -> &str {
        TOOL_LIST_POLICIES
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Policies
    }

    fn definition(&self) -> ToolSpec {
        ToolSpec::new(TOOL_LIST_POLICIES, "List all available policy documents")
    }

    async fn execute(&self, _args: &Map<String, Value>) -> Result<Value, BackendError> {
        let documents = self.index.list_policies().await?;
        Ok(json!({ "count": documents.len(), "policies": documents }))
    }
}
