mod context;
mod phase;
mod turn;

use std::sync::Arc;

pub use context::ModelSettings;
pub use phase::TurnPhase;

use crate::history::{HistoryStore, Turn};
use crate::llm::LlmProviderTrait;
use crate::tools::types::ToolSpec;
use crate::tools::ToolRegistry;

/// Drives one conversation: owns its history and mediates between the model
/// and the tool registry. Create one per session.
pub struct Orchestrator {
    provider: Arc<dyn LlmProviderTrait>,
    tools: Arc<ToolRegistry>,
    settings: ModelSettings,
    history: HistoryStore,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LlmProviderTrait>,
        tools: Arc<ToolRegistry>,
        settings: ModelSettings,
    ) -> Self {
        Self {
            provider,
            tools,
            settings,
            history: HistoryStore::new(),
        }
    }

    /// Discards every turn of the session.
    pub fn reset_session(&mut self) {
        tracing::info!("Conversation history cleared ({} turns)", self.history.len());
        self.history.reset();
    }

    pub fn get_history(&self) -> &[Turn] {
        self.history.snapshot()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn list_tools(&self) -> Vec<ToolSpec> {
        self.tools.list_tools()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }
}
