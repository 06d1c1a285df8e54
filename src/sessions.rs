use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::AppError;
use crate::history::Turn;
use crate::llm::LlmProviderTrait;
use crate::orchestration::{ModelSettings, Orchestrator};
use crate::tools::ToolRegistry;

/// Usage counters for one session. They survive a conversation reset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    pub query_count: u64,
    pub tool_calls: u64,
    /// Tool name → number of times it was requested.
    pub tools_used: BTreeMap<String, u64>,
}

impl SessionStats {
    fn record(&mut self, tools: &[String]) {
        self.query_count += 1;
        for tool in tools {
            self.tool_calls += 1;
            *self.tools_used.entry(tool.clone()).or_default() += 1;
        }
    }

    pub fn distinct_tools(&self) -> usize {
        self.tools_used.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub tools_used: Vec<String>,
}

struct SessionInner {
    orchestrator: Orchestrator,
    stats: SessionStats,
}

/// One conversation. Turns within a session are serialized by the mutex;
/// distinct sessions proceed independently.
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    inner: Mutex<SessionInner>,
}

impl Session {
    pub async fn process_turn(&self, text: &str) -> Result<TurnOutcome, AppError> {
        let mut inner = self.inner.lock().await;
        let mark = inner.orchestrator.history().len();
        let reply = inner.orchestrator.process_turn(text).await?;
        let tools_used = inner.orchestrator.history().tools_requested_since(mark);
        inner.stats.record(&tools_used);
        Ok(TurnOutcome { reply, tools_used })
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.inner.lock().await.orchestrator.get_history().to_vec()
    }

    pub async fn reset(&self) {
        self.inner.lock().await.orchestrator.reset_session();
    }

    pub async fn stats(&self) -> SessionStats {
        self.inner.lock().await.stats.clone()
    }
}

/// Creates orchestrators that share one provider and one tool registry.
#[derive(Clone)]
pub struct SessionManager {
    provider: Arc<dyn LlmProviderTrait>,
    tools: Arc<ToolRegistry>,
    settings: ModelSettings,
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Session>>>>,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn LlmProviderTrait>,
        tools: Arc<ToolRegistry>,
        settings: ModelSettings,
    ) -> Self {
        Self {
            provider,
            tools,
            settings,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            inner: Mutex::new(SessionInner {
                orchestrator: Orchestrator::new(
                    self.provider.clone(),
                    self.tools.clone(),
                    self.settings.clone(),
                ),
                stats: SessionStats::default(),
            }),
        });
        self.sessions.write().await.insert(session.id, session.clone());
        tracing::info!("Session {} created", session.id);
        session
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<Session>, AppError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                tracing::info!("Session {id} closed");
                Ok(())
            }
            None => Err(AppError::NotFound),
        }
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn provider_health(&self) -> Result<(), AppError> {
        self.provider.health_check().await
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::{calls, text, ScriptedProvider};
    use crate::tools::tests::demo_registry;

    #[tokio::test]
    async fn sessions_have_isolated_histories() {
        let (registry, _dir) = demo_registry().await;
        let provider = Arc::new(ScriptedProvider::new(vec![text("Hi A"), text("Hi B")]));
        let manager = SessionManager::new(provider, Arc::new(registry), ModelSettings::default());

        let a = manager.create().await;
        let b = manager.create().await;
        a.process_turn("Hello from A").await.unwrap();
        b.process_turn("Hello from B").await.unwrap();

        assert_eq!(a.history().await[0].content, "Hello from A");
        assert_eq!(b.history().await[0].content, "Hello from B");
        assert_eq!(manager.count().await, 2);
    }

    #[tokio::test]
    async fn stats_count_queries_and_tools() {
        let (registry, _dir) = demo_registry().await;
        let provider = Arc::new(ScriptedProvider::new(vec![
            calls(&[
                ("c1", "get_employees_by_department", r#"{"department": "HR"}"#),
                ("c2", "get_employees_by_department", r#"{"department": "Sales"}"#),
            ]),
            text("HR and Sales listed."),
            text("You're welcome."),
        ]));
        let manager = SessionManager::new(provider, Arc::new(registry), ModelSettings::default());
        let session = manager.create().await;

        let outcome = session.process_turn("Who is in HR and Sales?").await.unwrap();
        assert_eq!(outcome.tools_used.len(), 2);
        session.process_turn("Thanks").await.unwrap();
        session.reset().await;

        let stats = session.stats().await;
        assert_eq!(stats.query_count, 2);
        assert_eq!(stats.tool_calls, 2);
        assert_eq!(stats.distinct_tools(), 1);
        assert!(session.history().await.is_empty());
    }

    #[tokio::test]
    async fn removed_sessions_are_not_found() {
        let (registry, _dir) = demo_registry().await;
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let manager = SessionManager::new(provider, Arc::new(registry), ModelSettings::default());
        let session = manager.create().await;

        manager.remove(session.id).await.unwrap();
        assert!(matches!(manager.get(session.id).await, Err(AppError::NotFound)));
        assert!(manager.remove(session.id).await.is_err());
    }
}
