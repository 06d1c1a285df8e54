pub mod anthropic;
pub mod groq;
pub mod types;

#[cfg(test)]
pub(crate) mod scripted;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;
use types::{LlmRequest, LlmResponse};

#[async_trait]
pub trait LlmProviderTrait: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, AppError>;
    async fn health_check(&self) -> Result<(), AppError>;
}

#[derive(Default)]
pub struct LlmRegistry {
    providers: HashMap<String, Arc<dyn LlmProviderTrait>>,
}

impl LlmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every provider whose API key is present in the environment.
    pub fn from_env() -> Self {
        let mut registry = Self::new();
        match groq::GroqProvider::from_env() {
            Ok(provider) => {
                tracing::info!("Groq provider registered");
                registry.register(Arc::new(provider));
            }
            Err(e) => tracing::warn!("Groq provider not available: {e}"),
        }
        match anthropic::AnthropicProvider::from_env() {
            Ok(provider) => {
                tracing::info!("Anthropic provider registered");
                registry.register(Arc::new(provider));
            }
            Err(e) => tracing::warn!("Anthropic provider not available: {e}"),
        }
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProviderTrait>) {
        let name = provider.name().to_string();
        self.providers.insert(name, provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LlmProviderTrait>> {
        self.providers.get(name).cloned()
    }

    /// Like [`get`](Self::get) but reports a missing provider as an error.
    pub fn require(&self, name: &str) -> Result<Arc<dyn LlmProviderTrait>, AppError> {
        self.get(name).ok_or_else(|| {
            AppError::ProviderNotConfigured(format!(
                "'{name}' is not registered (available: {:?})",
                self.provider_names()
            ))
        })
    }

    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::scripted::ScriptedProvider;
    use super::*;

    #[test]
    fn require_reports_missing_provider() {
        let mut registry = LlmRegistry::new();
        registry.register(Arc::new(ScriptedProvider::new(vec![])));

        assert!(registry.require("scripted").is_ok());
        let err = registry.require("groq").err().unwrap();
        assert_eq!(err.error_code(), "provider_not_configured");
        assert!(err.to_string().contains("scripted"));
    }
}
