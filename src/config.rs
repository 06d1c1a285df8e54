use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::*;
use crate::error::AppError;
use crate::orchestration::ModelSettings;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/employees.db";
const DEFAULT_ANNOUNCEMENTS_DIR: &str = "data/announcements";
const DEFAULT_POLICIES_DIR: &str = "data/policies";
pub const DEFAULT_BIND: &str = "127.0.0.1:11419";

/// Runtime settings, read from the process environment (after `.env` is
/// loaded by `dotenvy`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: String,
    pub model: String,
    pub max_tokens: i32,
    pub temperature: f64,
    pub database_url: String,
    pub announcements_dir: PathBuf,
    pub policies_dir: PathBuf,
    pub bind: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = get("HRDESK_PROVIDER")
            .map(|p| p.trim().to_lowercase())
            .unwrap_or_else(|| PROVIDER_GROQ.to_string());
        let model = get("HRDESK_MODEL").unwrap_or_else(|| default_model(&provider).to_string());

        Ok(Self {
            model,
            max_tokens: parse_or(
                "HRDESK_MAX_TOKENS",
                get("HRDESK_MAX_TOKENS"),
                DEFAULT_MAX_TOKENS,
            )?,
            temperature: parse_or(
                "HRDESK_TEMPERATURE",
                get("HRDESK_TEMPERATURE"),
                DEFAULT_TEMPERATURE,
            )?,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            announcements_dir: get("ANNOUNCEMENTS_DIR")
                .unwrap_or_else(|| DEFAULT_ANNOUNCEMENTS_DIR.to_string())
                .into(),
            policies_dir: get("POLICIES_DIR")
                .unwrap_or_else(|| DEFAULT_POLICIES_DIR.to_string())
                .into(),
            bind: get("HRDESK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            provider,
        })
    }

    /// On-disk location of the employee database, if `database_url` names a
    /// file.
    pub fn database_file(&self) -> Option<PathBuf> {
        let path = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        let path = path.split('?').next().unwrap_or_default();
        if path.is_empty() || path.starts_with(":memory:") {
            return None;
        }
        Some(PathBuf::from(path))
    }

    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            model: self.model.clone(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

fn default_model(provider: &str) -> &'static str {
    match provider {
        PROVIDER_ANTHROPIC => DEFAULT_ANTHROPIC_MODEL,
        _ => DEFAULT_GROQ_MODEL,
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, AppError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| AppError::InvalidInput(format!("{key} has an invalid value: {value}"))),
    }
}
