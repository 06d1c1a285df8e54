use crate::constants::*;

/// Model parameters shared by the planning and finalization calls.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: i32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_GROQ_MODEL.to_string(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}
