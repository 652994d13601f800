use devagent_llm::ProviderSelection;
use thiserror::Error;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    /// The model replies with script text only.
    #[default]
    Plain,
    /// The model replies with labelled sections; the code section is parsed out.
    Sectioned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    Silent,
    Minimal,
    Verbose,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max attempts must be a positive integer, got {0}")]
    InvalidMaxAttempts(u32),
}

/// Everything the retry controller needs, passed in at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    max_attempts: u32,
    pub prompt_style: PromptStyle,
    pub explain: bool,
    pub provider_selection: ProviderSelection,
    pub model_override: Option<String>,
}

impl AgentConfig {
    pub fn new(max_attempts: u32) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(max_attempts));
        }
        Ok(Self {
            max_attempts,
            prompt_style: PromptStyle::Plain,
            explain: false,
            provider_selection: ProviderSelection::Auto,
            model_override: None,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn with_prompt_style(mut self, style: PromptStyle) -> Self {
        self.prompt_style = style;
        self
    }

    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn with_provider(mut self, selection: ProviderSelection, model: Option<String>) -> Self {
        self.provider_selection = selection;
        self.model_override = model;
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            prompt_style: PromptStyle::Plain,
            explain: false,
            provider_selection: ProviderSelection::Auto,
            model_override: None,
        }
    }
}
