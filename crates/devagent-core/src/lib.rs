pub mod classify;
pub mod config;
pub mod controller;
pub mod events;
pub mod generator;
pub mod prompts;
pub mod repairer;
pub mod state;

pub use classify::{
    FAILURE_PATTERNS, error_summary, extract_error_line, is_failure, matched_patterns,
    probable_cause,
};
pub use config::{AgentConfig, ConfigError, DEFAULT_MAX_ATTEMPTS, ProgressMode, PromptStyle};
pub use controller::RetryController;
pub use events::{ChannelObserver, Notifier, ProgressEvent, ProgressObserver, RunJournal, Stage};
pub use generator::CodeGenerator;
pub use repairer::CodeRepairer;
pub use state::{
    AgentRun, FinalArtifact, InstructionError, RESULT_SEPARATOR, RunStatus, validate_instruction,
};
