use crate::classify::is_failure;
use devagent_sandbox::canonicalize;
use serde::Serialize;
use thiserror::Error;

/// Joins the final script and its execution output in `full_result`.
pub const RESULT_SEPARATOR: &str = "\n\n// Execution result:\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Generating,
    Executing,
    Fixing,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Generating => "generating",
            RunStatus::Executing => "executing",
            RunStatus::Fixing => "fixing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn can_transition_to(self, next: RunStatus) -> bool {
        use RunStatus::{Completed, Executing, Failed, Fixing, Generating};
        matches!(
            (self, next),
            (Generating, Executing)
                | (Generating, Failed)
                | (Executing, Fixing)
                | (Executing, Completed)
                | (Executing, Failed)
                | (Fixing, Executing)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstructionError {
    #[error("instruction must not be empty")]
    Empty,
}

/// Canonicalizes an instruction and rejects blank ones.
pub fn validate_instruction(raw: &str) -> Result<String, InstructionError> {
    let instruction = canonicalize(raw).trim().to_string();
    if instruction.is_empty() {
        return Err(InstructionError::Empty);
    }
    Ok(instruction)
}

/// One instruction's journey through generate, execute and fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRun {
    instruction: String,
    code: String,
    output: String,
    attempts: u32,
    status: RunStatus,
}

impl AgentRun {
    pub fn new(instruction: &str) -> Self {
        Self {
            instruction: canonicalize(instruction).trim().to_string(),
            code: String::new(),
            output: String::new(),
            attempts: 0,
            status: RunStatus::Generating,
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_failing(&self) -> bool {
        is_failure(&self.output)
    }

    pub fn full_result(&self) -> String {
        format!("{}{RESULT_SEPARATOR}{}", self.code, self.output)
    }

    pub fn artifact(&self) -> FinalArtifact {
        FinalArtifact {
            code: self.code.clone(),
            output: self.output.clone(),
            full_result: self.full_result(),
            status: self.status,
            attempts: self.attempts,
        }
    }

    fn transition(&mut self, next: RunStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "invalid run transition {:?} -> {:?}",
            self.status,
            next
        );
        self.status = next;
    }

    /// Installs the first candidate script.
    pub(crate) fn record_generated(&mut self, code: String) {
        debug_assert_eq!(self.status, RunStatus::Generating);
        self.code = code;
        self.output.clear();
    }

    pub(crate) fn record_execution(&mut self, output: String) {
        self.output = output;
        self.transition(RunStatus::Executing);
    }

    /// Replaces the script with a repaired one. The previous output no longer
    /// describes `code`, so it is cleared until the next execution.
    pub(crate) fn record_repair(&mut self, code: String) {
        self.code = code;
        self.output.clear();
        self.attempts += 1;
        self.transition(RunStatus::Fixing);
    }

    pub(crate) fn finish(&mut self, status: RunStatus) {
        debug_assert!(status.is_terminal());
        self.transition(status);
    }

    pub(crate) fn reject(&mut self, reason: String) {
        self.output = reason;
        self.transition(RunStatus::Failed);
    }
}

/// What the caller receives once a run terminates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalArtifact {
    pub code: String,
    pub output: String,
    pub full_result: String,
    pub status: RunStatus,
    pub attempts: u32,
}
