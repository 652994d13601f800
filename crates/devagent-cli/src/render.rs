//! Terminal rendering of progress events as `[devagent]` lines on stderr.

use devagent_core::{
    ProgressEvent, ProgressMode, ProgressObserver, RunStatus, Stage, error_summary,
    extract_error_line,
};

pub(crate) struct TerminalObserver {
    mode: ProgressMode,
}

impl TerminalObserver {
    pub(crate) fn new(mode: ProgressMode) -> Self {
        Self { mode }
    }
}

impl ProgressObserver for TerminalObserver {
    fn on_event(&self, event: &ProgressEvent) {
        for line in describe_event(self.mode, event) {
            eprintln!("{line}");
        }
    }

    fn on_status(&self, status: RunStatus, attempts: u32) {
        if let Some(line) = describe_status(self.mode, status, attempts) {
            eprintln!("{line}");
        }
    }
}

pub(crate) fn describe_event(mode: ProgressMode, event: &ProgressEvent) -> Vec<String> {
    match mode {
        ProgressMode::Silent => Vec::new(),
        ProgressMode::Minimal => vec![summary_line(event)],
        ProgressMode::Verbose => {
            let mut lines = vec![summary_line(event)];
            match event.stage {
                Stage::Generation | Stage::Correction => lines.extend(numbered(&event.content)),
                Stage::Execution => {
                    lines.extend(event.content.lines().map(|line| format!("    {line}")));
                    let error_line = event
                        .is_error
                        .then(|| extract_error_line(&event.content))
                        .flatten();
                    if let Some(line) = error_line {
                        lines.push(format!("[devagent] failure reported at line {line}"));
                    }
                }
            }
            lines
        }
    }
}

fn summary_line(event: &ProgressEvent) -> String {
    match event.stage {
        Stage::Generation => format!(
            "[devagent] generated script ({} lines)",
            event.content.lines().count()
        ),
        Stage::Execution if event.is_error => format!(
            "[devagent] execution failed: {}",
            error_summary(&event.content)
        ),
        Stage::Execution => "[devagent] execution succeeded".to_string(),
        Stage::Correction => format!(
            "[devagent] received corrected script ({} lines)",
            event.content.lines().count()
        ),
    }
}

fn numbered(code: &str) -> impl Iterator<Item = String> + '_ {
    code.lines()
        .enumerate()
        .map(|(idx, line)| format!("{:>4} | {line}", idx + 1))
}

pub(crate) fn describe_status(mode: ProgressMode, status: RunStatus, attempts: u32) -> Option<String> {
    if matches!(mode, ProgressMode::Silent) {
        return None;
    }
    match status {
        RunStatus::Fixing => Some(format!("[devagent] repair attempt {attempts}")),
        RunStatus::Completed => Some(format!(
            "[devagent] completed after {attempts} repair attempt(s)"
        )),
        RunStatus::Failed => Some(format!(
            "[devagent] failed after {attempts} repair attempt(s)"
        )),
        RunStatus::Generating | RunStatus::Executing => None,
    }
}
