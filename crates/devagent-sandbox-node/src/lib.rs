use anyhow::{Context, Result, anyhow};
use devagent_sandbox::{Sandbox, normalize_bytes, tagged_error};
use std::io::Write;
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

/// Runs each script in a separate `node` process fed through stdin.
///
/// Isolation is whatever the OS process boundary gives; the script can use
/// node's full standard library.
#[derive(Debug, Clone)]
pub struct NodeSandbox {
    pub program: String,
}

impl NodeSandbox {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn run(&self, code: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed spawning {}", self.program))?;

        // node reads the whole script before running it, so this cannot
        // block on a full stdout pipe.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("{} stdin unavailable", self.program))?;
        if let Err(err) = stdin.write_all(code.as_bytes()) {
            drop(stdin);
            let _ = child.kill();
            let _ = child.wait();
            return Err(err)
                .with_context(|| format!("failed sending script to {}", self.program));
        }
        drop(stdin);

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed waiting for {}", self.program))?;
        let stdout = normalize_bytes(&output.stdout);
        let stderr = normalize_bytes(&output.stderr);
        debug!(status = %output.status, "node process finished");

        if output.status.success() {
            Ok(stdout.trim_end().to_string())
        } else {
            Err(anyhow!(describe_failure(output.status, &stdout, &stderr)))
        }
    }
}

impl Default for NodeSandbox {
    fn default() -> Self {
        Self::new("node")
    }
}

fn describe_failure(status: ExitStatus, stdout: &str, stderr: &str) -> String {
    let mut text = match status.code() {
        Some(code) => format!("script exited with status {code}"),
        None => "script was terminated by a signal".to_string(),
    };
    if !stderr.trim().is_empty() {
        text.push('\n');
        text.push_str(stderr.trim_end());
    }
    if !stdout.trim().is_empty() {
        text.push_str("\nOutput before failure:\n");
        text.push_str(stdout.trim_end());
    }
    text
}

impl Sandbox for NodeSandbox {
    fn execute(&self, code: &str) -> String {
        match self.run(code) {
            Ok(output) => output,
            Err(err) => tagged_error(&format!("{err:#}")),
        }
    }
}
