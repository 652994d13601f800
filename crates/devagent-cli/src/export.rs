use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use devagent_core::FinalArtifact;
use std::fs;
use std::path::{Path, PathBuf};

/// `devagent_log_YYYYMMDD_HHMMSS.txt`, stamped with the local time.
pub(crate) fn journal_file_name(now: DateTime<Local>) -> String {
    format!("devagent_log_{}.txt", now.format("%Y%m%d_%H%M%S"))
}

pub(crate) fn render_journal(
    instruction: &str,
    journal: &str,
    artifact: &FinalArtifact,
) -> String {
    format!(
        "Instruction:\n{instruction}\n\n{journal}\n---\n[RESULT]\nstatus: {}\nattempts: {}\n",
        artifact.status.as_str(),
        artifact.attempts
    )
}

pub(crate) fn save_journal(dir: &Path, contents: &str) -> Result<PathBuf> {
    let path = dir.join(journal_file_name(Local::now()));
    fs::write(&path, contents)
        .with_context(|| format!("failed writing run log {}", path.display()))?;
    Ok(path)
}

pub(crate) fn write_script(path: &Path, code: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating output dir {}", parent.display()))?;
    }
    let mut contents = code.to_string();
    if !contents.ends_with('\n') {
        contents.push('\n');
    }
    fs::write(path, contents).with_context(|| format!("failed writing {}", path.display()))
}
