//! Prompt contracts for generation and repair. Wording is fixed at build
//! time; only the reply format (plain or sectioned) and explain mode vary.

use crate::classify::{error_summary, probable_cause};
use crate::config::PromptStyle;

pub const GENERATED_CODE_MARKER: &str = "### CODE";
pub const CORRECTED_CODE_MARKER: &str = "### CORRECTED CODE";

const ENVIRONMENT_RULES: &str = "\
- The script runs in a sandboxed JavaScript interpreter: no network, no filesystem, no modules.
- Do not use import, export or require.
- Print every result with console.log.";

pub fn build_generation_prompt(instruction: &str, style: PromptStyle, explain: bool) -> String {
    let mut prompt = format!(
        "You are an expert JavaScript developer. Write a script that accomplishes the following task.\n\
Task: {instruction}\n\n\
Rules:\n\
{ENVIRONMENT_RULES}\n\
- Handle likely error cases.\n"
    );

    if explain {
        prompt.push_str("- Add a comment on every line explaining what it does.\n");
    }

    match style {
        PromptStyle::Plain => {
            prompt.push_str("- Return only the code, without explanations or markdown.\n");
        }
        PromptStyle::Sectioned => {
            prompt.push_str(&format!(
                "\nReply using exactly these sections:\n\
### PLAN\n\
<one short paragraph describing the approach>\n\
{GENERATED_CODE_MARKER}\n\
<the complete script and nothing else>\n"
            ));
        }
    }

    prompt
}

pub fn build_repair_prompt(
    task: Option<&str>,
    code: &str,
    output: &str,
    attempt: u32,
    style: PromptStyle,
) -> String {
    let task_section = task.map_or_else(String::new, |t| format!("ORIGINAL TASK:\n{t}\n\n"));
    let mut prompt = format!(
        "The following JavaScript script failed. Fix it while keeping the same functionality.\n\n\
FAILURE REPORT\n\
- Repair attempt: {attempt}\n\
- Error summary: {}\n\
- Probable cause: {}\n\n\
{task_section}\
SCRIPT WITH ERROR:\n{code}\n\n\
FULL ERROR OUTPUT:\n{output}\n\n\
Rules:\n\
{ENVIRONMENT_RULES}\n\
- Fix the direct cause of the error.\n",
        error_summary(output),
        probable_cause(output),
    );

    match style {
        PromptStyle::Plain => {
            prompt.push_str("- Return only the corrected code, without explanations or markdown.\n");
        }
        PromptStyle::Sectioned => {
            prompt.push_str(&format!(
                "\nReply using exactly these sections:\n\
### DIAGNOSIS\n\
<one short paragraph naming the bug>\n\
{CORRECTED_CODE_MARKER}\n\
<the complete corrected script and nothing else>\n"
            ));
        }
    }

    prompt
}

/// Text after the first line that starts with `marker`; the whole reply when
/// the marker is missing.
pub fn extract_section<'a>(reply: &'a str, marker: &str) -> &'a str {
    let mut offset = 0;
    for line in reply.split_inclusive('\n') {
        if line.trim_start().starts_with(marker) {
            return &reply[offset + line.len()..];
        }
        offset += line.len();
    }
    reply
}

/// Fail-forward placeholder used when the model cannot be reached: the
/// error is kept as comments and the script throws when executed.
pub fn sentinel_script(stage: &str, error: &str) -> String {
    let mut script = format!("// Error: code {stage} failed\n");
    // JS also ends a line comment at \r, U+2028 and U+2029.
    for line in error.split(['\n', '\r', '\u{2028}', '\u{2029}']) {
        if line.is_empty() {
            continue;
        }
        script.push_str("// ");
        script.push_str(line);
        script.push('\n');
    }
    script.push_str(&format!("throw new Error(\"code {stage} failed\");"));
    script
}
