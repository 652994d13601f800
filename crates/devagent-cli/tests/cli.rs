use assert_cmd::Command;
use insta::assert_snapshot;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::{contains, is_empty};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// A command isolated from the caller's provider settings and config files.
fn devagent(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("devagent"));
    isolate(&mut cmd, home);
    cmd
}

fn isolate<'a>(cmd: &'a mut Command, home: &Path) -> &'a mut Command {
    cmd.current_dir(home)
        .env("HOME", home)
        .env_remove("OPENAI_API_KEY")
        .env_remove("DEVAGENT_PROVIDER")
        .env_remove("DEVAGENT_ENGINE")
        .env_remove("DEVAGENT_MAX_ATTEMPTS")
        .env_remove("DEVAGENT_PROGRESS")
        .env_remove("DEVAGENT_VERBOSE")
        .env_remove("DEVAGENT_PROMPT_STYLE")
        .env_remove("DEVAGENT_EXPLAIN")
        .env_remove("DEVAGENT_OLLAMA_URL")
        .env_remove("DEVAGENT_OLLAMA_MODEL")
        .env_remove("DEVAGENT_MODEL")
        .env_remove("DEVAGENT_NODE")
        .env_remove("OPENAI_BASE_URL")
        .env_remove("DEVAGENT_LOG")
        .env_remove("RUST_LOG")
}

#[test]
fn eval_prints_console_output() {
    let dir = tempdir().expect("tempdir should work");
    devagent(dir.path())
        .args(["eval", "console.log(6 * 7)"])
        .assert()
        .success()
        .stdout(contains("42"));
}

#[test]
fn eval_reports_tagged_failure() {
    let dir = tempdir().expect("tempdir should work");
    devagent(dir.path())
        .args(["eval", "throw new Error('boom')"])
        .assert()
        .failure()
        .stdout(contains("[ERROR]").and(contains("boom")))
        .stderr(contains("script failed"));
}

#[test]
fn eval_stops_runaway_loops() {
    let dir = tempdir().expect("tempdir should work");
    fs::write(
        dir.path().join("devagent.json"),
        r#"{ "loop_iteration_limit": 1000 }"#,
    )
    .expect("write should work");

    devagent(dir.path())
        .args(["eval", "while (true) {}"])
        .assert()
        .failure()
        .stdout(contains("[ERROR]"));
}

#[test]
fn no_args_enters_repl() {
    let dir = tempdir().expect("tempdir should work");
    devagent(dir.path())
        .write_stdin(".exit\n")
        .assert()
        .success()
        .stdout(contains("devagent REPL"));
}

#[test]
fn repl_reports_configured_budget() {
    let dir = tempdir().expect("tempdir should work");
    devagent(dir.path())
        .args(["repl", "--max-attempts", "5", "--provider", "openai", "--no-progress"])
        .write_stdin(".exit\n")
        .assert()
        .success()
        .stdout(contains("max 5 repair attempts"));
}

#[test]
fn run_without_api_key_fails_forward_to_failed_artifact() {
    let dir = tempdir().expect("tempdir should work");
    let assert = devagent(dir.path())
        .args([
            "run",
            "print hello",
            "--provider",
            "openai",
            "--max-attempts",
            "1",
            "--json",
            "--no-progress",
        ])
        .assert()
        .failure()
        .stderr(contains("run failed after 1 repair attempt(s)"));

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let artifact: serde_json::Value = serde_json::from_str(&stdout).expect("artifact json");
    assert_eq!(artifact["status"], "failed");
    assert_eq!(artifact["attempts"], 1);

    let code = artifact["code"].as_str().expect("code string");
    assert!(code.starts_with("// Error: code correction failed"));
    assert!(code.contains("OPENAI_API_KEY is required"));
    assert!(
        artifact["output"]
            .as_str()
            .expect("output string")
            .starts_with("[ERROR]")
    );
}

#[test]
fn run_progress_lines_go_to_stderr() {
    let dir = tempdir().expect("tempdir should work");
    devagent(dir.path())
        .args(["run", "print hello", "--provider", "openai", "--max-attempts", "1"])
        .assert()
        .failure()
        .stderr(contains("[devagent] generated script"))
        .stderr(contains("[devagent] repair attempt 1"))
        .stderr(contains("[devagent] failed after 1 repair attempt(s)"));
}

#[test]
fn no_progress_silences_progress_lines() {
    let dir = tempdir().expect("tempdir should work");
    devagent(dir.path())
        .env("DEVAGENT_LOG", "off")
        .args([
            "run",
            "print hello",
            "--provider",
            "openai",
            "--max-attempts",
            "1",
            "--no-progress",
        ])
        .assert()
        .failure()
        .stderr(contains("[devagent]").not());
}

#[test]
fn run_writes_script_and_log() {
    let dir = tempdir().expect("tempdir should work");
    let script = dir.path().join("out").join("script.js");

    devagent(dir.path())
        .args([
            "run",
            "print hello",
            "--provider",
            "openai",
            "--max-attempts",
            "1",
            "--no-progress",
            "--save-log",
            "--output",
            script.to_str().expect("path utf8"),
        ])
        .assert()
        .failure();

    let written = fs::read_to_string(&script).expect("script should exist");
    assert!(written.contains("throw new Error(\"code correction failed\");"));

    let log = fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .find(|name| name.starts_with("devagent_log_") && name.ends_with(".txt"))
        .expect("run log should be saved");
    let contents = fs::read_to_string(dir.path().join(log)).expect("read log");
    assert!(contents.starts_with("Instruction:\nprint hello"));
    assert!(contents.contains("[GENERATION]"));
    assert!(contents.contains("[CORRECTION]"));
    assert!(contents.ends_with("status: failed\nattempts: 1\n"));
}

#[test]
fn run_reads_instruction_from_stdin() {
    let dir = tempdir().expect("tempdir should work");
    devagent(dir.path())
        .args(["run", "-", "--provider", "openai", "--max-attempts", "1", "--no-progress"])
        .write_stdin("\u{feff}print hello\r\n")
        .assert()
        .failure()
        .stdout(contains("// Execution result:"));
}

#[test]
fn caller_environment_does_not_leak_into_runs() {
    let dir = tempdir().expect("tempdir should work");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("devagent"));
    cmd.env("DEVAGENT_OLLAMA_URL", " ")
        .env("DEVAGENT_PROMPT_STYLE", "sectioned")
        .env("OPENAI_BASE_URL", "http://127.0.0.1:1/v1");
    isolate(&mut cmd, dir.path())
        .args([
            "run",
            "print hello",
            "--provider",
            "openai",
            "--max-attempts",
            "1",
            "--no-progress",
        ])
        .assert()
        .failure()
        .stderr(contains("Ollama URL must not be empty").not())
        .stderr(contains("run failed after 1 repair attempt(s)"));
}

#[test]
fn zero_max_attempts_is_rejected() {
    let dir = tempdir().expect("tempdir should work");
    devagent(dir.path())
        .args(["run", "anything", "--max-attempts", "0"])
        .assert()
        .failure()
        .stdout(is_empty())
        .stderr(contains("max attempts must be a positive integer, got 0"));
}

#[test]
fn unknown_config_field_is_reported() {
    let dir = tempdir().expect("tempdir should work");
    let config = dir.path().join("custom.json");
    fs::write(&config, r#"{ "retries": 2 }"#).expect("write should work");

    devagent(dir.path())
        .args(["eval", "1", "--config", config.to_str().expect("path utf8")])
        .assert()
        .failure()
        .stderr(contains("failed parsing config file"));
}

#[test]
fn help_lists_commands() {
    let dir = tempdir().expect("tempdir should work");
    let assert = devagent(dir.path()).arg("--help").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let commands: Vec<&str> = stdout
        .lines()
        .skip_while(|line| !line.starts_with("Commands:"))
        .skip(1)
        .take_while(|line| !line.trim().is_empty())
        .map(str::trim)
        .collect();
    assert_snapshot!(commands.join("\n"), @r"
    run   Turn an instruction into a working script
    eval  Run a script directly in the sandbox, without the model
    repl  Read one instruction per line and run each one
    help  Print this message or the help of the given subcommand(s)
    ");
}
