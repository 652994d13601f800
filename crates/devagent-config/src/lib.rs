use anyhow::{Context, Result};
pub use devagent_core::DEFAULT_MAX_ATTEMPTS;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "devagent.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderSetting {
    Auto,
    Ollama,
    Openai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressSetting {
    Auto,
    Silent,
    Verbose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineSetting {
    Boa,
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyleSetting {
    Plain,
    Sectioned,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub provider: Option<ProviderSetting>,
    pub ollama_url: Option<String>,
    pub ollama_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub engine: Option<EngineSetting>,
    pub node_program: Option<String>,
    pub loop_iteration_limit: Option<u64>,
    pub max_attempts: Option<u32>,
    pub prompt_style: Option<PromptStyleSetting>,
    pub explain: Option<bool>,
    pub verbose: Option<bool>,
    pub progress: Option<ProgressSetting>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvConfig {
    pub provider: Option<ProviderSetting>,
    pub ollama_url: Option<String>,
    pub ollama_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub engine: Option<EngineSetting>,
    pub node_program: Option<String>,
    pub max_attempts: Option<u32>,
    pub prompt_style: Option<PromptStyleSetting>,
    pub explain: Option<bool>,
    pub verbose: Option<bool>,
    pub progress: Option<ProgressSetting>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliRunOverrides {
    pub provider: Option<ProviderSetting>,
    pub ollama_url: Option<String>,
    pub model: Option<String>,
    pub engine: Option<EngineSetting>,
    pub max_attempts: Option<u32>,
    pub prompt_style: Option<PromptStyleSetting>,
    pub explain: Option<bool>,
    pub verbose: Option<bool>,
    pub no_progress: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDefaults {
    pub provider: ProviderSetting,
    pub ollama_url: String,
    pub ollama_model: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_api_key: Option<String>,
    pub engine: EngineSetting,
    pub node_program: String,
    pub loop_iteration_limit: u64,
    pub max_attempts: u32,
    pub prompt_style: PromptStyleSetting,
    pub explain: bool,
    pub verbose: bool,
    pub progress: ProgressSetting,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            provider: ProviderSetting::Auto,
            ollama_url: "http://127.0.0.1:11434".to_string(),
            ollama_model: "qwen2.5-coder:7b".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4.1-mini".to_string(),
            openai_api_key: None,
            engine: EngineSetting::Boa,
            node_program: "node".to_string(),
            loop_iteration_limit: 1_000_000,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            prompt_style: PromptStyleSetting::Plain,
            explain: false,
            verbose: false,
            progress: ProgressSetting::Auto,
        }
    }
}

/// `~/.devagent/config.json`, used when the working directory has no config.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".devagent").join("config.json"))
}

pub fn load_file_config(explicit_path: Option<&Path>, cwd: &Path) -> Result<Option<FileConfig>> {
    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => {
            let local = cwd.join(CONFIG_FILE_NAME);
            match user_config_path() {
                _ if local.exists() => local,
                Some(user) if user.exists() => user,
                _ => return Ok(None),
            }
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed reading config file {}", path.display()))?;
    let parsed: FileConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing config file {}", path.display()))?;
    Ok(Some(parsed))
}

impl EnvConfig {
    pub fn from_current_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            provider: lookup("DEVAGENT_PROVIDER").and_then(|v| parse_provider(&v)),
            ollama_url: lookup("DEVAGENT_OLLAMA_URL"),
            ollama_model: lookup("DEVAGENT_OLLAMA_MODEL"),
            openai_base_url: lookup("OPENAI_BASE_URL"),
            openai_model: lookup("DEVAGENT_MODEL"),
            openai_api_key: lookup("OPENAI_API_KEY").filter(|v| !v.trim().is_empty()),
            engine: lookup("DEVAGENT_ENGINE").and_then(|v| parse_engine(&v)),
            node_program: lookup("DEVAGENT_NODE"),
            max_attempts: lookup("DEVAGENT_MAX_ATTEMPTS").and_then(|v| v.trim().parse().ok()),
            prompt_style: lookup("DEVAGENT_PROMPT_STYLE").and_then(|v| parse_prompt_style(&v)),
            explain: lookup("DEVAGENT_EXPLAIN").and_then(|v| parse_bool(&v)),
            verbose: lookup("DEVAGENT_VERBOSE").and_then(|v| parse_bool(&v)),
            progress: lookup("DEVAGENT_PROGRESS").and_then(|v| parse_progress(&v)),
        }
    }
}

pub fn resolve_run_defaults(
    cli: &CliRunOverrides,
    env_cfg: &EnvConfig,
    file_cfg: Option<&FileConfig>,
) -> RunDefaults {
    let base = RunDefaults::default();

    let provider = cli
        .provider
        .or(env_cfg.provider)
        .or(file_cfg.and_then(|c| c.provider))
        .unwrap_or(base.provider);

    let ollama_url = cli
        .ollama_url
        .clone()
        .or_else(|| env_cfg.ollama_url.clone())
        .or_else(|| file_cfg.and_then(|c| c.ollama_url.clone()))
        .unwrap_or(base.ollama_url);

    let ollama_model = cli
        .model
        .clone()
        .or_else(|| env_cfg.ollama_model.clone())
        .or_else(|| file_cfg.and_then(|c| c.ollama_model.clone()))
        .unwrap_or(base.ollama_model);

    let openai_base_url = env_cfg
        .openai_base_url
        .clone()
        .or_else(|| file_cfg.and_then(|c| c.openai_base_url.clone()))
        .unwrap_or(base.openai_base_url);

    let openai_model = cli
        .model
        .clone()
        .or_else(|| env_cfg.openai_model.clone())
        .or_else(|| file_cfg.and_then(|c| c.openai_model.clone()))
        .unwrap_or(base.openai_model);

    let openai_api_key = env_cfg
        .openai_api_key
        .clone()
        .or_else(|| file_cfg.and_then(|c| c.openai_api_key.clone()))
        .or(base.openai_api_key);

    let engine = cli
        .engine
        .or(env_cfg.engine)
        .or(file_cfg.and_then(|c| c.engine))
        .unwrap_or(base.engine);

    let node_program = env_cfg
        .node_program
        .clone()
        .or_else(|| file_cfg.and_then(|c| c.node_program.clone()))
        .unwrap_or(base.node_program);

    let loop_iteration_limit = file_cfg
        .and_then(|c| c.loop_iteration_limit)
        .unwrap_or(base.loop_iteration_limit);

    let max_attempts = cli
        .max_attempts
        .or(env_cfg.max_attempts)
        .or(file_cfg.and_then(|c| c.max_attempts))
        .unwrap_or(base.max_attempts);

    let prompt_style = cli
        .prompt_style
        .or(env_cfg.prompt_style)
        .or(file_cfg.and_then(|c| c.prompt_style))
        .unwrap_or(base.prompt_style);

    let explain = cli
        .explain
        .or(env_cfg.explain)
        .or(file_cfg.and_then(|c| c.explain))
        .unwrap_or(base.explain);

    let verbose = cli
        .verbose
        .or(env_cfg.verbose)
        .or(file_cfg.and_then(|c| c.verbose))
        .unwrap_or(base.verbose);

    let mut progress = env_cfg
        .progress
        .or(file_cfg.and_then(|c| c.progress))
        .unwrap_or(base.progress);

    if cli.no_progress == Some(true) {
        progress = ProgressSetting::Silent;
    }

    RunDefaults {
        provider,
        ollama_url,
        ollama_model,
        openai_base_url,
        openai_model,
        openai_api_key,
        engine,
        node_program,
        loop_iteration_limit,
        max_attempts,
        prompt_style,
        explain,
        verbose,
        progress,
    }
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_provider(input: &str) -> Option<ProviderSetting> {
    match input.trim().to_ascii_lowercase().as_str() {
        "auto" => Some(ProviderSetting::Auto),
        "ollama" => Some(ProviderSetting::Ollama),
        "openai" | "openai-compatible" => Some(ProviderSetting::Openai),
        _ => None,
    }
}

fn parse_progress(input: &str) -> Option<ProgressSetting> {
    match input.trim().to_ascii_lowercase().as_str() {
        "auto" => Some(ProgressSetting::Auto),
        "silent" => Some(ProgressSetting::Silent),
        "verbose" => Some(ProgressSetting::Verbose),
        _ => None,
    }
}

fn parse_engine(input: &str) -> Option<EngineSetting> {
    match input.trim().to_ascii_lowercase().as_str() {
        "boa" => Some(EngineSetting::Boa),
        "node" => Some(EngineSetting::Node),
        _ => None,
    }
}

fn parse_prompt_style(input: &str) -> Option<PromptStyleSetting> {
    match input.trim().to_ascii_lowercase().as_str() {
        "plain" => Some(PromptStyleSetting::Plain),
        "sectioned" => Some(PromptStyleSetting::Sectioned),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CliRunOverrides, DEFAULT_MAX_ATTEMPTS, EngineSetting, EnvConfig, FileConfig,
        ProgressSetting, PromptStyleSetting, ProviderSetting, load_file_config,
        resolve_run_defaults,
    };
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn default_budget_matches_agent_default() {
        assert_eq!(
            super::RunDefaults::default().max_attempts,
            devagent_core::AgentConfig::default().max_attempts()
        );
    }

    #[test]
    fn valid_config_parses() {
        let dir = tempdir().expect("tempdir should work");
        let path = dir.path().join("devagent.json");
        fs::write(
            &path,
            r#"{"provider":"ollama","max_attempts":5,"prompt_style":"sectioned"}"#,
        )
        .expect("write should work");

        let parsed = load_file_config(None, dir.path())
            .expect("parse should work")
            .expect("file should exist");
        assert_eq!(parsed.provider, Some(ProviderSetting::Ollama));
        assert_eq!(parsed.max_attempts, Some(5));
        assert_eq!(parsed.prompt_style, Some(PromptStyleSetting::Sectioned));
    }

    #[test]
    fn explicit_path_wins_over_cwd() {
        let dir = tempdir().expect("tempdir should work");
        fs::write(dir.path().join("devagent.json"), r#"{"engine":"boa"}"#)
            .expect("write should work");
        let explicit = dir.path().join("other.json");
        fs::write(&explicit, r#"{"engine":"node"}"#).expect("write should work");

        let parsed = load_file_config(Some(&explicit), dir.path())
            .expect("parse should work")
            .expect("file should exist");
        assert_eq!(parsed.engine, Some(EngineSetting::Node));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let dir = tempdir().expect("tempdir should work");
        let path = dir.path().join("devagent.json");
        fs::write(&path, r#"{"unknown":1}"#).expect("write should work");

        let err = load_file_config(None, dir.path()).expect_err("parse should fail");
        assert!(format!("{err:#}").contains("unknown field"));
    }

    #[test]
    fn malformed_json_has_location() {
        let dir = tempdir().expect("tempdir should work");
        let path = dir.path().join("devagent.json");
        fs::write(&path, "{\n  \"provider\":\n").expect("write should work");

        let err = load_file_config(None, dir.path()).expect_err("parse should fail");
        assert!(
            format!("{err:#}").contains("line") || format!("{err:#}").contains("column"),
            "expected location details, got: {err}"
        );
    }

    #[test]
    fn env_lookup_parses_values() {
        let vars: HashMap<&str, &str> = [
            ("DEVAGENT_PROVIDER", "openai-compatible"),
            ("DEVAGENT_MAX_ATTEMPTS", " 7 "),
            ("DEVAGENT_ENGINE", "NODE"),
            ("DEVAGENT_EXPLAIN", "yes"),
            ("DEVAGENT_PROGRESS", "bogus"),
            ("OPENAI_API_KEY", "  "),
        ]
        .into_iter()
        .collect();

        let cfg = EnvConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(cfg.provider, Some(ProviderSetting::Openai));
        assert_eq!(cfg.max_attempts, Some(7));
        assert_eq!(cfg.engine, Some(EngineSetting::Node));
        assert_eq!(cfg.explain, Some(true));
        assert_eq!(cfg.progress, None);
        assert_eq!(cfg.openai_api_key, None);
    }

    #[test]
    fn defaults_apply_without_sources() {
        let resolved =
            resolve_run_defaults(&CliRunOverrides::default(), &EnvConfig::default(), None);
        assert_eq!(resolved.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(resolved.engine, EngineSetting::Boa);
        assert_eq!(resolved.prompt_style, PromptStyleSetting::Plain);
        assert!(resolved.openai_api_key.is_none());
    }

    #[test]
    fn precedence_cli_env_file_defaults() {
        let file = FileConfig {
            provider: Some(ProviderSetting::Openai),
            progress: Some(ProgressSetting::Verbose),
            max_attempts: Some(2),
            explain: Some(true),
            openai_api_key: Some("from-file".to_string()),
            ..FileConfig::default()
        };

        let env_cfg = EnvConfig {
            provider: Some(ProviderSetting::Ollama),
            max_attempts: Some(4),
            ..EnvConfig::default()
        };

        let cli = CliRunOverrides {
            provider: Some(ProviderSetting::Auto),
            no_progress: Some(true),
            ..CliRunOverrides::default()
        };

        let resolved = resolve_run_defaults(&cli, &env_cfg, Some(&file));
        assert_eq!(resolved.provider, ProviderSetting::Auto);
        assert_eq!(resolved.max_attempts, 4);
        assert!(resolved.explain);
        assert_eq!(resolved.progress, ProgressSetting::Silent);
        assert_eq!(resolved.openai_api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn model_override_applies_to_both_providers() {
        let cli = CliRunOverrides {
            model: Some("custom".to_string()),
            ..CliRunOverrides::default()
        };
        let resolved = resolve_run_defaults(&cli, &EnvConfig::default(), None);
        assert_eq!(resolved.ollama_model, "custom");
        assert_eq!(resolved.openai_model, "custom");
    }
}
