use anyhow::{Result, anyhow};
use devagent_config::{
    CliRunOverrides, EngineSetting, EnvConfig, ProgressSetting, PromptStyleSetting,
    ProviderSetting, RunDefaults, load_file_config, resolve_run_defaults,
};
use devagent_core::{AgentConfig, ProgressMode, PromptStyle, RetryController};
use devagent_llm::{
    CompletionRequest, LlmClient, ProviderRouter, ProviderSelection, ReachabilityProbe,
};
use devagent_llm_ollama::OllamaClient;
use devagent_llm_openai::OpenAiCompatibleClient;
use devagent_sandbox::{BoaSandbox, Sandbox, SandboxLimits};
use devagent_sandbox_node::NodeSandbox;
use std::path::PathBuf;
use tracing::debug;

pub(crate) struct OllamaProbe {
    client: OllamaClient,
}

impl ReachabilityProbe for OllamaProbe {
    fn ollama_reachable(&self) -> bool {
        self.client.is_reachable()
    }
}

/// Present only when an API key was configured; otherwise every call fails
/// with an actionable message, which the generator turns into a sentinel.
pub(crate) struct MaybeOpenAiClient {
    inner: Option<OpenAiCompatibleClient>,
}

impl LlmClient for MaybeOpenAiClient {
    fn complete(&self, req: &CompletionRequest, model: &str) -> Result<String> {
        let client = self
            .inner
            .as_ref()
            .ok_or_else(|| anyhow!("OPENAI_API_KEY is required for OpenAI-compatible provider"))?;
        client.complete(req, model)
    }
}

pub(crate) type AgentService = ProviderRouter<OllamaClient, MaybeOpenAiClient, OllamaProbe>;
pub(crate) type AgentController = RetryController<AgentService, Box<dyn Sandbox>>;

pub(crate) fn provider_to_selection(provider: ProviderSetting) -> ProviderSelection {
    match provider {
        ProviderSetting::Auto => ProviderSelection::Auto,
        ProviderSetting::Ollama => ProviderSelection::Ollama,
        ProviderSetting::Openai => ProviderSelection::OpenAiCompatible,
    }
}

fn prompt_style(setting: PromptStyleSetting) -> PromptStyle {
    match setting {
        PromptStyleSetting::Plain => PromptStyle::Plain,
        PromptStyleSetting::Sectioned => PromptStyle::Sectioned,
    }
}

pub(crate) fn resolved_progress_mode(progress: ProgressSetting, verbose: bool) -> ProgressMode {
    match progress {
        ProgressSetting::Silent => ProgressMode::Silent,
        ProgressSetting::Verbose => ProgressMode::Verbose,
        ProgressSetting::Auto => {
            if verbose {
                ProgressMode::Verbose
            } else {
                ProgressMode::Minimal
            }
        }
    }
}

pub(crate) fn resolve_config(
    config: Option<PathBuf>,
    cli_overrides: &CliRunOverrides,
) -> Result<RunDefaults> {
    let cwd = std::env::current_dir()?;
    let file_cfg = load_file_config(config.as_deref(), &cwd)?;
    let env_cfg = EnvConfig::from_current_env();
    let resolved = resolve_run_defaults(cli_overrides, &env_cfg, file_cfg.as_ref());
    debug!(
        provider = ?resolved.provider,
        engine = ?resolved.engine,
        max_attempts = resolved.max_attempts,
        from_file = file_cfg.is_some(),
        "resolved run configuration"
    );
    Ok(resolved)
}

pub(crate) fn build_agent_config(
    resolved: &RunDefaults,
    model_override: Option<String>,
) -> Result<AgentConfig> {
    let config = AgentConfig::new(resolved.max_attempts)?
        .with_prompt_style(prompt_style(resolved.prompt_style))
        .with_explain(resolved.explain)
        .with_provider(provider_to_selection(resolved.provider), model_override);
    Ok(config)
}

pub(crate) fn build_service(resolved: &RunDefaults) -> Result<AgentService> {
    let ollama_client = OllamaClient::new(resolved.ollama_url.clone())?;
    let openai_client = MaybeOpenAiClient {
        inner: resolved.openai_api_key.clone().map(|api_key| {
            OpenAiCompatibleClient::from_parts(resolved.openai_base_url.clone(), api_key)
        }),
    };

    Ok(ProviderRouter {
        ollama: ollama_client.clone(),
        openai: openai_client,
        reachability: OllamaProbe {
            client: ollama_client,
        },
        ollama_model: resolved.ollama_model.clone(),
        openai_model: resolved.openai_model.clone(),
    })
}

pub(crate) fn build_sandbox(resolved: &RunDefaults) -> Result<Box<dyn Sandbox>> {
    match resolved.engine {
        EngineSetting::Boa => Ok(Box::new(BoaSandbox::new(SandboxLimits {
            loop_iterations: resolved.loop_iteration_limit,
            ..SandboxLimits::default()
        }))),
        EngineSetting::Node => {
            let sandbox = NodeSandbox::new(resolved.node_program.clone());
            if !sandbox.is_available() {
                return Err(anyhow!(
                    "engine 'node' selected but '{}' could not be started",
                    resolved.node_program
                ));
            }
            Ok(Box::new(sandbox))
        }
    }
}

pub(crate) fn build_controller(
    resolved: &RunDefaults,
    model_override: Option<String>,
) -> Result<AgentController> {
    Ok(RetryController::new(
        build_service(resolved)?,
        build_sandbox(resolved)?,
        build_agent_config(resolved, model_override)?,
    ))
}
