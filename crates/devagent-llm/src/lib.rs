use anyhow::{Result, anyhow};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenAiCompatible,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::OpenAiCompatible => "openai-compatible",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSelection {
    Auto,
    Ollama,
    OpenAiCompatible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub provider: Provider,
    pub model: String,
}

/// One prompt sent to a model. `request_id` only labels logs and errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub text: String,
    pub provider: Provider,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAttempt {
    pub provider: Provider,
    pub stage: &'static str,
    pub error: String,
}

#[derive(Debug, Error)]
#[error("LLM routing failed after {attempts:?}")]
pub struct ProviderRoutingError {
    pub attempts: Vec<ProviderAttempt>,
}

/// System message shared by the chat-style clients.
pub const SYSTEM_PROMPT: &str =
    "You write small self-contained JavaScript programs. Follow the requested reply format exactly.";

pub trait LlmClient {
    fn complete(&self, req: &CompletionRequest, model: &str) -> Result<String>;
}

pub trait ReachabilityProbe {
    fn ollama_reachable(&self) -> bool;
}

pub trait CompletionService {
    fn candidate_chain(&self, selection: ProviderSelection) -> Vec<ProviderDescriptor>;
    fn complete(
        &self,
        selection: ProviderSelection,
        req: &CompletionRequest,
        model_override: Option<&str>,
    ) -> Result<CompletionResponse>;
}

/// Strips a surrounding markdown fence from a model reply and trims it.
pub fn normalize_script_output(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("LLM returned empty output"));
    }

    if let Some(block) = extract_fenced_code(trimmed) {
        if block.trim().is_empty() {
            return Err(anyhow!("LLM returned empty fenced output"));
        }
        return Ok(block.trim().to_string());
    }

    Ok(trimmed.to_string())
}

fn extract_fenced_code(input: &str) -> Option<String> {
    let start = input.find("```")?;
    let remainder = &input[start + 3..];
    let body_start = remainder.find('\n')? + 1;
    let body = &remainder[body_start..];
    let end = body.find("```")?;
    Some(body[..end].to_string())
}

pub struct ProviderRouter<O, P, R>
where
    O: LlmClient,
    P: LlmClient,
    R: ReachabilityProbe,
{
    pub ollama: O,
    pub openai: P,
    pub reachability: R,
    pub ollama_model: String,
    pub openai_model: String,
}

impl<O, P, R> ProviderRouter<O, P, R>
where
    O: LlmClient,
    P: LlmClient,
    R: ReachabilityProbe,
{
    fn call_provider(
        &self,
        provider: Provider,
        req: &CompletionRequest,
        model_override: Option<&str>,
    ) -> Result<CompletionResponse> {
        let model = match provider {
            Provider::Ollama => model_override.unwrap_or(&self.ollama_model),
            Provider::OpenAiCompatible => model_override.unwrap_or(&self.openai_model),
        };

        debug!(provider = provider.as_str(), model, request = %req.request_id, "calling provider");
        let text = match provider {
            Provider::Ollama => self.ollama.complete(req, model)?,
            Provider::OpenAiCompatible => self.openai.complete(req, model)?,
        };
        if text.trim().is_empty() {
            return Err(anyhow!("{} returned empty output", provider.as_str()));
        }

        Ok(CompletionResponse {
            text,
            provider,
            model: model.to_string(),
        })
    }
}

impl<O, P, R> CompletionService for ProviderRouter<O, P, R>
where
    O: LlmClient,
    P: LlmClient,
    R: ReachabilityProbe,
{
    fn candidate_chain(&self, selection: ProviderSelection) -> Vec<ProviderDescriptor> {
        let ollama = ProviderDescriptor {
            provider: Provider::Ollama,
            model: self.ollama_model.clone(),
        };
        let openai = ProviderDescriptor {
            provider: Provider::OpenAiCompatible,
            model: self.openai_model.clone(),
        };

        match selection {
            ProviderSelection::Ollama => vec![ollama],
            ProviderSelection::OpenAiCompatible => vec![openai],
            ProviderSelection::Auto => {
                if self.reachability.ollama_reachable() {
                    vec![ollama, openai]
                } else {
                    vec![openai]
                }
            }
        }
    }

    fn complete(
        &self,
        selection: ProviderSelection,
        req: &CompletionRequest,
        model_override: Option<&str>,
    ) -> Result<CompletionResponse> {
        let chain = self.candidate_chain(selection);
        let mut attempts = Vec::new();

        for entry in chain {
            match self.call_provider(entry.provider, req, model_override) {
                Ok(response) => return Ok(response),
                Err(err) => {
                    warn!(provider = entry.provider.as_str(), error = %err, "provider failed");
                    attempts.push(ProviderAttempt {
                        provider: entry.provider,
                        stage: "complete",
                        error: format!("{err:#}"),
                    });
                }
            }
        }

        Err(ProviderRoutingError { attempts }.into())
    }
}
