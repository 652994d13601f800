use anyhow::{Context, Result, anyhow};
use devagent_llm::{CompletionRequest, LlmClient, SYSTEM_PROMPT};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    pub base_url: String,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: String) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(anyhow!("Ollama URL must not be empty"));
        }
        Ok(Self {
            base_url,
            probe_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(120),
        })
    }

    pub fn is_reachable(&self) -> bool {
        let client = match Client::builder().timeout(self.probe_timeout).build() {
            Ok(c) => c,
            Err(_) => return false,
        };

        let reachable = client
            .get(self.endpoint("api/tags"))
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false);
        debug!(url = %self.base_url, reachable, "probed Ollama");
        reachable
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl LlmClient for OllamaClient {
    fn complete(&self, req: &CompletionRequest, model: &str) -> Result<String> {
        let client = Client::builder()
            .timeout(self.request_timeout)
            .build()
            .context("failed to build HTTP client")?;

        let response = client
            .post(self.endpoint("api/generate"))
            .json(&GenerateRequest {
                model,
                system: SYSTEM_PROMPT,
                prompt: &req.prompt,
                stream: false,
            })
            .send()
            .context("failed calling Ollama")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_else(|_| "<unavailable>".to_string());
            return Err(anyhow!("Ollama request failed ({status}): {body}"));
        }

        let parsed: GenerateResponse = response
            .json()
            .context("failed to decode Ollama response")?;

        Ok(parsed.response)
    }
}
