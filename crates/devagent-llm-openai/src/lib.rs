use anyhow::{Context, Result, anyhow};
use devagent_llm::{CompletionRequest, LlmClient, SYSTEM_PROMPT};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for any endpoint speaking the OpenAI chat-completions protocol
/// (OpenAI itself, Mistral's `https://api.mistral.ai/v1`, local gateways).
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl OpenAiCompatibleClient {
    pub fn from_parts(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

fn build_chat_request(req: &CompletionRequest, model: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        temperature: 0.0,
        messages: vec![
            Message {
                role: "system".to_string(),
                content: SYSTEM_PROMPT.to_string(),
            },
            Message {
                role: "user".to_string(),
                content: req.prompt.clone(),
            },
        ],
    }
}

fn first_choice(parsed: ChatResponse) -> Result<String> {
    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| anyhow!("OpenAI-compatible response had no choices"))
}

impl LlmClient for OpenAiCompatibleClient {
    fn complete(&self, req: &CompletionRequest, model: &str) -> Result<String> {
        let body = build_chat_request(req, model);

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .context("failed to build HTTP client")?;
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let response = client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .context("failed calling OpenAI-compatible endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_else(|_| "<unavailable>".to_string());
            return Err(anyhow!(
                "OpenAI-compatible request failed ({status}): {body}"
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .context("failed to decode OpenAI-compatible response")?;
        first_choice(parsed)
    }
}
