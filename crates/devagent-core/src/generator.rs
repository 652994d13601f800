use crate::config::{AgentConfig, PromptStyle};
use crate::prompts::{GENERATED_CODE_MARKER, build_generation_prompt, extract_section, sentinel_script};
use devagent_llm::{CompletionRequest, CompletionService, normalize_script_output};
use devagent_sandbox::canonicalize;
use tracing::{debug, warn};

/// Turns an instruction into a candidate script. Never fails: when the model
/// cannot be reached the result is a sentinel script carrying the error.
pub struct CodeGenerator<'a, S: CompletionService> {
    service: &'a S,
    config: &'a AgentConfig,
}

impl<'a, S: CompletionService> CodeGenerator<'a, S> {
    pub fn new(service: &'a S, config: &'a AgentConfig) -> Self {
        Self { service, config }
    }

    pub fn generate(&self, instruction: &str) -> String {
        let prompt = build_generation_prompt(
            &canonicalize(instruction),
            self.config.prompt_style,
            self.config.explain,
        );
        let request = CompletionRequest {
            prompt,
            request_id: "generate".to_string(),
        };

        let reply = self.service.complete(
            self.config.provider_selection,
            &request,
            self.config.model_override.as_deref(),
        );
        let extracted = reply.and_then(|response| {
            debug!(
                provider = response.provider.as_str(),
                model = %response.model,
                "generation reply received"
            );
            let body = match self.config.prompt_style {
                PromptStyle::Plain => response.text.as_str(),
                PromptStyle::Sectioned => extract_section(&response.text, GENERATED_CODE_MARKER),
            };
            normalize_script_output(&canonicalize(body))
        });

        match extracted {
            Ok(code) => code,
            Err(err) => {
                let message = format!("{err:#}");
                warn!(error = %message, "generation failed, using sentinel script");
                sentinel_script("generation", &message)
            }
        }
    }
}
