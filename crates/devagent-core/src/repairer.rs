use crate::config::{AgentConfig, PromptStyle};
use crate::prompts::{CORRECTED_CODE_MARKER, build_repair_prompt, extract_section, sentinel_script};
use devagent_llm::{CompletionRequest, CompletionService, normalize_script_output};
use devagent_sandbox::canonicalize;
use tracing::{debug, warn};

/// Asks the model for a corrected script given the failing one and its error
/// output. Same fail-forward behavior as the generator.
pub struct CodeRepairer<'a, S: CompletionService> {
    service: &'a S,
    config: &'a AgentConfig,
}

impl<'a, S: CompletionService> CodeRepairer<'a, S> {
    pub fn new(service: &'a S, config: &'a AgentConfig) -> Self {
        Self { service, config }
    }

    pub fn fix(&self, code: &str, output: &str) -> String {
        self.fix_with_task(None, code, output, 1)
    }

    /// `attempt` is the 1-based number of the repair being requested.
    pub fn fix_with_task(
        &self,
        task: Option<&str>,
        code: &str,
        output: &str,
        attempt: u32,
    ) -> String {
        let request = CompletionRequest {
            prompt: build_repair_prompt(task, code, output, attempt, self.config.prompt_style),
            request_id: format!("repair-{attempt}"),
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
                attempt,
                "repair reply received"
            );
            let body = match self.config.prompt_style {
                PromptStyle::Plain => response.text.as_str(),
                PromptStyle::Sectioned => extract_section(&response.text, CORRECTED_CODE_MARKER),
            };
            normalize_script_output(&canonicalize(body))
        });

        match extracted {
            Ok(fixed) => fixed,
            Err(err) => {
                let message = format!("{err:#}");
                warn!(error = %message, attempt, "repair failed, using sentinel script");
                sentinel_script("correction", &message)
            }
        }
    }
}
