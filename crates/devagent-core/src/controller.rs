use crate::classify::matched_patterns;
use crate::config::AgentConfig;
use crate::events::{Notifier, Stage};
use crate::generator::CodeGenerator;
use crate::repairer::CodeRepairer;
use crate::state::{AgentRun, RunStatus, validate_instruction};
use devagent_llm::CompletionService;
use devagent_sandbox::{Sandbox, tagged_error};
use tracing::{debug, info};

/// Drives one instruction through generate, execute and fix until the output
/// is clean or the repair budget is spent. Never panics or returns an error:
/// every outcome is a terminal [`AgentRun`].
pub struct RetryController<S, X>
where
    S: CompletionService,
    X: Sandbox,
{
    service: S,
    sandbox: X,
    config: AgentConfig,
}

impl<S, X> RetryController<S, X>
where
    S: CompletionService,
    X: Sandbox,
{
    pub fn new(service: S, sandbox: X, config: AgentConfig) -> Self {
        Self {
            service,
            sandbox,
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn run_silent(&self, instruction: &str) -> AgentRun {
        self.run(instruction, &Notifier::new())
    }

    pub fn run(&self, instruction: &str, notifier: &Notifier<'_>) -> AgentRun {
        let mut run = AgentRun::new(instruction);
        let instruction = match validate_instruction(instruction) {
            Ok(instruction) => instruction,
            Err(err) => {
                debug!(error = %err, "rejecting instruction");
                run.reject(tagged_error(&err.to_string()));
                notifier.status(RunStatus::Failed, 0);
                return run;
            }
        };

        let max_attempts = self.config.max_attempts();
        info!(max_attempts, "starting run");

        let generator = CodeGenerator::new(&self.service, &self.config);
        let repairer = CodeRepairer::new(&self.service, &self.config);

        run.record_generated(generator.generate(&instruction));
        notifier.emit(Stage::Generation, run.code(), false);

        loop {
            run.record_execution(self.sandbox.execute(run.code()));
            let failing = run.is_failing();
            notifier.emit(Stage::Execution, run.output(), failing);

            if !failing {
                run.finish(RunStatus::Completed);
                break;
            }
            if run.attempts() >= max_attempts {
                info!(attempts = run.attempts(), "repair budget exhausted");
                run.finish(RunStatus::Failed);
                break;
            }

            let attempt = run.attempts() + 1;
            debug!(
                attempt,
                patterns = ?matched_patterns(run.output()),
                "requesting repair"
            );
            let fixed =
                repairer.fix_with_task(Some(run.instruction()), run.code(), run.output(), attempt);
            run.record_repair(fixed);
            notifier.emit(Stage::Correction, run.code(), false);
            notifier.status(RunStatus::Fixing, run.attempts());
        }

        info!(
            status = run.status().as_str(),
            attempts = run.attempts(),
            "run finished"
        );
        notifier.status(run.status(), run.attempts());
        run
    }
}
