pub mod text;

use boa_engine::builtins::promise::PromiseState;
use boa_engine::object::builtins::JsPromise;
use boa_engine::{Context, JsValue, Source};
use thiserror::Error;
use tracing::debug;

pub use text::{ERROR_TAG, canonicalize, normalize_bytes, tagged_error};

/// Runs a script and reports what it printed, or a failure description
/// starting with [`ERROR_TAG`]. Implementations never panic on bad input.
pub trait Sandbox {
    fn execute(&self, code: &str) -> String;
}

impl<T: Sandbox + ?Sized> Sandbox for Box<T> {
    fn execute(&self, code: &str) -> String {
        (**self).execute(code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalOutput {
    pub value: Option<String>,
    pub stdout: String,
}

impl EvalOutput {
    /// Console output followed by the completion value, if any.
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        if !self.stdout.is_empty() {
            parts.push(self.stdout.as_str());
        }
        if let Some(value) = self.value.as_deref() {
            parts.push(value);
        }
        parts.join("\n")
    }
}

#[derive(Debug, Clone, Error)]
#[error("failed evaluating {source_name}: {message}")]
pub struct EvalError {
    pub source_name: String,
    pub message: String,
    /// Console output produced before the script threw.
    pub stdout: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    pub loop_iterations: u64,
    pub recursion: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            loop_iterations: 1_000_000,
            recursion: 512,
        }
    }
}

pub struct BoaEngine {
    ctx: Context,
}

impl BoaEngine {
    pub fn new(limits: SandboxLimits) -> Self {
        let mut ctx = Context::default();
        ctx.runtime_limits_mut()
            .set_loop_iteration_limit(limits.loop_iterations);
        ctx.runtime_limits_mut().set_recursion_limit(limits.recursion);

        let mut engine = Self { ctx };
        engine.install_console_shim();
        engine
    }

    fn install_console_shim(&mut self) {
        // console.* and print() append to a buffer instead of touching the host stdout.
        let _ = self.ctx.eval(Source::from_bytes(
            r#"
globalThis.__devagent_console_logs = [];
globalThis.console = globalThis.console || {};
const __devagent_push = (...args) => {
  globalThis.__devagent_console_logs.push(args.map((v) => String(v)).join(" "));
};
globalThis.console.log = __devagent_push;
globalThis.console.info = __devagent_push;
globalThis.console.warn = __devagent_push;
globalThis.console.error = __devagent_push;
globalThis.print = __devagent_push;
globalThis.__devagent_flush_console = () => {
  const out = globalThis.__devagent_console_logs.join("\n");
  globalThis.__devagent_console_logs = [];
  return out;
};
"#,
        ));
    }

    fn flush_console_logs(&mut self) -> String {
        let flushed = self.ctx.eval(Source::from_bytes(
            "globalThis.__devagent_flush_console?.() ?? ''",
        ));
        let Ok(value) = flushed else {
            return String::new();
        };
        let Ok(text) = value.to_string(&mut self.ctx) else {
            return String::new();
        };
        text.to_std_string_escaped()
    }

    pub fn eval_script(
        &mut self,
        source: &str,
        source_name: &str,
    ) -> Result<EvalOutput, EvalError> {
        let evaluated = self.ctx.eval(Source::from_bytes(source));
        // Promise callbacks and async continuations only run from the job queue.
        self.ctx.run_jobs();
        let stdout = self.flush_console_logs();

        let result = match evaluated {
            Ok(value) => value,
            Err(err) => {
                return Err(EvalError {
                    source_name: source_name.to_string(),
                    message: err.to_string(),
                    stdout,
                });
            }
        };
        let result = match settle_promise(&result) {
            Some(PromiseState::Fulfilled(value)) => value,
            Some(PromiseState::Rejected(reason)) => {
                return Err(EvalError {
                    source_name: source_name.to_string(),
                    message: format!("Uncaught (in promise) {}", self.describe(&reason)),
                    stdout,
                });
            }
            Some(PromiseState::Pending) => JsValue::undefined(),
            None => result,
        };

        if result.is_undefined() {
            return Ok(EvalOutput {
                value: None,
                stdout,
            });
        }

        let rendered = result.to_string(&mut self.ctx).map_err(|err| EvalError {
            source_name: source_name.to_string(),
            message: format!("failed converting JS value to string: {err}"),
            stdout: stdout.clone(),
        })?;

        Ok(EvalOutput {
            value: Some(rendered.to_std_string_escaped()),
            stdout,
        })
    }

    fn describe(&mut self, value: &JsValue) -> String {
        match value.to_string(&mut self.ctx) {
            Ok(text) => text.to_std_string_escaped(),
            Err(_) => value.display().to_string(),
        }
    }
}

/// State of the completion value when the script evaluated to a promise.
fn settle_promise(value: &JsValue) -> Option<PromiseState> {
    let object = value.as_object()?.clone();
    JsPromise::from_object(object).ok().map(|promise| promise.state())
}

impl Default for BoaEngine {
    fn default() -> Self {
        Self::new(SandboxLimits::default())
    }
}

/// In-process sandbox: every call gets a fresh Boa context, so nothing a
/// script defines survives into the next execution.
#[derive(Debug, Clone, Default)]
pub struct BoaSandbox {
    pub limits: SandboxLimits,
}

impl BoaSandbox {
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }
}

impl Sandbox for BoaSandbox {
    fn execute(&self, code: &str) -> String {
        let mut engine = BoaEngine::new(self.limits);
        match engine.eval_script(&canonicalize(code), "<sandbox>") {
            Ok(output) => canonicalize(&output.render()),
            Err(err) => {
                debug!(error = %err, "script failed");
                if err.stdout.is_empty() {
                    tagged_error(&err.to_string())
                } else {
                    format!(
                        "{}\nOutput before failure:\n{}",
                        tagged_error(&err.to_string()),
                        canonicalize(&err.stdout)
                    )
                }
            }
        }
    }
}
