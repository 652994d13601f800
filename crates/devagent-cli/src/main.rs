mod dispatch;
mod export;
mod logging;
mod render;
mod runtime_context;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use devagent_config::{CliRunOverrides, EngineSetting, PromptStyleSetting, ProviderSetting};
use devagent_core::{Notifier, RunJournal, RunStatus, is_failure};
use devagent_sandbox::{Sandbox, normalize_bytes};
use render::TerminalObserver;
use std::io::{self, Read, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    Auto,
    Ollama,
    Openai,
}

impl ProviderArg {
    fn as_setting(self) -> ProviderSetting {
        match self {
            ProviderArg::Auto => ProviderSetting::Auto,
            ProviderArg::Ollama => ProviderSetting::Ollama,
            ProviderArg::Openai => ProviderSetting::Openai,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EngineArg {
    Boa,
    Node,
}

impl EngineArg {
    fn as_setting(self) -> EngineSetting {
        match self {
            EngineArg::Boa => EngineSetting::Boa,
            EngineArg::Node => EngineSetting::Node,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PromptStyleArg {
    Plain,
    Sectioned,
}

impl PromptStyleArg {
    fn as_setting(self) -> PromptStyleSetting {
        match self {
            PromptStyleArg::Plain => PromptStyleSetting::Plain,
            PromptStyleArg::Sectioned => PromptStyleSetting::Sectioned,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "devagent",
    version,
    about = "Generate, run and repair scripts from plain-language instructions"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags shared by every command that talks to the model.
#[derive(Debug, Clone, Default, Args)]
struct AgentArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    provider: Option<ProviderArg>,
    #[arg(long)]
    ollama_url: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long, value_enum)]
    engine: Option<EngineArg>,
    #[arg(long)]
    max_attempts: Option<u32>,
    #[arg(long, value_enum)]
    prompt_style: Option<PromptStyleArg>,
    /// Ask for a comment on every line of the generated script.
    #[arg(long)]
    explain: bool,
    #[arg(long)]
    no_progress: bool,
    #[arg(long)]
    verbose: bool,
}

impl AgentArgs {
    fn overrides(&self) -> CliRunOverrides {
        CliRunOverrides {
            provider: self.provider.map(ProviderArg::as_setting),
            ollama_url: self.ollama_url.clone(),
            model: self.model.clone(),
            engine: self.engine.map(EngineArg::as_setting),
            max_attempts: self.max_attempts,
            prompt_style: self.prompt_style.map(PromptStyleArg::as_setting),
            explain: self.explain.then_some(true),
            verbose: self.verbose.then_some(true),
            no_progress: self.no_progress.then_some(true),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Turn an instruction into a working script.
    Run {
        /// Instruction text; `-` reads it from stdin.
        #[arg(value_name = "INSTRUCTION", required = true, num_args = 1..)]
        instruction: Vec<String>,
        #[command(flatten)]
        agent: AgentArgs,
        /// Print the final artifact as JSON.
        #[arg(long)]
        json: bool,
        /// Write the final script to this file.
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
        /// Save the progress journal as devagent_log_<timestamp>.txt.
        #[arg(long)]
        save_log: bool,
    },
    /// Run a script directly in the sandbox, without the model.
    Eval {
        code: String,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum)]
        engine: Option<EngineArg>,
    },
    /// Read one instruction per line and run each one.
    Repl {
        #[command(flatten)]
        agent: AgentArgs,
    },
}

fn read_instruction(words: &[String]) -> Result<String> {
    if words.len() == 1 && words[0] == "-" {
        let mut raw = Vec::new();
        io::stdin()
            .read_to_end(&mut raw)
            .context("failed reading instruction from stdin")?;
        return Ok(normalize_bytes(&raw));
    }
    Ok(words.join(" "))
}

fn run_command(
    instruction: Vec<String>,
    agent: AgentArgs,
    json: bool,
    output: Option<PathBuf>,
    save_log: bool,
) -> Result<()> {
    let instruction = read_instruction(&instruction)?;
    let resolved = runtime_context::resolve_config(agent.config.clone(), &agent.overrides())?;
    let controller = runtime_context::build_controller(&resolved, agent.model.clone())?;
    let mode = runtime_context::resolved_progress_mode(resolved.progress, resolved.verbose);

    let terminal = TerminalObserver::new(mode);
    let journal = RunJournal::new();
    let notifier = Notifier::new().attach(&terminal).attach(&journal);
    let run = controller.run(&instruction, &notifier);
    let artifact = run.artifact();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&artifact).context("failed serializing artifact")?
        );
    } else {
        println!("{}", artifact.full_result);
    }

    if let Some(path) = output {
        export::write_script(&path, &artifact.code)?;
        eprintln!("[devagent] wrote script {}", path.display());
    }
    if save_log {
        let contents = export::render_journal(run.instruction(), &journal.render(), &artifact);
        let path = export::save_journal(&std::env::current_dir()?, &contents)?;
        eprintln!("[devagent] saved run log {}", path.display());
    }

    match artifact.status {
        RunStatus::Completed => Ok(()),
        _ => Err(anyhow!(
            "run failed after {} repair attempt(s)",
            artifact.attempts
        )),
    }
}

fn eval_command(code: String, config: Option<PathBuf>, engine: Option<EngineArg>) -> Result<()> {
    let overrides = CliRunOverrides {
        engine: engine.map(EngineArg::as_setting),
        ..CliRunOverrides::default()
    };
    let resolved = runtime_context::resolve_config(config, &overrides)?;
    let sandbox = runtime_context::build_sandbox(&resolved)?;
    let output = sandbox.execute(&code);
    println!("{output}");
    if is_failure(&output) {
        return Err(anyhow!("script failed"));
    }
    Ok(())
}

fn repl_command(agent: AgentArgs) -> Result<()> {
    let resolved = runtime_context::resolve_config(agent.config.clone(), &agent.overrides())?;
    let controller = runtime_context::build_controller(&resolved, agent.model.clone())?;
    let mode = runtime_context::resolved_progress_mode(resolved.progress, resolved.verbose);
    let terminal = TerminalObserver::new(mode);
    let notifier = Notifier::new().attach(&terminal);
    let mut line = String::new();

    println!(
        "devagent REPL. One instruction per line, .exit to quit (max {} repair attempts).",
        controller.config().max_attempts()
    );
    loop {
        line.clear();
        print!("devagent> ");
        io::stdout().flush().context("failed flushing stdout")?;

        let bytes = io::stdin()
            .read_line(&mut line)
            .context("failed reading REPL input")?;
        if bytes == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == ".exit" {
            break;
        }

        let run = controller.run(trimmed, &notifier);
        println!("{}", run.full_result());
        if run.status() == RunStatus::Failed {
            eprintln!(
                "error: run failed after {} repair attempt(s)",
                run.attempts()
            );
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    dispatch::execute(cli)
}
