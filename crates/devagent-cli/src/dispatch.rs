use super::{AgentArgs, Cli, Commands, eval_command, repl_command, run_command};
use anyhow::Result;

pub(crate) fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Run {
            instruction,
            agent,
            json,
            output,
            save_log,
        }) => run_command(instruction, agent, json, output, save_log),
        Some(Commands::Eval {
            code,
            config,
            engine,
        }) => eval_command(code, config, engine),
        Some(Commands::Repl { agent }) => repl_command(agent),
        None => repl_command(AgentArgs::default()),
    }
}
