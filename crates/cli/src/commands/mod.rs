mod run;

use anyhow::Error;
use clap::Parser;

pub use self::run::RunCommand;

#[derive(Parser)]
#[command(
    name = "wasmi",
    version,
    about,
    after_help = "If a subcommand is not provided, the `run` subcommand will be used.",
    // This is required to enable the pattern that either a command is required
    // or the `run` command is used by default.
    args_conflicts_with_subcommands = true,
)]
pub struct WasmiApp {
    #[command(subcommand)]
    subcommand: Option<SubCommand>,
    #[command(flatten)]
    run: RunCommand,
}

#[derive(Parser)]
pub enum SubCommand {
    Run(RunCommand),
}

impl WasmiApp {
    /// Returns `true` if `-v`/`--verbose` was passed to the active subcommand.
    ///
    /// Checked before dispatch so the tracing subscriber can be installed
    /// with the right default filter ahead of `execute`.
    pub fn verbose(&self) -> bool {
        match &self.subcommand {
            Some(SubCommand::Run(run)) => run.verbose(),
            None => self.run.verbose(),
        }
    }
}

/// Implemented by sub-commands in order to execute them.
pub trait Command {
    /// Executes the command.
    fn execute(self) -> Result<(), Error>;
}

impl Command for WasmiApp {
    fn execute(self) -> Result<(), Error> {
        let subcommand = self.subcommand.unwrap_or(SubCommand::Run(self.run));
        match subcommand {
            SubCommand::Run(c) => c.execute(),
        }
    }
}
