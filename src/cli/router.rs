//! Command routing and execution

use crate::cli::args::Commands;
use crate::cli::commands::{inspect_entry, run_entry, RunOptions};
use crate::config::PipeflowSettings;
use anyhow::Result;

/// Execute a CLI command; returns the process exit code
pub async fn execute_command(command: Commands, settings: PipeflowSettings) -> Result<i32> {
    match command {
        Commands::Run {
            entry,
            rows,
            vars,
            args,
            definitions,
        } => {
            let options = RunOptions {
                entry,
                rows,
                vars,
                args,
                definitions,
            };
            let outcome = run_entry(options, &settings).await?;
            println!("{}", serde_json::to_string_pretty(&outcome.summary())?);
            Ok(if outcome.succeeded() { 0 } else { 1 })
        }
        Commands::Inspect { entry } => {
            let report = inspect_entry(&entry).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(0)
        }
    }
}
