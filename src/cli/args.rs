//! CLI argument structures

use super::validation::parse_var;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run child pipelines from the command line
#[derive(Parser)]
#[command(name = "pipeflow")]
#[command(about = "pipeflow - Run a child pipeline locally, remotely or on a cluster", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one entry and print its outcome as JSON
    #[command(name = "run")]
    Run {
        /// Entry file (YAML, JSON or TOML)
        entry: PathBuf,

        /// Input rows: a JSON array of objects or one JSON object per line
        #[arg(long, value_name = "FILE")]
        rows: Option<PathBuf>,

        /// Parent variable, repeatable
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// Parent positional argument, repeatable
        #[arg(long = "arg", value_name = "VALUE")]
        args: Vec<String>,

        /// Root directory of pipeline definitions
        #[arg(long, value_name = "DIR")]
        definitions: Option<PathBuf>,
    },

    /// Show how an entry would be run without running it
    #[command(name = "inspect")]
    Inspect {
        /// Entry file (YAML, JSON or TOML)
        entry: PathBuf,
    },
}
