//! Command line front end
//!
//! - Argument parsing structures
//! - Command implementations
//! - Log filter selection
//! - Input validation

pub mod args;
pub mod commands;
pub mod help;
pub mod router;
pub mod validation;

pub use args::{Cli, Commands};
pub use help::{get_log_level, log_filter};
pub use router::execute_command;
pub use validation::{parse_var, validate_entry_file};
