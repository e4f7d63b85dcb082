//! CLI command implementations

pub mod inspect;
pub mod run;

pub use inspect::{inspect_entry, InspectReport};
pub use run::{load_rows, parse_rows, run_entry, RunOptions};
