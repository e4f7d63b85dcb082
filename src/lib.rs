//! # Pipeflow
//!
//! Runs a child data pipeline as one step of a parent workflow: in-process, on
//! a remote worker, or split across a cluster of workers. Arguments and named
//! parameters flow from the parent into the child, optionally once per input
//! row, and the child's outcome (error count, rows, files) flows back.
//!
//! ## Usage
//!
//! ```bash
//! pipeflow run entry.yml --rows input.json --var TARGET=staging
//! pipeflow inspect entry.yml
//! ```
//!
//! ## Modules
//!
//! - `model` - Definitions, references, rows, outcomes, workers and topologies
//! - `config` - Entry configuration and layered settings
//! - `resolver` - Loads the referenced child definition exactly once per invocation
//! - `binder` - Builds the child's parameters and arguments for each iteration
//! - `runtime` - Local pipeline runtime abstraction and the process-backed runtime
//! - `remote` - Worker RPC client, HTTP adapter and trust store
//! - `cluster` - Cluster plans and the static partitioner
//! - `dispatch` - Local, remote and clustered dispatch strategies
//! - `hook` - Run-configuration hooks that may redirect or veto a run
//! - `orchestrator` - Iteration controller and outcome aggregator
//! - `cli` - Command line front end
//! - `testing` - Recording fakes for every collaborator
pub mod binder;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hook;
pub mod model;
pub mod orchestrator;
pub mod remote;
pub mod resolver;
pub mod runtime;

pub mod testing;

pub use error::{PipeflowError, Result};
pub use orchestrator::{Orchestrator, ParentContext};
