//! Core data model shared by every orchestrator component

pub mod definition;
pub mod outcome;
pub mod reference;
pub mod row;
pub mod topology;
pub mod variables;

pub use definition::{CommandSpec, ParameterDeclaration, PipelineDefinition};
pub use outcome::{OutcomeSummary, ResultFile, ResultFileKind, RunOutcome};
pub use reference::{PipelineReference, ReferenceKind, ResolvedLocation};
pub use row::Row;
pub use topology::{Topology, WorkerDescriptor, WorkerRegistry};
pub use variables::{VariableScope, CURRENT_DIRECTORY_VAR, PIPELINE_NAME_VAR};
