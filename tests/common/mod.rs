//! Shared fixtures for the integration tests
#![allow(dead_code)]

use pipeflow::config::{OrchestratorConfig, PipeflowSettings};
use pipeflow::dispatch::VirtualTicker;
use pipeflow::model::{ParameterDeclaration, PipelineDefinition, PipelineReference, Row};
use pipeflow::testing::{
    CountingStrategy, InMemoryDefinitionStore, ScriptedRuntime, ScriptedWorkerClient,
};
use pipeflow::Orchestrator;
use std::sync::Arc;

pub const CHILD_PATH: &str = "/etl/child.yml";

/// Child pipeline declaring `P` and `Q`
pub fn child_definition() -> PipelineDefinition {
    PipelineDefinition::new("child")
        .with_parameter(ParameterDeclaration::new("P"))
        .with_parameter(ParameterDeclaration::new("Q"))
}

pub fn store_with(definition: PipelineDefinition) -> Arc<InMemoryDefinitionStore> {
    let store = InMemoryDefinitionStore::new();
    store.insert_path(CHILD_PATH, definition);
    Arc::new(store)
}

pub fn entry() -> OrchestratorConfig {
    OrchestratorConfig::new("load-child", PipelineReference::by_path(CHILD_PATH))
}

/// One row per value, each with the value in field `f`
pub fn rows(values: &[&str]) -> Vec<Row> {
    values
        .iter()
        .map(|value| Row::new().with_field("f", *value))
        .collect()
}

/// Orchestrator whose three strategies all record into `strategy`
pub fn counting_orchestrator(
    store: Arc<InMemoryDefinitionStore>,
    strategy: Arc<CountingStrategy>,
    settings: PipeflowSettings,
) -> Orchestrator {
    Orchestrator::builder(
        store,
        Arc::new(ScriptedRuntime::new()),
        Arc::new(ScriptedWorkerClient::new()),
    )
    .with_settings(settings)
    .with_ticker(Arc::new(VirtualTicker::new()))
    .with_local_strategy(strategy.clone())
    .with_remote_strategy(strategy.clone())
    .with_clustered_strategy(strategy)
    .build()
}

/// Orchestrator with the real strategies over scripted collaborators
pub fn scripted_orchestrator(
    store: Arc<InMemoryDefinitionStore>,
    runtime: Arc<ScriptedRuntime>,
    client: Arc<ScriptedWorkerClient>,
    ticker: Arc<VirtualTicker>,
) -> Orchestrator {
    Orchestrator::builder(store, runtime, client)
        .with_ticker(ticker)
        .build()
}
