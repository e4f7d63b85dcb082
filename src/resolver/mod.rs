//! Definition Resolver
//!
//! Turns a [`PipelineReference`] plus the parent variable scope into exactly one
//! loaded [`PipelineDefinition`] with its variable scope prepared for binding.
//! Resolution runs once per invocation; any failure is fatal to the invocation.

pub mod error;
pub mod store;

pub use error::{ResolutionError, StoreError};
pub use store::FileDefinitionStore;

use crate::model::{
    PipelineDefinition, PipelineReference, ResolvedLocation, VariableScope, CURRENT_DIRECTORY_VAR,
    PIPELINE_NAME_VAR,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Source of pipeline definitions
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// Load the definition at `location`; `scope` is available for store-level lookups
    async fn load(
        &self,
        location: &ResolvedLocation,
        scope: &VariableScope,
    ) -> Result<PipelineDefinition, StoreError>;
}

pub struct DefinitionResolver {
    store: Arc<dyn DefinitionStore>,
}

impl DefinitionResolver {
    pub fn new(store: Arc<dyn DefinitionStore>) -> Self {
        Self { store }
    }

    /// Resolve and load the referenced definition.
    ///
    /// After loading, parent variables overwrite the variables the child already
    /// declares; with `inherit_all` the remaining parent variables are copied in
    /// too. The current directory and pipeline name variables always describe
    /// the child itself.
    pub async fn resolve(
        &self,
        reference: &PipelineReference,
        scope: &VariableScope,
        inherit_all: bool,
    ) -> Result<PipelineDefinition, ResolutionError> {
        let location = reference
            .locate(scope)
            .ok_or(ResolutionError::EmptyReference {
                kind: reference.effective_kind(),
            })?;

        debug!(kind = %location.kind(), %location, "Loading pipeline definition");

        let mut definition =
            self.store
                .load(&location, scope)
                .await
                .map_err(|source| ResolutionError::Store {
                    location: location.to_string(),
                    source,
                })?;

        if definition.location.is_none() {
            definition.location = Some(location);
        }

        definition.variables.overlay_declared(scope);
        if inherit_all {
            definition.variables.add_missing(scope);
        }

        match definition.current_directory() {
            Some(dir) => definition.variables.set(CURRENT_DIRECTORY_VAR, dir),
            None => {
                definition.variables.remove(CURRENT_DIRECTORY_VAR);
            }
        }
        let name = definition.name.clone();
        definition.variables.set(PIPELINE_NAME_VAR, name);

        Ok(definition)
    }
}
