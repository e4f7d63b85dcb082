use super::lock;
use crate::model::{PipelineDefinition, ResolvedLocation, VariableScope};
use crate::resolver::{DefinitionStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Definition store backed by a map of resolved locations
#[derive(Default)]
pub struct InMemoryDefinitionStore {
    definitions: Mutex<HashMap<String, PipelineDefinition>>,
    loads: Mutex<Vec<ResolvedLocation>>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(location: &ResolvedLocation) -> String {
        format!("{}:{}", location.kind(), location)
    }

    pub fn insert(&self, location: ResolvedLocation, definition: PipelineDefinition) {
        lock(&self.definitions).insert(Self::key(&location), definition);
    }

    pub fn insert_path(&self, path: impl Into<String>, definition: PipelineDefinition) {
        self.insert(ResolvedLocation::Path(path.into()), definition);
    }

    pub fn insert_stored(
        &self,
        name: impl Into<String>,
        directory: impl Into<String>,
        definition: PipelineDefinition,
    ) {
        self.insert(
            ResolvedLocation::Stored {
                name: name.into(),
                directory: directory.into(),
            },
            definition,
        );
    }

    pub fn insert_id(&self, id: impl Into<String>, definition: PipelineDefinition) {
        self.insert(ResolvedLocation::Id(id.into()), definition);
    }

    /// Every location loaded so far, in order
    pub fn loads(&self) -> Vec<ResolvedLocation> {
        lock(&self.loads).clone()
    }
}

#[async_trait]
impl DefinitionStore for InMemoryDefinitionStore {
    async fn load(
        &self,
        location: &ResolvedLocation,
        _scope: &VariableScope,
    ) -> Result<PipelineDefinition, StoreError> {
        lock(&self.loads).push(location.clone());
        lock(&self.definitions)
            .get(&Self::key(location))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(location.to_string()))
    }
}
