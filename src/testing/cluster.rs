use super::lock;
use crate::cluster::{ClusterError, ClusterPlan, ClusterSplitter, StaticPartitioner};
use crate::model::{PipelineDefinition, Topology};
use std::sync::Mutex;

/// Splitter that delegates to [`StaticPartitioner`] or fails on demand
#[derive(Default)]
pub struct ScriptedSplitter {
    fail: bool,
    calls: Mutex<usize>,
}

impl ScriptedSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        *lock(&self.calls)
    }
}

impl ClusterSplitter for ScriptedSplitter {
    fn split(
        &self,
        definition: &PipelineDefinition,
        topology: &Topology,
        run_id: &str,
    ) -> Result<ClusterPlan, ClusterError> {
        *lock(&self.calls) += 1;
        if self.fail {
            return Err(ClusterError::Split {
                pipeline: definition.name.clone(),
                message: "scripted split failure".to_string(),
            });
        }
        StaticPartitioner.split(definition, topology, run_id)
    }
}
