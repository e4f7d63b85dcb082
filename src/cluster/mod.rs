//! Cluster plans: one definition partitioned across a worker topology

pub mod splitter;

pub use splitter::StaticPartitioner;

use crate::error::{ErrorCode, PipeflowError};
use crate::model::{PipelineDefinition, RunOutcome, Topology, WorkerDescriptor};
use crate::remote::{RemoteHandle, WorkerError};

pub const CLUSTER_RUN_ID_VAR: &str = "PIPEFLOW_CLUSTER_RUN_ID";
pub const CLUSTER_SIZE_VAR: &str = "PIPEFLOW_CLUSTER_SIZE";
pub const CLUSTER_MASTER_VAR: &str = "PIPEFLOW_CLUSTER_MASTER";
pub const WORKER_NUMBER_VAR: &str = "PIPEFLOW_WORKER_NUMBER";
pub const WORKER_NAME_VAR: &str = "PIPEFLOW_WORKER_NAME";

/// One worker's share of a clustered run
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub worker: WorkerDescriptor,
    pub definition: PipelineDefinition,
    /// Set once the partition was submitted
    pub handle: Option<RemoteHandle>,
    pub finished: bool,
    /// Last outcome reported by the worker
    pub outcome: RunOutcome,
}

impl Partition {
    pub fn new(worker: WorkerDescriptor, definition: PipelineDefinition) -> Self {
        Self {
            worker,
            definition,
            handle: None,
            finished: false,
            outcome: RunOutcome::new(),
        }
    }

    pub fn is_coordinator(&self) -> bool {
        self.worker.is_coordinator
    }
}

/// Partitioning of one definition across a topology with one coordinator.
///
/// Owned by the clustered strategy for a single invocation and torn down on
/// both success and failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterPlan {
    pub run_id: String,
    pub pipeline: String,
    pub topology: String,
    pub partitions: Vec<Partition>,
}

impl ClusterPlan {
    pub fn coordinator(&self) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.is_coordinator())
    }

    pub fn all_finished(&self) -> bool {
        self.partitions.iter().all(|p| p.finished)
    }

    /// Sum of the error counts last reported by every partition
    pub fn error_count(&self) -> u64 {
        self.partitions
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.outcome.error_count))
    }

    /// Whatever the partitions reported so far: summed errors and every file.
    /// Rows are left out.
    pub fn partial_outcome(&self) -> RunOutcome {
        let mut outcome = RunOutcome::failed(self.error_count());
        for partition in &self.partitions {
            for file in partition.outcome.files.values() {
                outcome.add_file(file.clone());
            }
        }
        outcome
    }
}

/// Splits a definition into a [`ClusterPlan`]
pub trait ClusterSplitter: Send + Sync {
    fn split(
        &self,
        definition: &PipelineDefinition,
        topology: &Topology,
        run_id: &str,
    ) -> Result<ClusterPlan, ClusterError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Pipeline '{0}' has no cluster topology")]
    NoTopology(String),

    #[error("Topology '{0}' has no coordinator")]
    NoCoordinator(String),

    #[error("Unable to split pipeline '{pipeline}': {message}")]
    Split { pipeline: String, message: String },

    #[error("Unable to start partition on worker '{worker}'")]
    Start {
        worker: String,
        #[source]
        source: WorkerError,
    },

    #[error("Lost track of partition on worker '{worker}'")]
    Monitor {
        worker: String,
        #[source]
        source: WorkerError,
    },
}

impl From<ClusterError> for PipeflowError {
    fn from(err: ClusterError) -> Self {
        let code = match &err {
            ClusterError::NoTopology(_) | ClusterError::NoCoordinator(_) => {
                ErrorCode::CLUSTER_NO_TOPOLOGY
            }
            ClusterError::Split { .. } => ErrorCode::CLUSTER_SPLIT_FAILED,
            ClusterError::Start { .. } => ErrorCode::CLUSTER_START_FAILED,
            ClusterError::Monitor { .. } => ErrorCode::CLUSTER_MONITOR_FAILED,
        };
        PipeflowError::cluster(code, err.to_string()).with_source(err)
    }
}
