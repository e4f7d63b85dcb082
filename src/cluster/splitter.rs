use super::{
    ClusterError, ClusterPlan, ClusterSplitter, Partition, CLUSTER_MASTER_VAR, CLUSTER_RUN_ID_VAR,
    CLUSTER_SIZE_VAR, WORKER_NAME_VAR, WORKER_NUMBER_VAR,
};
use crate::model::{PipelineDefinition, Topology};

/// Gives the coordinator a master copy and every other worker a worker copy of
/// the definition, each tagged with the cluster bookkeeping variables.
///
/// Partitions are numbered in plan order, coordinator first.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPartitioner;

impl ClusterSplitter for StaticPartitioner {
    fn split(
        &self,
        definition: &PipelineDefinition,
        topology: &Topology,
        run_id: &str,
    ) -> Result<ClusterPlan, ClusterError> {
        let coordinator = topology
            .coordinator()
            .ok_or_else(|| ClusterError::NoCoordinator(topology.name.clone()))?;

        let workers: Vec<_> = std::iter::once(coordinator)
            .chain(topology.non_coordinators())
            .collect();
        let size = workers.len();

        let partitions = workers
            .into_iter()
            .enumerate()
            .map(|(number, worker)| {
                let mut copy = definition.clone();
                copy.variables.set(CLUSTER_RUN_ID_VAR, run_id);
                copy.variables.set(CLUSTER_SIZE_VAR, size.to_string());
                copy.variables.set(
                    CLUSTER_MASTER_VAR,
                    if worker.is_coordinator { "Y" } else { "N" },
                );
                copy.variables.set(WORKER_NUMBER_VAR, number.to_string());
                copy.variables.set(WORKER_NAME_VAR, worker.name.clone());
                Partition::new(worker.clone(), copy)
            })
            .collect();

        Ok(ClusterPlan {
            run_id: run_id.to_string(),
            pipeline: definition.name.clone(),
            topology: topology.name.clone(),
            partitions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkerDescriptor;

    fn topology() -> Topology {
        Topology::new(
            "etl",
            vec![
                WorkerDescriptor::new("w1", "http://w1"),
                WorkerDescriptor::new("master", "http://m").coordinator(),
                WorkerDescriptor::new("w2", "http://w2"),
            ],
        )
    }

    #[test]
    fn test_split_tags_every_partition() {
        let plan = StaticPartitioner
            .split(&PipelineDefinition::new("load"), &topology(), "run-1")
            .unwrap();

        assert_eq!(plan.partitions.len(), 3);
        let master = &plan.partitions[0];
        assert!(master.is_coordinator());
        assert_eq!(master.definition.variables.get(CLUSTER_MASTER_VAR), Some("Y"));
        assert_eq!(master.definition.variables.get(WORKER_NUMBER_VAR), Some("0"));

        let last = &plan.partitions[2];
        assert_eq!(last.definition.variables.get(WORKER_NAME_VAR), Some("w2"));
        assert_eq!(last.definition.variables.get(CLUSTER_MASTER_VAR), Some("N"));
        assert_eq!(last.definition.variables.get(CLUSTER_SIZE_VAR), Some("3"));
        assert_eq!(last.definition.variables.get(CLUSTER_RUN_ID_VAR), Some("run-1"));
    }

    #[test]
    fn test_split_requires_coordinator() {
        let topology = Topology::new("etl", vec![WorkerDescriptor::new("w1", "http://w1")]);
        let err = StaticPartitioner
            .split(&PipelineDefinition::new("load"), &topology, "run-1")
            .unwrap_err();
        assert!(matches!(err, ClusterError::NoCoordinator(_)));
    }
}
