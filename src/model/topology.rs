//! Workers and cluster topologies

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A remote process able to accept and run one pipeline submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerDescriptor {
    pub name: String,
    /// Base URL of the worker API, e.g. `http://etl-1:8181`
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub is_coordinator: bool,
}

impl WorkerDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            username: None,
            password: None,
            is_coordinator: false,
        }
    }

    pub fn coordinator(mut self) -> Self {
        self.is_coordinator = true;
        self
    }
}

impl fmt::Display for WorkerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// The set of workers usable for a clustered run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub name: String,
    #[serde(default)]
    pub workers: Vec<WorkerDescriptor>,
}

impl Topology {
    pub fn new(name: impl Into<String>, workers: Vec<WorkerDescriptor>) -> Self {
        Self {
            name: name.into(),
            workers,
        }
    }

    /// The first worker flagged as coordinator
    pub fn coordinator(&self) -> Option<&WorkerDescriptor> {
        self.workers.iter().find(|w| w.is_coordinator)
    }

    /// Every worker that is not the coordinator
    pub fn non_coordinators(&self) -> impl Iterator<Item = &WorkerDescriptor> {
        self.workers.iter().filter(|w| !w.is_coordinator)
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// Named workers known to the parent workflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerRegistry {
    workers: BTreeMap<String, WorkerDescriptor>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, worker: WorkerDescriptor) {
        self.workers.insert(worker.name.clone(), worker);
    }

    pub fn with_worker(mut self, worker: WorkerDescriptor) -> Self {
        self.register(worker);
        self
    }

    pub fn find(&self, name: &str) -> Option<&WorkerDescriptor> {
        self.workers.get(name)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl FromIterator<WorkerDescriptor> for WorkerRegistry {
    fn from_iter<I: IntoIterator<Item = WorkerDescriptor>>(iter: I) -> Self {
        Self {
            workers: iter.into_iter().map(|w| (w.name.clone(), w)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinator_lookup() {
        let topology = Topology::new(
            "etl",
            vec![
                WorkerDescriptor::new("w1", "http://w1:8181"),
                WorkerDescriptor::new("master", "http://m:8181").coordinator(),
                WorkerDescriptor::new("w2", "http://w2:8181"),
            ],
        );

        assert_eq!(topology.coordinator().map(|w| w.name.as_str()), Some("master"));
        let others: Vec<&str> = topology.non_coordinators().map(|w| w.name.as_str()).collect();
        assert_eq!(others, vec!["w1", "w2"]);
    }

    #[test]
    fn test_topology_without_coordinator() {
        let topology = Topology::new("etl", vec![WorkerDescriptor::new("w1", "http://w1")]);
        assert!(topology.coordinator().is_none());
    }

    #[test]
    fn test_registry_lookup() {
        let registry: WorkerRegistry = vec![WorkerDescriptor::new("etl-1", "http://etl-1")]
            .into_iter()
            .collect();
        assert!(registry.find("etl-1").is_some());
        assert!(registry.find("etl-2").is_none());
    }
}
