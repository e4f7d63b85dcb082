//! Test doubles for the orchestrator's collaborators
//!
//! Every fake records its calls so tests can assert on exact interaction
//! counts. Time is virtual: pair the fakes with [`VirtualTicker`].

pub mod cluster;
pub mod request;
pub mod runtime;
pub mod store;
pub mod strategy;
pub mod worker;

pub use crate::dispatch::VirtualTicker;
pub use cluster::ScriptedSplitter;
pub use request::RequestFixture;
pub use runtime::{RuntimeCalls, ScriptedRuntime, StartedRun};
pub use store::InMemoryDefinitionStore;
pub use strategy::{CountingStrategy, SeenDispatch};
pub use worker::{ScriptedWorkerClient, WorkerCalls};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a fake's state; a panicking test must not poison the others
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
