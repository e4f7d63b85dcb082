use super::lock;
use crate::model::{RunOutcome, WorkerDescriptor};
use crate::remote::{RemoteHandle, SubmitRequest, WorkerClient, WorkerError, WorkerStatus};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Call counts per worker operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerCalls {
    pub submit: usize,
    pub status: usize,
    pub fetch_outcome: usize,
    pub abort: usize,
    pub cleanup: usize,
    pub release_sockets: usize,
}

#[derive(Default)]
struct WorkerState {
    next_id: u64,
    calls: WorkerCalls,
    polls: HashMap<String, usize>,
    aborted: HashSet<String>,
    fetch_requests: Vec<bool>,
    submissions: Vec<SubmitRequest>,
    releases: Vec<(String, String, Option<String>)>,
}

/// Worker client whose submissions run for a fixed number of status calls.
///
/// Each submission reports `running` for its first `running_for` status calls
/// and then finishes with the scripted final outcome. Aborted submissions stop
/// at once and report a stopped outcome.
#[derive(Default)]
pub struct ScriptedWorkerClient {
    running_for: usize,
    running_errors: u64,
    final_outcome: RunOutcome,
    fail_submit: bool,
    fail_submit_for: Option<String>,
    fail_status_from: Option<usize>,
    fail_fetch_from: Option<usize>,
    fail_abort: bool,
    fail_cleanup: bool,
    fail_release: bool,
    state: Mutex<WorkerState>,
}

impl ScriptedWorkerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running_for(mut self, status_calls: usize) -> Self {
        self.running_for = status_calls;
        self
    }

    /// Error count reported while a submission is still running
    pub fn with_running_errors(mut self, errors: u64) -> Self {
        self.running_errors = errors;
        self
    }

    pub fn with_final(mut self, outcome: RunOutcome) -> Self {
        self.final_outcome = outcome;
        self
    }

    pub fn fail_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    /// Reject submissions to one worker only
    pub fn fail_submit_for(mut self, worker: impl Into<String>) -> Self {
        self.fail_submit_for = Some(worker.into());
        self
    }

    /// The nth status call (counting from 1) and every later one fail
    pub fn fail_status_from(mut self, call: usize) -> Self {
        self.fail_status_from = Some(call);
        self
    }

    /// The nth outcome fetch (counting from 1) and every later one fail
    pub fn fail_fetch_from(mut self, call: usize) -> Self {
        self.fail_fetch_from = Some(call);
        self
    }

    pub fn fail_abort(mut self) -> Self {
        self.fail_abort = true;
        self
    }

    pub fn fail_cleanup(mut self) -> Self {
        self.fail_cleanup = true;
        self
    }

    pub fn fail_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    pub fn calls(&self) -> WorkerCalls {
        lock(&self.state).calls
    }

    /// `include_rows` of every outcome fetch, in order
    pub fn fetch_requests(&self) -> Vec<bool> {
        lock(&self.state).fetch_requests.clone()
    }

    /// Accepted submissions, in order
    pub fn submissions(&self) -> Vec<SubmitRequest> {
        lock(&self.state).submissions.clone()
    }

    /// `(worker, pipeline, run id)` of every socket release, in order
    pub fn releases(&self) -> Vec<(String, String, Option<String>)> {
        lock(&self.state).releases.clone()
    }

    fn failure(worker: &str, operation: &str) -> WorkerError {
        WorkerError::Rejected {
            worker: worker.to_string(),
            status: 500,
            message: format!("scripted {} failure", operation),
        }
    }
}

#[async_trait]
impl WorkerClient for ScriptedWorkerClient {
    async fn submit(
        &self,
        worker: &WorkerDescriptor,
        request: &SubmitRequest,
    ) -> Result<RemoteHandle, WorkerError> {
        let mut state = lock(&self.state);
        state.calls.submit += 1;
        if self.fail_submit || self.fail_submit_for.as_deref() == Some(worker.name.as_str()) {
            return Err(Self::failure(&worker.name, "submit"));
        }

        state.submissions.push(request.clone());
        state.next_id += 1;
        Ok(RemoteHandle {
            id: format!("sub-{}", state.next_id),
            pipeline: request.pipeline.name.clone(),
            worker: worker.clone(),
        })
    }

    async fn status(
        &self,
        handle: &RemoteHandle,
        include_rows: bool,
    ) -> Result<WorkerStatus, WorkerError> {
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        state.calls.status += 1;
        if self.fail_status_from.is_some_and(|from| state.calls.status >= from) {
            return Err(WorkerError::unreachable(&handle.worker, "connection refused"));
        }

        let polls = state.polls.entry(handle.id.clone()).or_insert(0);
        *polls += 1;
        let running = *polls <= self.running_for && !state.aborted.contains(&handle.id);

        let outcome = if running {
            RunOutcome::failed(self.running_errors)
        } else {
            self.final_for(state, handle, include_rows)
        };
        Ok(WorkerStatus { running, outcome })
    }

    async fn fetch_outcome(
        &self,
        handle: &RemoteHandle,
        include_rows: bool,
    ) -> Result<RunOutcome, WorkerError> {
        let mut state = lock(&self.state);
        state.calls.fetch_outcome += 1;
        state.fetch_requests.push(include_rows);
        if self.fail_fetch_from.is_some_and(|from| state.calls.fetch_outcome >= from) {
            return Err(WorkerError::unreachable(&handle.worker, "connection reset"));
        }
        Ok(self.final_for(&state, handle, include_rows))
    }

    async fn abort(&self, handle: &RemoteHandle) -> Result<(), WorkerError> {
        let mut state = lock(&self.state);
        state.calls.abort += 1;
        if self.fail_abort {
            return Err(Self::failure(&handle.worker.name, "abort"));
        }
        state.aborted.insert(handle.id.clone());
        Ok(())
    }

    async fn cleanup(&self, handle: &RemoteHandle) -> Result<(), WorkerError> {
        lock(&self.state).calls.cleanup += 1;
        if self.fail_cleanup {
            return Err(Self::failure(&handle.worker.name, "cleanup"));
        }
        Ok(())
    }

    async fn release_sockets(
        &self,
        worker: &WorkerDescriptor,
        pipeline: &str,
        run_id: Option<&str>,
    ) -> Result<(), WorkerError> {
        let mut state = lock(&self.state);
        state.calls.release_sockets += 1;
        state.releases.push((
            worker.name.clone(),
            pipeline.to_string(),
            run_id.map(str::to_string),
        ));
        if self.fail_release {
            return Err(Self::failure(&worker.name, "release"));
        }
        Ok(())
    }
}

impl ScriptedWorkerClient {
    fn final_for(&self, state: &WorkerState, handle: &RemoteHandle, include_rows: bool) -> RunOutcome {
        let mut outcome = self.final_outcome.clone();
        if state.aborted.contains(&handle.id) {
            outcome.stopped = true;
        }
        if !include_rows {
            outcome.rows.clear();
        }
        outcome
    }
}
