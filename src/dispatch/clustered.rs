use super::{DispatchError, DispatchReport, DispatchRequest, DispatchStrategy, StrategyTag, Ticker};
use crate::cluster::{ClusterError, ClusterPlan, ClusterSplitter};
use crate::model::{PipelineDefinition, RunOutcome};
use crate::remote::{RemoteHandle, SubmitRequest, WorkerClient};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Splits the child across a worker topology and runs every partition
pub struct ClusteredStrategy {
    client: Arc<dyn WorkerClient>,
    splitter: Arc<dyn ClusterSplitter>,
    ticker: Arc<dyn Ticker>,
    interval: Duration,
}

/// How monitoring ended
enum MonitorEnd {
    Finished,
    Failed,
    Cancelled,
}

impl ClusteredStrategy {
    pub fn new(
        client: Arc<dyn WorkerClient>,
        splitter: Arc<dyn ClusterSplitter>,
        ticker: Arc<dyn Ticker>,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            splitter,
            ticker,
            interval,
        }
    }

    async fn execute(
        &self,
        request: &DispatchRequest<'_>,
        slot: &mut Option<ClusterPlan>,
    ) -> Result<DispatchReport, ClusterError> {
        let definition = request.definition;
        let topology = definition
            .topology
            .as_ref()
            .ok_or_else(|| ClusterError::NoTopology(definition.name.clone()))?;

        let run_id = Uuid::new_v4().to_string();
        let plan = slot.insert(self.splitter.split(definition, topology, &run_id)?);
        info!(
            entry = request.entry,
            run_id = %plan.run_id,
            partitions = plan.partitions.len(),
            "Split pipeline '{}' over topology '{}'",
            plan.pipeline,
            plan.topology
        );

        // clustered runs are always monitored so the plan gets torn down,
        // whatever `wait_for_completion` says
        self.start_partitions(plan, request).await?;

        let mut report = DispatchReport::default();
        match self.monitor(plan, request).await? {
            MonitorEnd::Cancelled => {
                report.outcome.add_errors(1);
                report.cancelled = true;
            }
            MonitorEnd::Finished | MonitorEnd::Failed => {
                report = self.collect(plan, request.suppress_rows).await?;
            }
        }

        let failures = self.teardown(plan).await;
        if failures > 0 {
            report.outcome.add_errors(1);
        }
        Ok(report)
    }

    async fn start_partitions(
        &self,
        plan: &mut ClusterPlan,
        request: &DispatchRequest<'_>,
    ) -> Result<(), ClusterError> {
        for partition in plan.partitions.iter_mut() {
            let mut submission = SubmitRequest::for_definition(&partition.definition, request.arguments);
            submission.rows = request.prior.rows.clone();
            submission.follow_remote_abort = request.config.follow_remote_abort;
            if let Some(log) = request.log {
                submission.log_file = Some(log.file.clone());
                submission.append_log = log.append;
                submission.log_level = Some(log.level.as_str().to_string());
            }

            let handle = self
                .client
                .submit(&partition.worker, &submission)
                .await
                .map_err(|source| ClusterError::Start {
                    worker: partition.worker.name.clone(),
                    source,
                })?;
            debug!(%handle, "Started partition");
            partition.handle = Some(handle);
        }
        Ok(())
    }

    /// Poll every unfinished partition until all are done. Errors on any
    /// partition or cancellation stop the whole plan.
    async fn monitor(
        &self,
        plan: &mut ClusterPlan,
        request: &DispatchRequest<'_>,
    ) -> Result<MonitorEnd, ClusterError> {
        loop {
            if request.cancel.is_cancelled() {
                info!(run_id = %plan.run_id, "Cancellation requested, stopping all partitions");
                self.abort_all(plan).await;
                return Ok(MonitorEnd::Cancelled);
            }

            let pending: Vec<(usize, RemoteHandle)> = plan
                .partitions
                .iter()
                .enumerate()
                .filter(|(_, p)| !p.finished)
                .filter_map(|(index, p)| p.handle.clone().map(|handle| (index, handle)))
                .collect();
            let statuses =
                join_all(pending.iter().map(|(_, handle)| self.client.status(handle, false))).await;

            for ((index, _), status) in pending.iter().zip(statuses) {
                let partition = &mut plan.partitions[*index];
                let status = status.map_err(|source| ClusterError::Monitor {
                    worker: partition.worker.name.clone(),
                    source,
                })?;
                partition.finished = !status.running;
                partition.outcome = status.outcome;
            }

            let errors = plan.error_count();
            if errors > 0 {
                warn!(run_id = %plan.run_id, errors, "Partitions reported errors, stopping all");
                self.abort_all(plan).await;
                return Ok(MonitorEnd::Failed);
            }
            if plan.all_finished() {
                return Ok(MonitorEnd::Finished);
            }

            debug!(run_id = %plan.run_id, "Clustered pipeline still running");
            self.ticker.tick(self.interval).await;
        }
    }

    async fn abort_all(&self, plan: &ClusterPlan) {
        for partition in plan.partitions.iter().filter(|p| !p.finished) {
            if let Some(handle) = &partition.handle {
                if let Err(e) = self.client.abort(handle).await {
                    warn!(%handle, "Abort of partition failed: {}", e);
                }
            }
        }
    }

    /// Sum the final outcome of every partition. Rows come from the coordinator.
    async fn collect(
        &self,
        plan: &mut ClusterPlan,
        suppress_rows: bool,
    ) -> Result<DispatchReport, ClusterError> {
        let mut total = RunOutcome::new();
        let mut rows_observed = false;

        for partition in plan.partitions.iter_mut() {
            let Some(handle) = partition.handle.clone() else {
                continue;
            };
            let include_rows = partition.is_coordinator() && !suppress_rows;
            let fetched = self
                .client
                .fetch_outcome(&handle, include_rows)
                .await
                .map_err(|source| ClusterError::Monitor {
                    worker: partition.worker.name.clone(),
                    source,
                })?;

            let mut errors = fetched.error_count.max(partition.outcome.error_count);
            if fetched.stopped {
                errors = errors.saturating_add(1);
            }
            total.add_errors(errors);
            for file in fetched.files.values() {
                total.add_file(file.clone());
            }
            if include_rows && !fetched.rows.is_empty() {
                total.rows = fetched.rows.clone();
                rows_observed = true;
            }
            partition.outcome = fetched;
            partition.outcome.error_count = errors;
        }

        info!(run_id = %plan.run_id, errors = total.error_count, "Clustered pipeline finished");
        Ok(DispatchReport::new(total, rows_observed))
    }

    /// Clean every started partition, then free the coordinator's sockets.
    /// Returns the number of failed calls.
    async fn teardown(&self, plan: &ClusterPlan) -> usize {
        let mut failures = 0;
        for partition in &plan.partitions {
            if let Some(handle) = &partition.handle {
                if let Err(e) = self.client.cleanup(handle).await {
                    warn!(%handle, "Cleanup of partition failed: {}", e);
                    failures += 1;
                }
            }
        }

        if let Some(coordinator) = plan.coordinator() {
            if let Err(e) = self
                .client
                .release_sockets(&coordinator.worker, &plan.pipeline, Some(&plan.run_id))
                .await
            {
                warn!(run_id = %plan.run_id, "Releasing sockets on '{}' failed: {}", coordinator.worker.name, e);
                failures += 1;
            }
        }
        failures
    }

    /// Without a plan, free whatever the static coordinator may hold for the pipeline
    async fn release_static_coordinator(&self, definition: &PipelineDefinition) {
        let Some(coordinator) = definition.topology.as_ref().and_then(|t| t.coordinator()) else {
            return;
        };
        if let Err(e) = self
            .client
            .release_sockets(coordinator, &definition.name, None)
            .await
        {
            warn!("Releasing sockets on '{}' failed: {}", coordinator.name, e);
        }
    }
}

#[async_trait]
impl DispatchStrategy for ClusteredStrategy {
    fn name(&self) -> &'static str {
        "clustered"
    }

    async fn dispatch(&self, request: DispatchRequest<'_>) -> Result<DispatchReport, DispatchError> {
        if *request.target != StrategyTag::Clustered {
            return Err(DispatchError::Misrouted {
                strategy: self.name(),
                target: request.target.to_string(),
            });
        }

        let mut plan = None;
        match self.execute(&request, &mut plan).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(entry = request.entry, "Clustered run of '{}' failed: {}", request.definition.name, e);
                let mut outcome = match &plan {
                    Some(plan) => {
                        self.abort_all(plan).await;
                        self.teardown(plan).await;
                        plan.partial_outcome()
                    }
                    None => {
                        self.release_static_coordinator(request.definition).await;
                        RunOutcome::new()
                    }
                };
                outcome.add_errors(1);
                Ok(DispatchReport::new(outcome, false))
            }
        }
    }
}
