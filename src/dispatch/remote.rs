use super::{DispatchError, DispatchReport, DispatchRequest, DispatchStrategy, StrategyTag, Ticker};
use crate::model::RunOutcome;
use crate::remote::{RemoteHandle, SubmitRequest, WorkerClient};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Runs the child on one remote worker and polls it to completion
pub struct RemoteStrategy {
    client: Arc<dyn WorkerClient>,
    ticker: Arc<dyn Ticker>,
    interval: Duration,
}

impl RemoteStrategy {
    pub fn new(client: Arc<dyn WorkerClient>, ticker: Arc<dyn Ticker>, interval: Duration) -> Self {
        Self {
            client,
            ticker,
            interval,
        }
    }

    /// Poll until the submission finishes, the worker stops answering, or the
    /// parent cancels
    async fn monitor(
        &self,
        handle: RemoteHandle,
        request: &DispatchRequest<'_>,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        loop {
            if request.cancel.is_cancelled() {
                break;
            }

            let status = match self.client.status(&handle, false).await {
                Ok(status) => status,
                Err(e) => {
                    error!(%handle, "Unable to contact worker for pipeline '{}': {}", handle.pipeline, e);
                    report.outcome.add_errors(1);
                    return report;
                }
            };

            if status.running {
                debug!(%handle, errors = status.outcome.error_count, "Remote pipeline still running");
                self.ticker.tick(self.interval).await;
                continue;
            }

            match self.client.fetch_outcome(&handle, !request.suppress_rows).await {
                Ok(outcome) => {
                    if request.config.log_remote_work {
                        log_remote_text(&handle, &outcome);
                    }
                    report.rows_observed = !request.suppress_rows && !outcome.rows.is_empty();
                    report.outcome = outcome;
                    if report.outcome.stopped {
                        warn!(%handle, "Remote pipeline '{}' was stopped", handle.pipeline);
                        report.outcome.add_errors(1);
                    }
                }
                Err(e) => {
                    error!(%handle, "Unable to fetch the result of pipeline '{}': {}", handle.pipeline, e);
                    report.outcome.add_errors(1);
                    return report;
                }
            }

            if let Err(e) = self.client.cleanup(&handle).await {
                warn!(%handle, "Cleanup of pipeline '{}' failed: {}", handle.pipeline, e);
                report.outcome.add_errors(1);
            }
            info!(%handle, errors = report.outcome.error_count, "Remote pipeline finished");
            return report;
        }

        info!(%handle, "Cancellation requested, aborting remote pipeline '{}'", handle.pipeline);
        if let Err(e) = self.client.abort(&handle).await {
            warn!(%handle, "Abort of pipeline '{}' failed: {}", handle.pipeline, e);
        }
        if let Err(e) = self.client.cleanup(&handle).await {
            warn!(%handle, "Cleanup of pipeline '{}' failed: {}", handle.pipeline, e);
        }
        report.outcome.add_errors(1);
        report.cancelled = true;
        report
    }
}

fn log_remote_text(handle: &RemoteHandle, outcome: &RunOutcome) {
    if let Some(text) = &outcome.log_text {
        for line in text.lines() {
            info!(worker = %handle.worker.name, "{}", line);
        }
    }
}

#[async_trait]
impl DispatchStrategy for RemoteStrategy {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn dispatch(&self, request: DispatchRequest<'_>) -> Result<DispatchReport, DispatchError> {
        let StrategyTag::RemoteSingle(name) = request.target else {
            return Err(DispatchError::Misrouted {
                strategy: self.name(),
                target: request.target.to_string(),
            });
        };

        let name = request.parent_scope.substitute(name);
        if name.trim().is_empty() {
            return Err(DispatchError::NoWorker);
        }
        let worker = request
            .workers
            .find(&name)
            .ok_or_else(|| DispatchError::UnknownWorker(name.clone()))?;

        let mut submission = SubmitRequest::for_definition(request.definition, request.arguments);
        submission.rows = request.prior.rows.clone();
        submission.follow_remote_abort = request.config.follow_remote_abort;
        if let Some(log) = request.log {
            submission.log_file = Some(log.file.clone());
            submission.append_log = log.append;
            submission.log_level = Some(log.level.as_str().to_string());
        }

        let handle = self
            .client
            .submit(worker, &submission)
            .await
            .map_err(|source| DispatchError::Submit {
                worker: worker.name.clone(),
                source,
            })?;
        info!(entry = request.entry, %handle, "Submitted pipeline '{}'", handle.pipeline);

        if !request.config.wait_for_completion {
            debug!(%handle, "Not waiting for remote pipeline to finish");
            return Ok(DispatchReport::default());
        }

        Ok(self.monitor(handle, &request).await)
    }
}
