use super::{DispatchError, DispatchReport, DispatchRequest, DispatchStrategy, StrategyTag, Ticker};
use crate::runtime::{PipelineRuntime, RuntimeOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs the child on this host through a [`PipelineRuntime`]
pub struct LocalStrategy {
    runtime: Arc<dyn PipelineRuntime>,
    ticker: Arc<dyn Ticker>,
    interval: Duration,
}

impl LocalStrategy {
    pub fn new(runtime: Arc<dyn PipelineRuntime>, ticker: Arc<dyn Ticker>, interval: Duration) -> Self {
        Self {
            runtime,
            ticker,
            interval,
        }
    }
}

#[async_trait]
impl DispatchStrategy for LocalStrategy {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn dispatch(&self, request: DispatchRequest<'_>) -> Result<DispatchReport, DispatchError> {
        if *request.target != StrategyTag::Local {
            return Err(DispatchError::Misrouted {
                strategy: self.name(),
                target: request.target.to_string(),
            });
        }

        let definition = request.definition;
        let scope = definition.runtime_scope();
        let handle = self
            .runtime
            .start(definition, request.arguments, &scope, request.prior)
            .await?;
        info!(entry = request.entry, %handle, "Started pipeline '{}' locally", definition.name);

        let mut cancelled = false;
        loop {
            if request.cancel.is_cancelled() {
                info!(%handle, "Cancellation requested, stopping pipeline '{}'", definition.name);
                self.runtime.stop_all(handle).await;
                cancelled = true;
                break;
            }
            if self.runtime.is_finished(handle).await {
                break;
            }
            if self.runtime.error_count(handle).await > 0 {
                debug!(%handle, "Pipeline reported errors, leaving poll loop");
                break;
            }
            self.ticker.tick(self.interval).await;
        }

        if let Err(e) = self.runtime.wait_until_finished(handle).await {
            warn!(%handle, "Waiting for pipeline '{}' failed: {}", definition.name, e);
        }

        let RuntimeOutcome {
            mut outcome,
            rows_set,
        } = self.runtime.collect_outcome(handle).await?;

        if cancelled && outcome.error_count == 0 {
            outcome.add_errors(1);
        }

        let rows_observed = rows_set || !outcome.rows.is_empty();
        debug!(
            %handle,
            errors = outcome.error_count,
            rows = outcome.rows.len(),
            "Pipeline '{}' finished",
            definition.name
        );

        Ok(DispatchReport {
            outcome,
            rows_observed,
            cancelled,
        })
    }
}
