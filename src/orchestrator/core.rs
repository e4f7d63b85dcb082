use super::aggregate::merge;
use super::builder::OrchestratorBuilder;
use super::events::EventLog;
use super::iteration::plan_iterations;
use super::log_artifact::LogArtifact;
use super::ParentContext;
use crate::binder::ScopeBinder;
use crate::config::{CompatibilitySettings, LogLevel, OrchestratorConfig};
use crate::dispatch::{resolve_strategy, DispatchRequest, DispatchStrategy, StrategyTag};
use crate::hook::{HookDecision, RunConfigurationHook};
use crate::model::RunOutcome;
use crate::remote::WorkerClient;
use crate::resolver::{DefinitionResolver, DefinitionStore};
use crate::runtime::PipelineRuntime;
use chrono::Local;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;

/// Parent parameters with this prefix whose value names an entry suppress
/// row payloads for that entry
pub const SUPPRESS_RESULT_DATA_PREFIX: &str = "SUPPRESS_RESULT_DATA_";

/// Whether row payloads should be left out of remote outcomes for `config`
pub fn suppresses_result_rows(
    config: &OrchestratorConfig,
    parent_parameters: &BTreeMap<String, String>,
) -> bool {
    config.suppress_remote_row_data
        || parent_parameters
            .iter()
            .any(|(name, value)| name.starts_with(SUPPRESS_RESULT_DATA_PREFIX) && *value == config.name)
}

pub struct Orchestrator {
    resolver: DefinitionResolver,
    hook: Arc<dyn RunConfigurationHook>,
    local: Arc<dyn DispatchStrategy>,
    remote: Arc<dyn DispatchStrategy>,
    clustered: Arc<dyn DispatchStrategy>,
    compatibility: CompatibilitySettings,
}

impl Orchestrator {
    pub fn builder(
        store: Arc<dyn DefinitionStore>,
        runtime: Arc<dyn PipelineRuntime>,
        client: Arc<dyn WorkerClient>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder::new(store, runtime, client)
    }

    pub(super) fn from_parts(
        resolver: DefinitionResolver,
        hook: Arc<dyn RunConfigurationHook>,
        local: Arc<dyn DispatchStrategy>,
        remote: Arc<dyn DispatchStrategy>,
        clustered: Arc<dyn DispatchStrategy>,
        compatibility: CompatibilitySettings,
    ) -> Self {
        Self {
            resolver,
            hook,
            local,
            remote,
            clustered,
            compatibility,
        }
    }

    fn strategy_for(&self, target: &StrategyTag) -> &dyn DispatchStrategy {
        match target {
            StrategyTag::Local => self.local.as_ref(),
            StrategyTag::RemoteSingle(_) => self.remote.as_ref(),
            StrategyTag::Clustered => self.clustered.as_ref(),
        }
    }

    /// Run one configured entry.
    ///
    /// `prior` is the outcome of the previous entry in the parent workflow; its
    /// rows, files and error count seed the running outcome. Per-row mode does
    /// not start while that count is non-zero.
    /// Every failure is folded into the returned outcome.
    pub async fn run(
        &self,
        config: &OrchestratorConfig,
        prior: RunOutcome,
        entry_nr: u32,
        parent: &ParentContext,
    ) -> RunOutcome {
        let mut running = prior;
        running.begin_entry(entry_nr);

        let artifact = match &config.log {
            Some(log) => match LogArtifact::open(log, &parent.scope, Local::now()) {
                Ok(artifact) => Some(artifact),
                Err(e) => {
                    error!(entry = %config.name, "Unable to open log file: {}", e);
                    running.add_errors(1);
                    return running;
                }
            },
            None => None,
        };

        let mut events = EventLog::new(&config.name, artifact);
        self.execute(config, &mut running, parent, &mut events).await;
        events.finish(&mut running, &parent.name);
        running
    }

    async fn execute(
        &self,
        config: &OrchestratorConfig,
        running: &mut RunOutcome,
        parent: &ParentContext,
        events: &mut EventLog,
    ) {
        events.info(&format!("Starting entry '{}' for {}", config.name, config.reference));

        let definition = match self
            .resolver
            .resolve(&config.reference, &parent.scope, config.inherit_all_parent_variables)
            .await
        {
            Ok(definition) => definition,
            Err(e) => {
                events.error(&format!("Unable to load the pipeline: {}", e));
                running.add_errors(1);
                return;
            }
        };

        let hook_target = match self.hook.resolve(
            config.run_configuration.as_deref(),
            &definition,
            &parent.scope,
        ) {
            Ok(Some(HookDecision::Veto)) => {
                events.info(&format!(
                    "Run configuration disabled pipeline '{}', nothing to run",
                    definition.name
                ));
                return;
            }
            Ok(Some(HookDecision::Target(target))) => Some(target),
            Ok(None) => None,
            Err(e) => {
                events.error(&e.to_string());
                running.add_errors(1);
                return;
            }
        };

        let target = resolve_strategy(config, hook_target.as_ref());
        let strategy = self.strategy_for(&target);
        let suppress_rows = suppresses_result_rows(config, &parent.parameters);
        let forwarding = events.forwarding();

        let plan = plan_iterations(config, &running.rows, &self.compatibility);
        if plan.is_empty() {
            if self.compatibility.warn_on_empty_input {
                events.warn(&format!(
                    "No input rows, pipeline '{}' is not run",
                    definition.name
                ));
            }
            return;
        }
        let per_row = plan.is_per_row();
        events.debug(&format!(
            "Running pipeline '{}' {} time(s) on {}",
            definition.name,
            plan.len(),
            target
        ));

        let mut binder = ScopeBinder::new(config, &parent.scope, &parent.arguments);
        let mut definition = definition;

        for (iteration, row) in plan.into_bound_rows().into_iter().enumerate() {
            if parent.cancel.is_cancelled() {
                events.warn("Cancelled before the next iteration");
                running.add_errors(1);
                break;
            }
            if (per_row || iteration > 0) && running.error_count > 0 {
                break;
            }

            if config.clear_rows_before_run {
                running.rows.clear();
            }
            if config.clear_files_before_run {
                running.files.clear();
            }

            let child = binder.bind(&definition, row.as_ref());
            for err in &child.binding_errors {
                events.mirror(LogLevel::Warn, &err.to_string());
            }
            child.apply_to(&mut definition);

            // per-row children see only their own row, or none when the row
            // became the argument list
            let mut child_prior = running.clone();
            if per_row {
                child_prior.rows = if config.arguments_from_previous_row {
                    Vec::new()
                } else {
                    child.row.iter().cloned().collect()
                };
            }

            events.info(&format!(
                "Running pipeline '{}' on {} (iteration {})",
                definition.name,
                target,
                iteration + 1
            ));
            let request = DispatchRequest {
                entry: &config.name,
                target: &target,
                definition: &definition,
                arguments: &child.arguments,
                prior: &child_prior,
                config,
                parent_scope: &parent.scope,
                workers: &parent.workers,
                suppress_rows,
                log: forwarding.as_ref(),
                cancel: parent.cancel.as_ref(),
            };

            match strategy.dispatch(request).await {
                Ok(report) => {
                    let cancelled = report.cancelled;
                    merge(running, report);
                    if cancelled {
                        events.warn(&format!("Pipeline '{}' was cancelled", definition.name));
                        break;
                    }
                }
                Err(e) => {
                    events.error(&format!(
                        "Unable to run pipeline '{}': {}",
                        definition.name, e
                    ));
                    running.add_errors(1);
                }
            }
        }

        events.info(&format!(
            "Entry finished with {} error(s)",
            running.error_count
        ));
    }
}
