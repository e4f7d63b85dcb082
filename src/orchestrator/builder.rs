//! Orchestrator construction
//!
//! The three collaborators every run needs are required up front; splitter,
//! hook, ticker, settings and individual strategies have defaults that tests
//! and embedders can replace.

use super::core::Orchestrator;
use crate::cluster::{ClusterSplitter, StaticPartitioner};
use crate::config::PipeflowSettings;
use crate::dispatch::{
    ClusteredStrategy, DispatchStrategy, LocalStrategy, RemoteStrategy, Ticker, TokioTicker,
};
use crate::hook::{NamedRunConfigurations, RunConfigurationHook};
use crate::remote::WorkerClient;
use crate::resolver::{DefinitionResolver, DefinitionStore};
use crate::runtime::PipelineRuntime;
use std::sync::Arc;

pub struct OrchestratorBuilder {
    store: Arc<dyn DefinitionStore>,
    runtime: Arc<dyn PipelineRuntime>,
    client: Arc<dyn WorkerClient>,
    splitter: Arc<dyn ClusterSplitter>,
    hook: Option<Arc<dyn RunConfigurationHook>>,
    ticker: Arc<dyn Ticker>,
    settings: PipeflowSettings,
    local: Option<Arc<dyn DispatchStrategy>>,
    remote: Option<Arc<dyn DispatchStrategy>>,
    clustered: Option<Arc<dyn DispatchStrategy>>,
}

impl OrchestratorBuilder {
    pub fn new(
        store: Arc<dyn DefinitionStore>,
        runtime: Arc<dyn PipelineRuntime>,
        client: Arc<dyn WorkerClient>,
    ) -> Self {
        Self {
            store,
            runtime,
            client,
            splitter: Arc::new(StaticPartitioner),
            hook: None,
            ticker: Arc::new(TokioTicker),
            settings: PipeflowSettings::default(),
            local: None,
            remote: None,
            clustered: None,
        }
    }

    pub fn with_splitter(mut self, splitter: Arc<dyn ClusterSplitter>) -> Self {
        self.splitter = splitter;
        self
    }

    /// Replace the settings-backed run configuration hook
    pub fn with_hook(mut self, hook: Arc<dyn RunConfigurationHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn with_ticker(mut self, ticker: Arc<dyn Ticker>) -> Self {
        self.ticker = ticker;
        self
    }

    pub fn with_settings(mut self, settings: PipeflowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_local_strategy(mut self, strategy: Arc<dyn DispatchStrategy>) -> Self {
        self.local = Some(strategy);
        self
    }

    pub fn with_remote_strategy(mut self, strategy: Arc<dyn DispatchStrategy>) -> Self {
        self.remote = Some(strategy);
        self
    }

    pub fn with_clustered_strategy(mut self, strategy: Arc<dyn DispatchStrategy>) -> Self {
        self.clustered = Some(strategy);
        self
    }

    pub fn build(self) -> Orchestrator {
        let polling = &self.settings.polling;
        let local = self.local.unwrap_or_else(|| {
            Arc::new(LocalStrategy::new(
                self.runtime.clone(),
                self.ticker.clone(),
                polling.local,
            ))
        });
        let remote = self.remote.unwrap_or_else(|| {
            Arc::new(RemoteStrategy::new(
                self.client.clone(),
                self.ticker.clone(),
                polling.remote,
            ))
        });
        let clustered = self.clustered.unwrap_or_else(|| {
            Arc::new(ClusteredStrategy::new(
                self.client.clone(),
                self.splitter.clone(),
                self.ticker.clone(),
                polling.cluster,
            ))
        });
        let hook = self.hook.unwrap_or_else(|| {
            Arc::new(NamedRunConfigurations::new(
                self.settings.run_configurations.clone(),
            ))
        });

        Orchestrator::from_parts(
            DefinitionResolver::new(self.store),
            hook,
            local,
            remote,
            clustered,
            self.settings.compatibility,
        )
    }
}
