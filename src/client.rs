//! Wiring for a complete client
//!
//! Collects storage, display, resolver and notifier into a [`SettlementEngine`],
//! so binaries and tests don't repeat the setup.

use crate::config::HoopshotConfig;
use crate::errors::HoopshotResult;
use crate::games::{BalanceStore, GameDisplay, OutcomeResolver, OutcomeSource, SettlementEngine};
use crate::host::HostCapabilities;
use crate::notifier::notifier_for;
use crate::storage::{open_backend, KvBackend};
use std::sync::Arc;

pub struct GameClient {
    config: HoopshotConfig,
    engine: SettlementEngine,
    display: Arc<GameDisplay>,
}

impl GameClient {
    pub fn builder(config: HoopshotConfig) -> GameClientBuilder {
        GameClientBuilder::new(config)
    }

    pub fn config(&self) -> &HoopshotConfig {
        &self.config
    }

    pub fn engine(&self) -> &SettlementEngine {
        &self.engine
    }

    pub fn display(&self) -> Arc<GameDisplay> {
        self.display.clone()
    }
}

pub struct GameClientBuilder {
    config: HoopshotConfig,
    host: HostCapabilities,
    backend: Option<Arc<dyn KvBackend>>,
    outcome_source: Option<Arc<dyn OutcomeSource>>,
}

impl GameClientBuilder {
    pub fn new(config: HoopshotConfig) -> Self {
        Self {
            config,
            host: HostCapabilities::none(),
            backend: None,
            outcome_source: None,
        }
    }

    pub fn host(mut self, host: HostCapabilities) -> Self {
        self.host = host;
        self
    }

    /// Use this backend instead of the one named in `storage.backend`
    pub fn backend(mut self, backend: Arc<dyn KvBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Replace the fair coin used when the host cannot report an outcome
    pub fn outcome_source(mut self, source: Arc<dyn OutcomeSource>) -> Self {
        self.outcome_source = Some(source);
        self
    }

    pub fn build(self) -> HoopshotResult<GameClient> {
        self.config.validate()?;

        let backend = match self.backend {
            Some(backend) => backend,
            None => open_backend(&self.config.storage)?,
        };
        let store = Arc::new(BalanceStore::from_config(backend, &self.config.storage));
        let display = Arc::new(GameDisplay::new());

        let resolver = match self.outcome_source {
            Some(source) => {
                OutcomeResolver::probe_with_source(&self.host, &self.config, display.clone(), source)
            }
            None => OutcomeResolver::probe(&self.host, &self.config, display.clone()),
        };
        let notifier = notifier_for(&self.host, &self.config.notifier);

        let engine = SettlementEngine::new(&self.config, store, resolver, notifier, display.clone());

        Ok(GameClient {
            config: self.config,
            engine,
            display,
        })
    }
}
