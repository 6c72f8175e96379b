use std::sync::Arc;

use chrono::{DateTime, Utc};
use deal_core::{Config, IdScheme};
use deal_registry::{ids, Clock, ManualClock, Registry, Service, SystemClock};
use eyre::{eyre, Result};

mod api;
pub use api::{Api, ApiError, ApiResponse, UserSession};

pub struct TestCtxBuilder {
    /// Identifier scheme of the registry under test
    pub id_scheme: IdScheme,
    /// Count of request handler threads
    pub handler_threads: u16,
    /// Start of a manually advanced clock; the wall clock is used if unset
    pub frozen_at: Option<DateTime<Utc>>,
}

impl TestCtxBuilder {
    /// Create a new test context builder initialized with environment defaults
    ///
    /// `DEAL_TEST_THREADS` overrides the number of handler threads.
    pub fn from_env() -> Result<Self> {
        let handler_threads = match std::env::var("DEAL_TEST_THREADS") {
            Ok(v) => v
                .parse()
                .map_err(|e| eyre!("DEAL_TEST_THREADS must be a decimal u16: {e}"))?,
            Err(_) => 4,
        };

        Ok(TestCtxBuilder {
            id_scheme: IdScheme::Uuid,
            handler_threads,
            frozen_at: None,
        })
    }

    /// Set the identifier scheme
    pub fn with_id_scheme(mut self, scheme: IdScheme) -> Self {
        self.id_scheme = scheme;
        self
    }

    /// Set the number of handler threads to use
    pub fn with_handler_threads(mut self, threads: u16) -> Self {
        assert_ne!(threads, 0);
        self.handler_threads = threads;
        self
    }

    /// Freeze time at `start`; it only moves through [`TestCtx::clock`]
    pub fn with_manual_clock(mut self, start: DateTime<Utc>) -> Self {
        self.frozen_at = Some(start);
        self
    }

    /// Get the [`deal_core::Config`] for launching the registry
    fn config(&self) -> Config {
        Config {
            id_scheme: self.id_scheme,
        }
    }

    /// Build the test context
    pub async fn build(self) -> Result<TestCtx> {
        let manual = self.frozen_at.map(|start| Arc::new(ManualClock::new(start)));
        let clock: Arc<dyn Clock> = match &manual {
            Some(clock) => clock.clone(),
            None => Arc::new(SystemClock),
        };

        let registry = Registry::with_parts(ids::from_scheme(self.config().id_scheme), clock);
        let service = Service::with_registry(registry);
        let (service, api) = api::mock::start(self.handler_threads, service);

        Ok(TestCtx {
            api,
            service,
            clock: manual,
            handler_threads: self.handler_threads,
            drop_bomb: DropBomb,
        })
    }
}

/// Test context
pub struct TestCtx {
    /// API allowing to interact with the deal service
    pub api: Api,
    service: api::mock::MockService,
    clock: Option<Arc<ManualClock>>,
    /// Number of handler threads
    pub handler_threads: u16,

    drop_bomb: DropBomb,
}

impl TestCtx {
    /// The manual clock, if the context was built with one
    pub fn clock(&self) -> Result<&ManualClock> {
        self.clock
            .as_deref()
            .ok_or_else(|| eyre!("test context was built without a manual clock"))
    }

    /// Shut the deal service down and finish the test
    pub async fn finish(self) {
        std::mem::forget(self.drop_bomb);
        drop(self.api);
        self.service.shutdown().await;
    }
}

struct DropBomb;

impl Drop for DropBomb {
    fn drop(&mut self) {
        eprintln!(
            "@TestAuthor: You should call `ctx.finish().await` to shut the deal service down"
        );
    }
}
