//! Shared application state for request handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::health::{CacheRoundTrip, HealthAggregator, Probe};
use crate::probes::{CacheProbe, DatabaseProbe};

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Holds configuration and probe definitions only. Probes carry connection
/// parameters, never live connections, so nothing mutable is shared between
/// requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub aggregator: HealthAggregator,
    pub database: Arc<dyn Probe>,
    pub cache: Arc<dyn Probe>,
    pub cache_round_trip: Arc<dyn CacheRoundTrip>,
    started_at: Instant,
}

impl AppState {
    /// Creates application state from explicit probes.
    pub fn new<C>(config: AppConfig, database: Arc<dyn Probe>, cache: Arc<C>) -> Self
    where
        C: Probe + CacheRoundTrip + 'static,
    {
        Self {
            aggregator: HealthAggregator::from_settings(&config.probe),
            config: Arc::new(config),
            database,
            cache: cache.clone(),
            cache_round_trip: cache,
            started_at: Instant::now(),
        }
    }

    /// Creates application state with PostgreSQL and Redis probes built from configuration.
    pub fn from_config(config: AppConfig) -> Self {
        let database = Arc::new(DatabaseProbe::new(
            config.database.clone(),
            config.probe.timeout(),
        ));
        let cache = Arc::new(CacheProbe::new(config.cache.clone()));
        Self::new(config, database, cache)
    }

    /// Probes in registration order: database, then cache.
    pub fn probes(&self) -> [Arc<dyn Probe>; 2] {
        [self.database.clone(), self.cache.clone()]
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
