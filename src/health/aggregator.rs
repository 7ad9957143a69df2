//! Probe execution and result aggregation.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use tracing::instrument;

use crate::config::ProbeSettings;

use super::probe::{DependencyUnreachable, Probe};
use super::report::{HealthReport, ProbeResult};

/// Runs probes and reduces their outcomes into a `HealthReport`.
///
/// Holds no state between evaluations. Every probe runs under its own deadline
/// and a panic inside one probe is captured as that probe's failure, so one
/// dependency's outage never hides another's.
#[derive(Debug, Clone)]
pub struct HealthAggregator {
    timeout: Duration,
    concurrent: bool,
}

impl HealthAggregator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            concurrent: true,
        }
    }

    pub fn from_settings(settings: &ProbeSettings) -> Self {
        Self::new(settings.timeout()).with_concurrency(settings.concurrent)
    }

    /// Run probes one after another instead of fanning out.
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Evaluate every probe and build a report.
    ///
    /// Results follow the order of `probes` whether or not they ran concurrently.
    #[instrument(name = "health::evaluate", skip_all, fields(probes = probes.len()))]
    pub async fn evaluate(&self, probes: &[Arc<dyn Probe>]) -> HealthReport {
        let timestamp = Utc::now();

        let results = if self.concurrent {
            join_all(probes.iter().map(|probe| self.run_probe(probe.as_ref()))).await
        } else {
            let mut results = Vec::with_capacity(probes.len());
            for probe in probes {
                results.push(self.run_probe(probe.as_ref()).await);
            }
            results
        };

        let report = HealthReport::from_results(results, timestamp);
        tracing::debug!(
            status = ?report.status(),
            issues = report.issues().len(),
            "Health evaluation complete"
        );
        report
    }

    /// Run a single probe in isolation.
    pub async fn run_probe(&self, probe: &dyn Probe) -> ProbeResult {
        let name = probe.name();
        let start = Instant::now();
        let outcome = self.guard(probe.check()).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                tracing::debug!(probe = %name, latency_ms, "Dependency reachable");
                ProbeResult::healthy(name)
            }
            Err(e) => {
                tracing::warn!(probe = %name, latency_ms, error = %e, "Dependency unreachable");
                ProbeResult::unhealthy(name, e.to_string())
            }
        }
    }

    /// Apply the probe deadline and panic capture to any dependency call.
    pub async fn guard<T, F>(&self, call: F) -> Result<T, DependencyUnreachable>
    where
        F: Future<Output = Result<T, DependencyUnreachable>>,
    {
        match tokio::time::timeout(self.timeout, AssertUnwindSafe(call).catch_unwind()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(payload)) => Err(DependencyUnreachable::panicked(payload.as_ref())),
            Err(_) => Err(DependencyUnreachable::timed_out(self.timeout)),
        }
    }
}
