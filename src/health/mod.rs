//! Dependency health aggregation.
//!
//! A `Probe` checks one downstream dependency. The `HealthAggregator` runs a set
//! of probes in isolation (per-probe deadline, panic capture), collects one
//! `ProbeResult` per probe in registration order, and reduces them into a
//! `HealthReport`. Dependency failures are turned into report data here and are
//! never propagated as errors to the HTTP layer.

mod aggregator;
mod probe;
mod report;

pub use aggregator::HealthAggregator;
pub use probe::{CacheRoundTrip, DependencyUnreachable, Probe};
pub use report::{
    HealthReport, Issue, OverallStatus, ProbeResult, ReadinessReport, ServiceCheck, ServiceState,
};
