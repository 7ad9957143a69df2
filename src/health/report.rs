//! Report types shared by every report-producing endpoint.
//!
//! `HealthReport` is built only through `HealthReport::from_results`, which keeps
//! `status`, `services` and `issues` consistent with the probe results.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Overall outcome of an evaluation.
///
/// Health reports use `healthy`/`unhealthy`; readiness reports use
/// `ready`/`unready` for the same underlying outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Unhealthy,
    Ready,
    Unready,
}

impl OverallStatus {
    pub fn from_health(healthy: bool) -> Self {
        if healthy {
            OverallStatus::Healthy
        } else {
            OverallStatus::Unhealthy
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, OverallStatus::Healthy | OverallStatus::Ready)
    }

    /// 200 when every dependency answered, 503 otherwise.
    pub fn status_code(self) -> StatusCode {
        if self.is_ok() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }

    fn as_readiness(self) -> Self {
        if self.is_ok() {
            OverallStatus::Ready
        } else {
            OverallStatus::Unready
        }
    }
}

/// Per-service summary state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Healthy,
    Unhealthy,
}

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub name: String,
    pub healthy: bool,
    /// Present only when `healthy` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            healthy: true,
            error: None,
        }
    }

    pub fn unhealthy(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            healthy: false,
            error: Some(detail.into()),
        }
    }

    pub fn state(&self) -> ServiceState {
        if self.healthy {
            ServiceState::Healthy
        } else {
            ServiceState::Unhealthy
        }
    }
}

/// One failed dependency, as listed under `issues`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub service: String,
    pub message: String,
    pub error: String,
}

impl Issue {
    fn from_result(result: &ProbeResult) -> Option<Self> {
        if result.healthy {
            return None;
        }
        Some(Self {
            service: result.name.clone(),
            message: format!("{} is unreachable", result.name),
            error: result
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}

/// Aggregate outcome of one evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    status: OverallStatus,
    timestamp: DateTime<Utc>,
    services: BTreeMap<String, ServiceState>,
    results: Vec<ProbeResult>,
    issues: Vec<Issue>,
}

impl HealthReport {
    /// Reduce probe results, kept in the given order, into a report.
    pub fn from_results(results: Vec<ProbeResult>, timestamp: DateTime<Utc>) -> Self {
        let status = OverallStatus::from_health(results.iter().all(|r| r.healthy));
        // A name registered twice is healthy only if every result under it is
        let mut services = BTreeMap::new();
        for result in &results {
            services
                .entry(result.name.clone())
                .and_modify(|state: &mut ServiceState| {
                    if !result.healthy {
                        *state = ServiceState::Unhealthy;
                    }
                })
                .or_insert_with(|| result.state());
        }
        let issues = results.iter().filter_map(Issue::from_result).collect();

        Self {
            status,
            timestamp,
            services,
            results,
            issues,
        }
    }

    /// Relabel the status as `ready`/`unready`.
    pub fn into_readiness(mut self) -> Self {
        self.status = self.status.as_readiness();
        self
    }

    pub fn status(&self) -> OverallStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn services(&self) -> &BTreeMap<String, ServiceState> {
        &self.services
    }

    pub fn status_code(&self) -> StatusCode {
        self.status.status_code()
    }
}

impl IntoResponse for HealthReport {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// Readiness payload: a health report plus version and uptime.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    #[serde(flatten)]
    pub report: HealthReport,
    pub version: String,
    /// Whole seconds since the process started
    pub uptime: u64,
}

impl ReadinessReport {
    pub fn new(report: HealthReport, version: impl Into<String>, uptime: u64) -> Self {
        Self {
            report: report.into_readiness(),
            version: version.into(),
            uptime,
        }
    }
}

impl IntoResponse for ReadinessReport {
    fn into_response(self) -> Response {
        (self.report.status_code(), Json(self)).into_response()
    }
}

/// Single-dependency payload for `/db-check` and `/cache-check`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceCheck {
    pub status: OverallStatus,
    pub service: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ServiceCheck {
    pub fn from_result(result: ProbeResult) -> Self {
        Self {
            status: OverallStatus::from_health(result.healthy),
            service: result.name,
            healthy: result.healthy,
            error: result.error,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl IntoResponse for ServiceCheck {
    fn into_response(self) -> Response {
        (self.status.status_code(), Json(self)).into_response()
    }
}
