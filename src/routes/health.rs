//! Liveness, health and readiness endpoints.
//!
//! Liveness only shows that the process can answer HTTP. Health and readiness
//! probe every dependency on each call and answer 503 when any is unreachable.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::instrument;

use crate::config::LIVENESS_MESSAGE;
use crate::health::{HealthReport, ReadinessReport};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Liveness {
    pub message: &'static str,
}

/// Liveness banner. Never touches a dependency.
pub async fn liveness() -> Json<Liveness> {
    Json(Liveness {
        message: LIVENESS_MESSAGE,
    })
}

/// Dependency health report.
#[instrument(name = "health::health", skip(state))]
pub async fn health(State(state): State<AppState>) -> HealthReport {
    state.aggregator.evaluate(&state.probes()).await
}

/// Readiness report with version and uptime.
#[instrument(name = "health::ready", skip(state))]
pub async fn ready(State(state): State<AppState>) -> ReadinessReport {
    let report = state.aggregator.evaluate(&state.probes()).await;
    ReadinessReport::new(
        report,
        state.config.readiness.version(),
        state.uptime().as_secs(),
    )
}
