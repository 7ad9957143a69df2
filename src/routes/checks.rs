//! Single-dependency check endpoints.

use axum::extract::State;
use tracing::instrument;

use crate::config::CACHE_SERVICE;
use crate::health::{ProbeResult, ServiceCheck};
use crate::state::AppState;

/// Database only: connect and disconnect.
#[instrument(name = "checks::db_check", skip(state))]
pub async fn db_check(State(state): State<AppState>) -> ServiceCheck {
    let result = state.aggregator.run_probe(state.database.as_ref()).await;
    ServiceCheck::from_result(result)
}

/// Cache only: write a fixed key and read it back.
#[instrument(name = "checks::cache_check", skip(state))]
pub async fn cache_check(State(state): State<AppState>) -> ServiceCheck {
    match state
        .aggregator
        .guard(state.cache_round_trip.round_trip())
        .await
    {
        Ok(value) => {
            ServiceCheck::from_result(ProbeResult::healthy(CACHE_SERVICE)).with_value(value)
        }
        Err(e) => {
            tracing::warn!(probe = CACHE_SERVICE, error = %e, "Cache round trip failed");
            ServiceCheck::from_result(ProbeResult::unhealthy(CACHE_SERVICE, e.to_string()))
        }
    }
}
