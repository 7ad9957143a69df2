//! vigil - dependency health service
//!
//! Exposes liveness, readiness and health endpoints that report whether the
//! PostgreSQL datastore and the Redis cache behind a service are reachable.

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod middleware;
pub mod probes;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use health::{HealthAggregator, HealthReport, Probe};
pub use routes::create_router;
pub use state::AppState;
