//! Probe trait and the single dependency failure type.

use std::any::Any;
use std::time::Duration;

use async_trait::async_trait;

/// Placeholder substituted for secrets found in failure details
const REDACTED: &str = "<redacted>";

/// A dependency could not be reached or did not answer correctly.
///
/// Covers connection refusal, timeouts, authentication and protocol errors, and
/// probes that panicked. The detail is human-readable and safe to return to
/// callers once secrets have been redacted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail}")]
pub struct DependencyUnreachable {
    detail: String,
}

impl DependencyUnreachable {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// The probe did not finish before its deadline.
    pub fn timed_out(after: Duration) -> Self {
        Self::new(format!("timed out after {}ms", after.as_millis()))
    }

    /// The probe panicked instead of returning.
    pub fn panicked(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::new(format!("probe panicked: {}", message))
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Replace every occurrence of `secret` in the detail.
    pub fn redact(mut self, secret: &str) -> Self {
        if !secret.is_empty() && self.detail.contains(secret) {
            self.detail = self.detail.replace(secret, REDACTED);
        }
        self
    }
}

/// A named reachability check against one dependency.
///
/// Implementations open their own short-lived connection on every call and
/// release it before returning, whatever the outcome.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Identifier used in reports, e.g. "database" or "cache".
    fn name(&self) -> &str;

    async fn check(&self) -> Result<(), DependencyUnreachable>;
}

/// Write-then-read check against a key-value cache.
#[async_trait]
pub trait CacheRoundTrip: Send + Sync {
    /// Write a fixed test key, read it back and return the value read.
    async fn round_trip(&self) -> Result<String, DependencyUnreachable>;
}
