//! Concrete dependency probes.
//!
//! Each probe holds only connection parameters and opens a fresh connection per
//! call, so no client object is shared between requests.

mod cache;
mod database;

pub use cache::CacheProbe;
pub use database::DatabaseProbe;
