//! HTTP server module.
//!
//! Serves the router on plain HTTP (TLS is expected to terminate at the
//! ingress or load balancer) and drains open connections on SIGTERM/SIGINT.

mod server;
mod shutdown;

pub use server::{start_server, ServerError};
