//! Redis reachability probe and set/get round trip.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::config::{
    CacheConfig, CACHE_CHECK_KEY, CACHE_CHECK_TTL_SECS, CACHE_CHECK_VALUE, CACHE_SERVICE,
};
use crate::health::{CacheRoundTrip, DependencyUnreachable, Probe};

const PONG: &str = "PONG";

pub struct CacheProbe {
    config: CacheConfig,
}

impl CacheProbe {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    /// Open a connection owned by the caller; dropping it closes the socket.
    async fn connect(&self) -> Result<MultiplexedConnection, DependencyUnreachable> {
        let client = redis::Client::open((self.config.host.as_str(), self.config.port))
            .map_err(unreachable)?;
        client
            .get_multiplexed_async_connection()
            .await
            .map_err(unreachable)
    }
}

fn unreachable(err: redis::RedisError) -> DependencyUnreachable {
    DependencyUnreachable::new(err.to_string())
}

#[async_trait]
impl Probe for CacheProbe {
    fn name(&self) -> &str {
        CACHE_SERVICE
    }

    async fn check(&self) -> Result<(), DependencyUnreachable> {
        let mut conn = self.connect().await?;
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unreachable)?;

        if reply == PONG {
            Ok(())
        } else {
            Err(DependencyUnreachable::new(format!(
                "unexpected PING reply: {:?}",
                reply
            )))
        }
    }
}

#[async_trait]
impl CacheRoundTrip for CacheProbe {
    async fn round_trip(&self) -> Result<String, DependencyUnreachable> {
        let mut conn = self.connect().await?;

        let _: () = conn
            .set_ex(CACHE_CHECK_KEY, CACHE_CHECK_VALUE, CACHE_CHECK_TTL_SECS)
            .await
            .map_err(unreachable)?;
        let value: Option<String> = conn.get(CACHE_CHECK_KEY).await.map_err(unreachable)?;

        verify_read_back(value)
    }
}

/// The value read back must be exactly the one just written.
fn verify_read_back(value: Option<String>) -> Result<String, DependencyUnreachable> {
    match value {
        Some(value) if value == CACHE_CHECK_VALUE => Ok(value),
        Some(other) => Err(DependencyUnreachable::new(format!(
            "read back {:?} for {}, expected {:?}",
            other, CACHE_CHECK_KEY, CACHE_CHECK_VALUE
        ))),
        None => Err(DependencyUnreachable::new(format!(
            "{} missing immediately after write",
            CACHE_CHECK_KEY
        ))),
    }
}
