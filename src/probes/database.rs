//! PostgreSQL reachability probe.

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use tokio_postgres::NoTls;

use crate::config::{DatabaseConfig, DATABASE_SERVICE};
use crate::health::{DependencyUnreachable, Probe};

/// Reported to the server so probe sessions are identifiable in `pg_stat_activity`
const APPLICATION_NAME: &str = "vigil-probe";

/// Opens a session and closes it again.
pub struct DatabaseProbe {
    config: DatabaseConfig,
    connect_timeout: Duration,
}

impl DatabaseProbe {
    pub fn new(config: DatabaseConfig, connect_timeout: Duration) -> Self {
        Self {
            config,
            connect_timeout,
        }
    }

    /// Build connection parameters field by field; no connection string is assembled.
    fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.config.host)
            .port(self.config.port)
            .user(&self.config.user)
            .dbname(&self.config.dbname)
            .application_name(APPLICATION_NAME)
            .connect_timeout(self.connect_timeout);
        if let Some(password) = &self.config.password {
            pg.password(password);
        }
        pg
    }

    fn unreachable(&self, err: &(dyn StdError + 'static)) -> DependencyUnreachable {
        let err = DependencyUnreachable::new(describe(err));
        match &self.config.password {
            Some(password) => err.redact(password),
            None => err,
        }
    }
}

#[async_trait]
impl Probe for DatabaseProbe {
    fn name(&self) -> &str {
        DATABASE_SERVICE
    }

    async fn check(&self) -> Result<(), DependencyUnreachable> {
        let (client, connection) = self
            .pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| self.unreachable(&e))?;

        // The connection half performs the I/O; dropping the client makes it
        // send Terminate and resolve, so awaiting it means the session is closed.
        let driver = tokio::spawn(connection);
        drop(client);

        driver
            .await
            .map_err(|e| self.unreachable(&e))?
            .map_err(|e| self.unreachable(&e))
    }
}

/// Flatten an error and its sources into one line.
///
/// Server-side failures display only as "db error"; the reason the server gave
/// (bad password, unknown database) lives in the source `DbError`.
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !detail.contains(&text) {
            detail.push_str(": ");
            detail.push_str(&text);
        }
        source = cause.source();
    }
    detail
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(password: Option<&str>) -> DatabaseConfig {
        DatabaseConfig {
            host: "127.0.0.1".to_string(),
            // Reserved port, nothing listens here
            port: 1,
            user: "postgres".to_string(),
            password: password.map(str::to_string),
            dbname: "postgres".to_string(),
        }
    }

    #[test]
    fn test_pg_config_fields() {
        let probe = DatabaseProbe::new(config(Some("pw")), Duration::from_secs(3));
        let pg = probe.pg_config();
        assert_eq!(pg.get_user(), Some("postgres"));
        assert_eq!(pg.get_dbname(), Some("postgres"));
        assert_eq!(pg.get_ports(), &[1u16]);
        assert_eq!(pg.get_password(), Some(&b"pw"[..]));
        assert_eq!(pg.get_connect_timeout(), Some(&Duration::from_secs(3)));
    }

    #[test]
    fn test_pg_config_without_password() {
        let probe = DatabaseProbe::new(config(None), Duration::from_secs(1));
        assert_eq!(probe.pg_config().get_password(), None);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("db error")]
    struct ServerError(#[source] ServerMessage);

    #[derive(Debug, thiserror::Error)]
    #[error("FATAL: {0}")]
    struct ServerMessage(&'static str);

    #[test]
    fn test_describe_includes_source_reason() {
        let err = ServerError(ServerMessage(
            "password authentication failed for user \"postgres\"",
        ));
        assert_eq!(
            describe(&err),
            "db error: FATAL: password authentication failed for user \"postgres\""
        );
    }

    #[test]
    fn test_describe_skips_repeated_source() {
        #[derive(Debug, thiserror::Error)]
        #[error("db error: {0}")]
        struct Verbose(#[source] ServerMessage);

        let err = Verbose(ServerMessage("database \"missing\" does not exist"));
        assert_eq!(
            describe(&err),
            "db error: FATAL: database \"missing\" does not exist"
        );
    }

    #[test]
    fn test_unreachable_keeps_reason_and_redacts_password() {
        let probe = DatabaseProbe::new(config(Some("hunter2")), Duration::from_secs(1));
        let err = probe.unreachable(&ServerError(ServerMessage(
            "password authentication failed, got hunter2",
        )));
        assert!(err.detail().contains("password authentication failed"));
        assert!(!err.detail().contains("hunter2"));
    }

    #[test]
    fn test_name() {
        let probe = DatabaseProbe::new(config(None), Duration::from_secs(1));
        assert_eq!(probe.name(), "database");
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        let probe = DatabaseProbe::new(config(Some("hunter2")), Duration::from_secs(2));
        let err = probe.check().await.unwrap_err();
        assert!(!err.detail().is_empty());
        assert!(!err.detail().contains("hunter2"));
    }
}
