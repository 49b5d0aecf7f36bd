//! Database connection.
//!
//! # Responsibilities
//! - Open the MySQL pool at boot from `DatabaseConfig`
//! - Hand the pool to whichever subsystem needs it (no global handle)
//! - Close the pool on shutdown as a subsystem of its own
//!
//! # Design Decisions
//! - Connection failure at boot is fatal; the orchestrator never runs
//! - `Database` clones share one pool

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

use crate::config::DatabaseConfig;
use crate::lifecycle::{StartError, StopError, Subsystem};

/// Error raised when the pool cannot be opened.
#[derive(Debug, thiserror::Error)]
#[error("database connection failed: {0}")]
pub struct DatabaseError(#[from] sqlx::Error);

/// Handle to the connection pool, created once at boot.
#[derive(Debug, Clone)]
pub struct Database {
    pool: MySqlPool,
}

impl Database {
    /// Connect eagerly, failing if the server is unreachable.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Connecting to database"
        );

        let pool = pool_options(config).connect_with(connect_options(config)).await?;

        tracing::info!(max_connections = config.max_connections, "Database pool ready");
        Ok(Self { pool })
    }

    /// Build the pool without opening a connection until first use.
    pub fn connect_lazy(config: &DatabaseConfig) -> Self {
        Self {
            pool: pool_options(config).connect_lazy_with(connect_options(config)),
        }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Close the pool, waiting for checked-out connections to come back.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Subsystem that closes this pool on shutdown.
    pub fn subsystem(&self) -> DatabaseSubsystem {
        DatabaseSubsystem { db: self.clone() }
    }
}

/// Connection options derived from configuration.
pub fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
        .database(&config.database)
        .charset(&config.charset)
}

fn pool_options(config: &DatabaseConfig) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
}

/// Owns the pool's lifetime within the orchestrator.
pub struct DatabaseSubsystem {
    db: Database,
}

impl Subsystem for DatabaseSubsystem {
    fn name(&self) -> &str {
        "database"
    }

    fn start(&mut self) -> BoxFuture<'_, Result<(), StartError>> {
        async move {
            if self.db.is_closed() {
                return Err(StartError::Other("database pool is closed".to_string()));
            }
            Ok(())
        }
        .boxed()
    }

    fn stop(self: Box<Self>) -> BoxFuture<'static, Result<(), StopError>> {
        async move {
            if self.db.is_closed() {
                return Err(StopError::Other("database pool already closed".to_string()));
            }
            self.db.close().await;
            tracing::debug!("Database pool closed");
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ShutdownOutcome, SubsystemHandle};

    fn config() -> DatabaseConfig {
        DatabaseConfig {
            host: "127.0.0.1".into(),
            port: 3306,
            username: "app".into(),
            password: "secret".into(),
            database: "main".into(),
            ..DatabaseConfig::default()
        }
    }

    #[test]
    fn test_connect_options_follow_config() {
        let options = connect_options(&config());
        assert_eq!(options.get_host(), "127.0.0.1");
        assert_eq!(options.get_port(), 3306);
        assert_eq!(options.get_username(), "app");
        assert_eq!(options.get_database(), Some("main"));
        assert_eq!(options.get_charset(), "utf8mb4");
    }

    #[tokio::test]
    async fn test_subsystem_closes_pool_once() {
        let db = Database::connect_lazy(&config());
        let mut handle = SubsystemHandle::new(db.subsystem());

        handle.start().await.unwrap();
        assert_eq!(handle.stop(Duration::from_secs(1)).await, ShutdownOutcome::Completed);
        assert!(db.is_closed());

        // The cached outcome is returned; the pool is not closed twice.
        assert_eq!(handle.stop(Duration::from_secs(1)).await, ShutdownOutcome::Completed);
    }

    #[tokio::test]
    async fn test_closing_closed_pool_is_errored() {
        let db = Database::connect_lazy(&config());
        let mut handle = SubsystemHandle::new(db.subsystem());
        handle.start().await.unwrap();

        db.close().await;
        assert!(matches!(
            handle.stop(Duration::from_secs(1)).await,
            ShutdownOutcome::Errored(_)
        ));
    }
}
