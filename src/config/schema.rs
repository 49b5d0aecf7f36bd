//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files; the
//! environment fills in and overrides values afterwards (see `loader.rs`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Application identity and listen address.
    pub app: AppSection,

    /// Database connection settings.
    pub database: DatabaseConfig,

    /// HTTP server settings.
    pub http: HttpConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Startup and shutdown behaviour.
    pub lifecycle: LifecycleConfig,
}

/// Application identity and listen address.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppSection {
    /// Application name (`APP_NAME`). Required.
    pub name: String,

    /// Bind host (`APP_HOST`).
    pub host: String,

    /// Listen port (`APP_PORT`). Required; 0 means unset.
    pub port: u16,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: String::new(),
            host: "0.0.0.0".to_string(),
            port: 0,
        }
    }
}

impl AppSection {
    /// `host:port` string the HTTP listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `DB_HOST`. Required.
    pub host: String,

    /// `DB_PORT`. Required; 0 means unset.
    pub port: u16,

    /// `DB_USERNAME`. Required.
    pub username: String,

    /// `DB_PASSWORD`. May be empty.
    pub password: String,

    /// `DB_DATABASE`. Required.
    pub database: String,

    /// Connection charset.
    pub charset: String,

    /// Maximum pooled connections.
    pub max_connections: u32,

    /// Timeout for acquiring a connection, in seconds.
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 0,
            username: String::new(),
            password: String::new(),
            database: String::new(),
            charset: "utf8mb4".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Total time allowed to read a request and write its response, in seconds.
    pub request_timeout_secs: u64,

    /// Value of the `server` response header.
    pub server_header: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 3,
            server_header: "Axum".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per client IP in each window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 200,
            window_secs: 60,
        }
    }
}

/// Cross-origin resource sharing policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` allows any.
    pub allow_origins: Vec<String>,

    /// Allowed request methods.
    pub allow_methods: Vec<String>,

    /// Allowed request headers.
    pub allow_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allow_headers: ["Content-Type", "Authorization", "X-Requested-With"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// What a termination signal does while a shutdown is already running.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecondSignalPolicy {
    /// Keep shutting down until the deadline.
    #[default]
    Ignore,
    /// Abandon the shutdown and exit immediately.
    Force,
}

/// Startup and shutdown behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Budget shared by all subsystems when stopping, in milliseconds.
    pub shutdown_deadline_ms: u64,

    /// Budget for stopping already-started subsystems after a start failure.
    pub rollback_deadline_ms: u64,

    /// Exit code for a degraded shutdown. 0 keeps slow shutdowns from looking
    /// like crashes to process supervisors.
    pub degraded_exit_code: u8,

    /// Reaction to a second termination signal.
    pub second_signal: SecondSignalPolicy,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_deadline_ms: 3000,
            rollback_deadline_ms: 500,
            degraded_exit_code: 0,
            second_signal: SecondSignalPolicy::Ignore,
        }
    }
}

impl LifecycleConfig {
    pub fn shutdown_deadline(&self) -> Duration {
        Duration::from_millis(self.shutdown_deadline_ms)
    }

    pub fn rollback_deadline(&self) -> Duration {
        Duration::from_millis(self.rollback_deadline_ms)
    }
}
