//! Configuration validation.
//!
//! # Responsibilities
//! - Check that every required setting is present
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required setting is absent.
    Missing { field: &'static str, env: &'static str },
    /// A setting is present but unusable.
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Missing { field, env } => {
                write!(f, "{} is required (set {})", field, env)
            }
            ValidationError::Invalid { field, reason } => write!(f, "{} is invalid: {}", field, reason),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a fully merged configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut require = |present: bool, field: &'static str, env: &'static str| {
        if !present {
            errors.push(ValidationError::Missing { field, env });
        }
    };

    require(!config.app.name.trim().is_empty(), "app.name", "APP_NAME");
    require(config.app.port != 0, "app.port", "APP_PORT");
    require(!config.database.host.trim().is_empty(), "database.host", "DB_HOST");
    require(config.database.port != 0, "database.port", "DB_PORT");
    require(!config.database.username.trim().is_empty(), "database.username", "DB_USERNAME");
    require(!config.database.database.trim().is_empty(), "database.database", "DB_DATABASE");

    if config.app.port != 0 && config.app.bind_address().parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Invalid {
            field: "app.host",
            reason: format!("{} is not a valid bind address", config.app.bind_address()),
        });
    }

    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::Invalid {
            field: "http.request_timeout_secs",
            reason: "must be greater than 0".to_string(),
        });
    }

    if config.rate_limit.enabled && (config.rate_limit.max_requests == 0 || config.rate_limit.window_secs == 0) {
        errors.push(ValidationError::Invalid {
            field: "rate_limit",
            reason: "max_requests and window_secs must be greater than 0".to_string(),
        });
    }

    if config.database.max_connections == 0 {
        errors.push(ValidationError::Invalid {
            field: "database.max_connections",
            reason: "must be greater than 0".to_string(),
        });
    }

    if config.lifecycle.shutdown_deadline_ms == 0 {
        errors.push(ValidationError::Invalid {
            field: "lifecycle.shutdown_deadline_ms",
            reason: "must be greater than 0".to_string(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::Invalid {
            field: "observability.metrics_address",
            reason: format!("{} is not a socket address", config.observability.metrics_address),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
