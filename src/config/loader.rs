//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration for a service rooted at `root`.
///
/// Order of precedence, lowest first: schema defaults, the optional TOML file,
/// `<root>/.env`, the process environment.
pub fn load(root: &Path, config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_dotenv(root);

    let mut config = match config_path {
        Some(path) => load_config_file(path)?,
        None => AppConfig::default(),
    };

    let mut errors = apply_env(&mut config, |key| std::env::var(key).ok());
    if let Err(invalid) = validate_config(&config) {
        errors.extend(invalid);
    }

    if errors.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Validation(errors))
    }
}

/// Parse a TOML configuration file without validating it.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Load `<root>/.env` into the process environment.
///
/// Variables already set in the environment are left untouched.
fn load_dotenv(root: &Path) {
    let path = root.join(".env");
    match dotenvy::from_path(&path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => tracing::debug!(path = %path.display(), "No .env file"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to read .env file"),
    }
}

/// Overlay environment variables onto `config`.
///
/// Returns a validation error for each variable that is set but unparsable.
pub fn apply_env<F>(config: &mut AppConfig, lookup: F) -> Vec<ValidationError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();
    let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(name) = var("APP_NAME") {
        config.app.name = name;
    }
    if let Some(host) = var("APP_HOST") {
        config.app.host = host;
    }
    if let Some(port) = var("APP_PORT") {
        match port.parse() {
            Ok(port) => config.app.port = port,
            Err(_) => errors.push(invalid_port("app.port", &port)),
        }
    }
    if let Some(host) = var("DB_HOST") {
        config.database.host = host;
    }
    if let Some(port) = var("DB_PORT") {
        match port.parse() {
            Ok(port) => config.database.port = port,
            Err(_) => errors.push(invalid_port("database.port", &port)),
        }
    }
    if let Some(username) = var("DB_USERNAME") {
        config.database.username = username;
    }
    if let Some(password) = lookup("DB_PASSWORD") {
        config.database.password = password;
    }
    if let Some(database) = var("DB_DATABASE") {
        config.database.database = database;
    }
    if let Some(level) = var("LOG_LEVEL") {
        config.observability.log_level = level;
    }

    errors
}

fn invalid_port(field: &'static str, value: &str) -> ValidationError {
    ValidationError::Invalid {
        field,
        reason: format!("{:?} is not a port number", value),
    }
}
