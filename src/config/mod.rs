//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → <root>/.env + process environment (overrides)
//!     → validation.rs (required settings, value ranges)
//!     → AppConfig (validated, immutable)
//!     → sections handed to the subsystems that need them
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults so the environment alone is enough
//! - Missing required settings are fatal before any subsystem starts

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, ConfigError};
pub use schema::{
    AppConfig, AppSection, CorsConfig, DatabaseConfig, HttpConfig, LifecycleConfig, ObservabilityConfig,
    RateLimitConfig, SecondSignalPolicy,
};
pub use validation::ValidationError;
