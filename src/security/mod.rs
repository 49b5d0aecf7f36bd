//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (answer preflights, add CORS headers)
//!     → rate_limit.rs (check per-IP limits)
//!     → Pass to routes
//! ```
//!
//! # Design Decisions
//! - Limits are keyed by peer IP, taken from the connection
//! - Rejected requests never reach a handler

pub mod cors;
pub mod rate_limit;

pub use cors::cors_layer;
pub use rate_limit::{rate_limit_middleware, RateLimiterState};
