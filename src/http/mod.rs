//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, access log span)
//!     → security (CORS, rate limit)
//!     → application routes (none by default)
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{AccessLog, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
