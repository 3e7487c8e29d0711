//! The shared relay server.
//!
//! Students without their own API key point the CLI at this server. It
//! validates each request, charges it against the student's quota and
//! forwards the conversation to the model.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod rate_limit;
mod routes;

pub use config::ServerConfig;
pub use rate_limit::{QuotaExceeded, RateLimitPolicy, RateLimiter};
pub use routes::{AppState, router};
