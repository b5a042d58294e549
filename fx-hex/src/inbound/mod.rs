//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod auth;
mod handlers;
mod rate_limit;
mod server;

pub use auth::AuthConfig;
pub use rate_limit::RateLimitConfig;
pub use server::{HttpServer, ServerOptions};
