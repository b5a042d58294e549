//! # FX Hex
//!
//! HTTP adapter for the currency rates service.
//!
//! ## Architecture
//!
//! - `inbound/` - HTTP adapter (Axum server, auth and rate-limit middleware)
//! - `openapi` - OpenAPI document served under `/api-docs`
//!
//! The adapter is generic over `P: RateProvider` and drives the
//! `RateService` / `RefreshScheduler` pair from the `exchange-rates` crate.

pub mod inbound;
pub mod openapi;

pub use inbound::{AuthConfig, HttpServer, RateLimitConfig, ServerOptions};
