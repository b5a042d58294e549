//! # Exchange Rates
//!
//! Rate cache and refresh subsystem for the currency rates service.
//!
//! ## Architecture
//!
//! - `cache` - Single-slot snapshot cache with a TTL freshness check
//! - `service` - Fetch-with-cache, stale fallback, re-basing and conversion
//! - `scheduler` - Wall-clock aligned background refresh with bounded retry
//!
//! The service is generic over `P: RateProvider`, allowing different
//! upstream adapters (HTTP, static tables, test doubles) to be injected.
//!
//! # Example
//! ```ignore
//! let service = Arc::new(RateService::new(provider, RateServiceConfig::default()));
//! let scheduler = RefreshScheduler::new(service.clone(), SchedulerConfig::default());
//! scheduler.start();
//!
//! let result = service.convert_currency(100.0, "USD", "EUR").await?;
//! println!("{} {} = {} {}", result.amount, result.from, result.result, result.to);
//! ```

pub mod cache;
pub mod scheduler;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use cache::RateCache;
pub use scheduler::{RefreshScheduler, SchedulerConfig};
pub use service::{FetchedRates, RateService, RateServiceConfig, rates_relative_to};
