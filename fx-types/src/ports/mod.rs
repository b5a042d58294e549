//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The rate service depends on these traits, not concrete implementations.

mod provider;

pub use provider::{ProviderRates, RateProvider};
