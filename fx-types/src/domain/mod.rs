//! Domain models for the currency rates service.

pub mod conversion;
pub mod currency;
pub mod snapshot;

pub use conversion::{ConversionResult, round_to};
pub use currency::CurrencyCode;
pub use snapshot::RateSnapshot;
