//! Rate snapshot domain model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::currency::CurrencyCode;
use crate::error::SnapshotError;

/// A complete table of rates relative to a single reference currency.
///
/// Invariants (enforced by [`RateSnapshot::new`]):
/// - the table is never empty
/// - every rate is finite and strictly positive
/// - the reference currency maps to exactly `1.0`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// Local time at which the snapshot was received. Drives cache freshness.
    pub fetched_at: DateTime<Utc>,
    /// Timestamp declared by the upstream provider.
    pub published_at: DateTime<Utc>,
    pub reference: CurrencyCode,
    rates: BTreeMap<CurrencyCode, f64>,
}

impl RateSnapshot {
    /// Validates an upstream rate table and builds a snapshot.
    ///
    /// A missing reference entry is inserted as `1.0`.
    pub fn new(
        reference: CurrencyCode,
        mut rates: BTreeMap<CurrencyCode, f64>,
        fetched_at: DateTime<Utc>,
        published_at: DateTime<Utc>,
    ) -> Result<Self, SnapshotError> {
        if rates.is_empty() {
            return Err(SnapshotError::Empty);
        }

        if let Some((code, &rate)) = rates.iter().find(|(_, r)| !(r.is_finite() && **r > 0.0)) {
            return Err(SnapshotError::InvalidRate {
                currency: code.clone(),
                rate,
            });
        }

        match rates.get(&reference) {
            Some(&rate) if rate != 1.0 => {
                return Err(SnapshotError::ReferenceNotUnit { reference, rate });
            }
            Some(_) => {}
            None => {
                rates.insert(reference.clone(), 1.0);
            }
        }

        Ok(Self {
            fetched_at,
            published_at,
            reference,
            rates,
        })
    }

    /// Rate of `code` relative to the reference currency, if present.
    pub fn rate_of(&self, code: &CurrencyCode) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// The full table, ordered by currency code.
    pub fn rates(&self) -> &BTreeMap<CurrencyCode, f64> {
        &self.rates
    }

    pub fn currencies(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.rates.keys()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, f64)]) -> BTreeMap<CurrencyCode, f64> {
        entries
            .iter()
            .map(|(c, r)| (CurrencyCode::from(*c), *r))
            .collect()
    }

    #[test]
    fn test_snapshot_inserts_missing_reference() {
        let now = Utc::now();
        let snapshot =
            RateSnapshot::new("USD".into(), table(&[("EUR", 0.85)]), now, now).unwrap();
        assert_eq!(snapshot.rate_of(&"USD".into()), Some(1.0));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_snapshot_rejects_empty_table() {
        let now = Utc::now();
        let result = RateSnapshot::new("USD".into(), BTreeMap::new(), now, now);
        assert!(matches!(result, Err(SnapshotError::Empty)));
    }

    #[test]
    fn test_snapshot_rejects_non_positive_and_nan() {
        let now = Utc::now();
        let zero = RateSnapshot::new("USD".into(), table(&[("USD", 1.0), ("EUR", 0.0)]), now, now);
        assert!(matches!(zero, Err(SnapshotError::InvalidRate { .. })));

        let nan = RateSnapshot::new(
            "USD".into(),
            table(&[("USD", 1.0), ("GBP", f64::NAN)]),
            now,
            now,
        );
        assert!(matches!(nan, Err(SnapshotError::InvalidRate { .. })));
    }

    #[test]
    fn test_snapshot_rejects_reference_not_unit() {
        let now = Utc::now();
        let result = RateSnapshot::new("USD".into(), table(&[("USD", 1.2)]), now, now);
        assert!(matches!(
            result,
            Err(SnapshotError::ReferenceNotUnit { rate, .. }) if rate == 1.2
        ));
    }
}
