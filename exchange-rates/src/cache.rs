//! Single-slot snapshot cache.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use fx_types::RateSnapshot;

/// Holds at most one [`RateSnapshot`].
///
/// Replacement swaps an `Arc` under a lock that is never held across an
/// `.await`, so readers always see either the old or the new snapshot.
#[derive(Debug, Default)]
pub struct RateCache {
    slot: RwLock<Option<Arc<RateSnapshot>>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the held snapshot regardless of freshness.
    pub fn get(&self) -> Option<Arc<RateSnapshot>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the held snapshot.
    pub fn set(&self, snapshot: Arc<RateSnapshot>) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    pub fn clear(&self) {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Time elapsed since the held snapshot was fetched.
    pub fn age(&self) -> Option<Duration> {
        self.get().map(|snapshot| age_of(&snapshot))
    }

    /// True when a snapshot is held and it is younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age().is_some_and(|age| age < ttl)
    }
}

/// Age of a snapshot; clock skew into the future counts as zero.
pub(crate) fn age_of(snapshot: &RateSnapshot) -> Duration {
    (Utc::now() - snapshot.fetched_at)
        .to_std()
        .unwrap_or(Duration::ZERO)
}
