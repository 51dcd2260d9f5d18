//! Freshness judged by the cached value itself.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// A value that knows when it was produced.
///
/// The cache stores such values but never consults them; callers decide
/// whether a value they selected is still usable for their window.
pub trait Expiring {
    /// When the value was generated.
    fn generated_at(&self) -> DateTime<Utc>;

    /// Age of the value relative to `now`. Never negative.
    fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        (now - self.generated_at()).max(TimeDelta::zero())
    }

    /// Whether `now - generated_at >= ttl`.
    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match TimeDelta::from_std(ttl) {
            Ok(ttl) => self.age(now) >= ttl,
            // A window too large to represent never elapses.
            Err(_) => false,
        }
    }
}

impl<T: Expiring + ?Sized> Expiring for Arc<T> {
    fn generated_at(&self) -> DateTime<Utc> {
        (**self).generated_at()
    }
}
