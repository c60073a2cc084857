//! Wall-clock effect trait.
//!
//! Production handler lives in `cpa-effects`; a settable clock for tests
//! lives in `cpa-testkit`.

use chrono::{DateTime, Utc};

/// Source of the current wall-clock instant
pub trait PhysicalTimeEffects: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

impl<T: PhysicalTimeEffects + ?Sized> PhysicalTimeEffects for std::sync::Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
