//! Settable clock

use chrono::{DateTime, Duration, Utc};
use cpa_core::effects::PhysicalTimeEffects;
use parking_lot::Mutex;
use std::sync::Arc;

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    /// Clock frozen at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Jump to `now`
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move forward by `by`
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl PhysicalTimeEffects for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
