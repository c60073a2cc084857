//! Production wall-clock handler
//!
//! Stateless; delegates to the system clock. Settable clocks for tests live
//! in `cpa-testkit`.

use chrono::{DateTime, Utc};
use cpa_core::effects::PhysicalTimeEffects;

/// Real clock handler for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClockHandler;

impl RealClockHandler {
    /// Create a new real clock handler
    pub fn new() -> Self {
        Self
    }
}

impl PhysicalTimeEffects for RealClockHandler {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
