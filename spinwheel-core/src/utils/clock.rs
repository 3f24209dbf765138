// File: spinwheel-core/src/utils/clock.rs

use chrono::{DateTime, Utc};

/// Wall-clock seam. Month selection and expiry decisions go through this so
/// tests can simulate rollovers and expiry without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
