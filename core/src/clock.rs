//! Game clock: the single source of "now" for the tick core.
//!
//! RULE: the engine never calls `Utc::now()` directly.
//! Production wires a `SystemClock`; tests drive a `ManualClock`.

use crate::types::{from_millis, Timestamp};
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};

pub trait GameClock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl GameClock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Settable clock. Clones share the same instant, so a test can hold one
/// handle while the engine or scheduler holds another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    /// Clock starting at the unix epoch, so test times read as plain offsets.
    pub fn at_epoch() -> Self {
        Self::new(from_millis(0))
    }

    pub fn set(&self, ts: Timestamp) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = ts;
    }

    /// Set the clock to `secs` after the epoch.
    pub fn set_secs(&self, secs: i64) {
        self.set(from_millis(secs * 1_000));
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl GameClock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}
