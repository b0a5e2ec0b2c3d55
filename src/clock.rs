use std::sync::atomic::{AtomicI64, Ordering};

use time::OffsetDateTime;

pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Source of wall-clock time in unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
    }
}

/// Clock that only moves when told to. Used by tests that exercise age-based eviction.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_millis: AtomicI64,
}

impl ManualClock {
    pub fn new(now_millis: i64) -> Self {
        Self {
            now_millis: AtomicI64::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: i64) {
        self.now_millis.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i64) {
        self.now_millis
            .fetch_add(days.saturating_mul(MILLIS_PER_DAY), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now_millis.load(Ordering::SeqCst)
    }
}
