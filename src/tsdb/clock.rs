//! Clock abstraction
//!
//! The store reads "now" through this trait so tests can pin time while the
//! server uses the system clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Timestamp in milliseconds since the UNIX epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    pub fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1000))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Whole epoch seconds, the unit counter buckets are keyed by
    pub fn as_secs(&self) -> i64 {
        (self.0 / 1000) as i64
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0.saturating_add(rhs.as_millis() as u64))
    }
}

/// Source of the current time
pub trait Clock: Send + Sync + Clone + 'static {
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Clone)]
pub struct SystemClock {
    start: Instant,
    start_millis: u64,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        let start_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        SystemClock {
            start: Instant::now(),
            start_millis,
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let elapsed = self.start.elapsed().as_millis() as u64;
        Timestamp(self.start_millis + elapsed)
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    time_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        ManualClock {
            time_ms: Arc::new(AtomicU64::new(start.0)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, time: Timestamp) {
        self.time_ms.store(time.0, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.time_ms.load(Ordering::SeqCst))
    }
}
