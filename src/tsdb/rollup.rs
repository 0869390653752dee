//! Bucket math
//!
//! A rollup is a bucket width (resolution) plus how many buckets of that width
//! are retained. Rollup slices handed to these helpers are sorted finest first.

use serde::{Deserialize, Serialize};

pub const ONE_MINUTE: u32 = 60;
pub const ONE_HOUR: u32 = 60 * ONE_MINUTE;
pub const ONE_DAY: u32 = 24 * ONE_HOUR;

/// Bucket width and retention for one resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rollup {
    /// Bucket width in seconds
    pub resolution_secs: u32,
    /// Number of buckets kept before they roll off
    pub samples: u32,
}

impl Rollup {
    pub const fn new(resolution_secs: u32, samples: u32) -> Self {
        Rollup {
            resolution_secs,
            samples,
        }
    }

    /// Default rollups: 10 seconds for an hour, hourly for a week, daily for 90 days
    pub fn defaults() -> Vec<Rollup> {
        vec![
            Rollup::new(10, 360),
            Rollup::new(ONE_HOUR, 24 * 7),
            Rollup::new(ONE_DAY, 90),
        ]
    }

    /// Width of the retention window in seconds
    pub fn retention_secs(&self) -> i64 {
        i64::from(self.resolution_secs) * i64::from(self.samples)
    }

    /// Start of the bucket covering `timestamp`, `None` if it does not fit in `i64`
    ///
    /// Floors toward negative infinity so pre-epoch timestamps bucket correctly.
    pub fn bucket_start(&self, timestamp: i64) -> Option<i64> {
        let resolution = i64::from(self.resolution_secs);
        timestamp.div_euclid(resolution).checked_mul(resolution)
    }

    /// Every bucket start between the buckets of `since` and `until`, inclusive
    ///
    /// `None` when either end has no representable bucket.
    pub fn boundaries(&self, since: i64, until: i64) -> Option<impl Iterator<Item = i64> + Clone> {
        let step = i64::from(self.resolution_secs);
        let first = self.bucket_start(since)?;
        let last = self.bucket_start(until)?;
        let successor = move |ts: &i64| ts.checked_add(step).filter(|next| *next <= last);
        Some(std::iter::successors(Some(first).filter(|ts| *ts <= last), successor))
    }

    /// Number of buckets `boundaries` yields for the same range
    pub fn bucket_count(&self, since: i64, until: i64) -> Option<u64> {
        let first = self.bucket_start(since)?;
        let last = self.bucket_start(until)?;
        if last < first {
            return Some(0);
        }
        let span = i128::from(last) - i128::from(first);
        u64::try_from(span / i128::from(self.resolution_secs) + 1).ok()
    }

    /// Whether a bucket has rolled off the retention window at `now`
    pub fn is_expired(&self, bucket_start: i64, now: i64) -> bool {
        match self
            .bucket_start(now)
            .and_then(|current| current.checked_sub(self.retention_secs()))
        {
            Some(cutoff) => bucket_start < cutoff,
            None => false,
        }
    }
}

/// Largest supported resolution not exceeding `requested`
///
/// A request finer than every supported resolution gets the finest one.
pub fn resolve_rollup(rollups: &[Rollup], requested_secs: u32) -> Option<Rollup> {
    rollups
        .iter()
        .rev()
        .find(|rollup| rollup.resolution_secs <= requested_secs)
        .or_else(|| rollups.first())
        .copied()
}

/// Finest rollup whose retention window still reaches back to `since`
///
/// Falls back to the coarsest rollup when nothing covers the range.
pub fn optimal_rollup(rollups: &[Rollup], since: i64, now: i64) -> Option<Rollup> {
    let span = now.saturating_sub(since);
    rollups
        .iter()
        .find(|rollup| rollup.retention_secs() >= span)
        .or_else(|| rollups.last())
        .copied()
}

/// Parse a resolution such as `10s`, `5m`, `1h` or `1d` into seconds
pub fn parse_resolution(value: &str) -> Option<u32> {
    let (digits, unit) = if let Some(d) = value.strip_suffix('d') {
        (d, ONE_DAY)
    } else if let Some(h) = value.strip_suffix('h') {
        (h, ONE_HOUR)
    } else if let Some(m) = value.strip_suffix('m') {
        (m, ONE_MINUTE)
    } else if let Some(s) = value.strip_suffix('s') {
        (s, 1)
    } else {
        return None;
    };

    let count: u32 = digits.parse().ok()?;
    count.checked_mul(unit).filter(|secs| *secs > 0)
}

/// Sort finest first and drop duplicate resolutions
pub fn normalize(mut rollups: Vec<Rollup>) -> Vec<Rollup> {
    rollups.sort_by_key(|rollup| rollup.resolution_secs);
    rollups.dedup_by_key(|rollup| rollup.resolution_secs);
    rollups
}
