//! Stats query parameters
//!
//! `since` and `until` are float epoch seconds; `resolution` is a duration
//! such as `10s`, `1h` or `1d` that must match a configured rollup. Without
//! `until` the range ends now, and without `since` it spans one day.
//!
//! Timestamps must fall between the epoch and the end of year 9999, and the
//! range may not span more than `max_points` buckets at the chosen rollup.

use serde::Deserialize;

use super::error::InteractionError;
use crate::tsdb::{optimal_rollup, parse_resolution, Rollup, ONE_DAY};

/// 9999-12-31T23:59:59Z
pub const MAX_TIMESTAMP_SECS: f64 = 253_402_300_799.0;

const TOO_MANY_POINTS: &str = "Your interval and date range would create too many results. \
                               Use a larger interval, or a smaller date range.";

/// Raw query string values
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsParams {
    pub since: Option<String>,
    pub until: Option<String>,
    pub resolution: Option<String>,
}

/// Validated range in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsQuery {
    pub since: i64,
    pub until: i64,
    /// `None` lets the store choose the optimal rollup
    pub resolution: Option<u32>,
}

impl StatsQuery {
    pub fn parse(
        params: &StatsParams,
        rollups: &[Rollup],
        now: i64,
        max_points: u64,
    ) -> Result<Self, InteractionError> {
        let resolution = match non_empty(&params.resolution) {
            Some(value) => {
                let secs = parse_resolution(value)
                    .filter(|secs| rollups.iter().any(|r| r.resolution_secs == *secs))
                    .ok_or_else(|| invalid("Invalid resolution"))?;
                Some(secs)
            }
            None => None,
        };

        let until = match non_empty(&params.until) {
            Some(value) => {
                parse_timestamp(value).ok_or_else(|| invalid("until must be a numeric timestamp."))?
            }
            None => now as f64,
        };

        let since = match non_empty(&params.since) {
            Some(value) => {
                let since = parse_timestamp(value)
                    .ok_or_else(|| invalid("since must be a numeric timestamp"))?;
                if since > until {
                    return Err(invalid("start must be before or equal to end"));
                }
                since
            }
            None => until - f64::from(ONE_DAY) + 1.0,
        };

        // Both ends are bounded above, so the casts are exact
        let since = since.floor() as i64;
        let until = until.floor() as i64;

        let rollup = match resolution {
            Some(secs) => rollups.iter().find(|r| r.resolution_secs == secs).copied(),
            None => optimal_rollup(rollups, since, now),
        };
        if let Some(rollup) = rollup {
            let points = rollup
                .bucket_count(since, until)
                .ok_or_else(|| invalid(TOO_MANY_POINTS))?;
            if points > max_points {
                return Err(invalid(TOO_MANY_POINTS));
            }
        }

        Ok(StatsQuery {
            since,
            until,
            resolution,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_timestamp(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|ts| (0.0..=MAX_TIMESTAMP_SECS).contains(ts))
}

fn invalid(detail: &str) -> InteractionError {
    InteractionError::InvalidQuery(detail.to_string())
}
