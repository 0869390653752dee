//! Time-Series Counter Store
//!
//! Bucketed increment counters keyed by `(model, key)`:
//!
//! - **Buckets** at every configured resolution, created lazily on first increment
//! - **Ranged reads** that are zero-filled, gap-free and chronological
//! - **Retention** enforced by a background sweeper
//! - **Tenant accounting** on every call
//!
//! The store never interprets keys; composite key conventions belong to callers.

mod backend;
mod clock;
mod error;
mod memory;
mod retention;
mod rollup;
mod types;

pub use backend::{ModelRollups, TsdbBackend};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use error::StoreError;
pub use memory::{InMemoryTsdb, DEFAULT_MAX_POINTS};
pub use retention::RetentionSweeper;
pub use rollup::{
    optimal_rollup, parse_resolution, resolve_rollup, Rollup, ONE_DAY, ONE_HOUR, ONE_MINUTE,
};
pub use types::{Point, RangeResult, Series, TenantIds, TenantUsage, TsdbKey, TsdbModel};
