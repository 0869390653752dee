//! In-memory sharded counter store
//!
//! Cells are spread over a fixed number of shards by hashing `(model, key)`,
//! so every resolution of one key lives in the same shard. Each cell is an
//! atomic counter: increments on existing cells only take the shard's shared
//! lock, and the exclusive lock is reserved for creating or evicting cells.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::debug;

use super::backend::{ModelRollups, TsdbBackend};
use super::clock::{Clock, SystemClock};
use super::error::StoreError;
use super::rollup::{optimal_rollup, resolve_rollup, Rollup};
use super::types::{RangeResult, Series, TenantIds, TenantUsage, TsdbKey, TsdbModel};

const NUM_SHARDS: usize = 16;

/// Default cap on buckets per key in one ranged read
pub const DEFAULT_MAX_POINTS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Cell {
    model: TsdbModel,
    key: TsdbKey,
    resolution_secs: u32,
    bucket_start: i64,
}

#[derive(Default)]
struct Shard {
    cells: RwLock<AHashMap<Cell, AtomicU64>>,
}

impl Shard {
    /// Add `amount` to each cell, creating the missing ones
    fn add(&self, cells: Vec<Cell>, amount: u64) {
        let mut missing = Vec::new();
        {
            let map = self.cells.read();
            for cell in cells {
                match map.get(&cell) {
                    Some(count) => {
                        count.fetch_add(amount, Ordering::Relaxed);
                    }
                    None => missing.push(cell),
                }
            }
        }

        if missing.is_empty() {
            return;
        }

        // Another writer may have created the cell between the two locks;
        // `entry` folds that case into a plain add.
        let mut map = self.cells.write();
        for cell in missing {
            map.entry(cell)
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(amount, Ordering::Relaxed);
        }
    }

    fn series(
        &self,
        model: TsdbModel,
        key: &TsdbKey,
        resolution_secs: u32,
        buckets: impl Iterator<Item = i64>,
    ) -> Series {
        let map = self.cells.read();
        let mut lookup = Cell {
            model,
            key: key.clone(),
            resolution_secs,
            bucket_start: 0,
        };
        buckets
            .map(|bucket_start| {
                lookup.bucket_start = bucket_start;
                let count = map
                    .get(&lookup)
                    .map(|count| count.load(Ordering::Relaxed))
                    .unwrap_or(0);
                (bucket_start, count)
            })
            .collect()
    }
}

#[derive(Default)]
struct UsageCounters {
    reads: AtomicU64,
    writes: AtomicU64,
}

/// Counter store held entirely in process memory
pub struct InMemoryTsdb<C: Clock = SystemClock> {
    shards: Box<[Shard]>,
    rollups: ModelRollups,
    max_points: u64,
    usage: RwLock<AHashMap<u64, UsageCounters>>,
    clock: C,
}

impl InMemoryTsdb<SystemClock> {
    pub fn new(rollups: ModelRollups) -> Self {
        Self::with_clock(rollups, SystemClock::new())
    }
}

impl<C: Clock> InMemoryTsdb<C> {
    pub fn with_clock(rollups: ModelRollups, clock: C) -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();
        InMemoryTsdb {
            shards,
            rollups,
            max_points: DEFAULT_MAX_POINTS,
            usage: RwLock::new(AHashMap::new()),
            clock,
        }
    }

    /// Cap the number of buckets a ranged read may return per key
    pub fn with_max_points(mut self, max_points: u64) -> Self {
        self.max_points = max_points;
        self
    }

    /// Number of live cells across all shards
    pub fn cell_count(&self) -> usize {
        self.shards.iter().map(|shard| shard.cells.read().len()).sum()
    }

    #[inline]
    fn shard(&self, model: TsdbModel, key: &TsdbKey) -> &Shard {
        let mut hasher = DefaultHasher::new();
        model.hash(&mut hasher);
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % NUM_SHARDS;
        debug_assert!(idx < self.shards.len(), "Hash produced invalid shard index");
        &self.shards[idx]
    }

    fn record_usage(&self, organization_id: u64, reads: u64, writes: u64) {
        {
            let usage = self.usage.read();
            if let Some(counters) = usage.get(&organization_id) {
                counters.reads.fetch_add(reads, Ordering::Relaxed);
                counters.writes.fetch_add(writes, Ordering::Relaxed);
                return;
            }
        }
        let mut usage = self.usage.write();
        let counters = usage.entry(organization_id).or_default();
        counters.reads.fetch_add(reads, Ordering::Relaxed);
        counters.writes.fetch_add(writes, Ordering::Relaxed);
    }
}

impl<C: Clock> TsdbBackend for InMemoryTsdb<C> {
    fn rollups(&self, model: TsdbModel) -> Result<&[Rollup], StoreError> {
        self.rollups.get(model)
    }

    fn now(&self) -> i64 {
        self.clock.now().as_secs()
    }

    fn incr(
        &self,
        model: TsdbModel,
        key: &TsdbKey,
        timestamp: Option<i64>,
        amount: u64,
        tenant: &TenantIds,
    ) -> Result<(), StoreError> {
        let organization_id = tenant.require_organization()?;
        let rollups = self.rollups.get(model)?;
        key.validate()?;

        let timestamp = timestamp.unwrap_or_else(|| self.now());
        let cells = rollups
            .iter()
            .map(|rollup| {
                let bucket_start = rollup.bucket_start(timestamp).ok_or(StoreError::InvalidRange {
                    since: timestamp,
                    until: timestamp,
                })?;
                Ok(Cell {
                    model,
                    key: key.clone(),
                    resolution_secs: rollup.resolution_secs,
                    bucket_start,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        self.shard(model, key).add(cells, amount);
        self.record_usage(organization_id, 0, 1);
        debug!(%model, %key, timestamp, amount, referrer = ?tenant.referrer, "tsdb incr");
        Ok(())
    }

    fn get_range(
        &self,
        model: TsdbModel,
        keys: &[TsdbKey],
        since: i64,
        until: i64,
        resolution: Option<u32>,
        tenant: &TenantIds,
    ) -> Result<RangeResult, StoreError> {
        let organization_id = tenant.require_organization()?;
        let rollups = self.rollups.get(model)?;
        if keys.is_empty() {
            return Err(StoreError::EmptyKeySet);
        }
        if since > until {
            return Err(StoreError::InvalidRange { since, until });
        }
        for key in keys {
            key.validate()?;
        }

        let rollup = match resolution {
            Some(requested) => resolve_rollup(rollups, requested),
            None => optimal_rollup(rollups, since, self.now()),
        }
        .ok_or_else(|| StoreError::UnknownModel(model.as_str().to_string()))?;

        let points = rollup
            .bucket_count(since, until)
            .ok_or(StoreError::InvalidRange { since, until })?;
        if points > self.max_points {
            return Err(StoreError::RangeTooLarge {
                points,
                max: self.max_points,
            });
        }
        let buckets = rollup
            .boundaries(since, until)
            .ok_or(StoreError::InvalidRange { since, until })?;

        let mut result = RangeResult::with_capacity(keys.len());
        for key in keys {
            if result.contains_key(key) {
                continue;
            }
            let series = self
                .shard(model, key)
                .series(model, key, rollup.resolution_secs, buckets.clone());
            result.push(key.clone(), series);
        }

        self.record_usage(organization_id, 1, 0);
        debug!(
            %model,
            keys = result.len(),
            since,
            until,
            resolution = rollup.resolution_secs,
            referrer = ?tenant.referrer,
            "tsdb get_range"
        );
        Ok(result)
    }

    fn evict_expired(&self, now: i64) -> usize {
        let mut removed = 0usize;
        for shard in self.shards.iter() {
            let mut map = shard.cells.write();
            let before = map.len();
            map.retain(|cell, _| {
                match self.rollups.find(cell.model, cell.resolution_secs) {
                    Some(rollup) => !rollup.is_expired(cell.bucket_start, now),
                    // Resolution no longer configured: nothing can read it.
                    None => false,
                }
            });
            removed = removed.saturating_add(before - map.len());
        }
        removed
    }

    fn tenant_usage(&self, organization_id: u64) -> TenantUsage {
        self.usage
            .read()
            .get(&organization_id)
            .map(|counters| TenantUsage {
                reads: counters.reads.load(Ordering::Relaxed),
                writes: counters.writes.load(Ordering::Relaxed),
            })
            .unwrap_or_default()
    }
}
