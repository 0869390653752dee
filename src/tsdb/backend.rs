//! Counter store contract
//!
//! Callers hold an `Arc<dyn TsdbBackend>` built at process bootstrap. The
//! contract is synchronous: no call suspends beyond its own storage latency.

use std::collections::BTreeMap;

use super::error::StoreError;
use super::rollup::{normalize, Rollup};
use super::types::{RangeResult, TenantIds, TenantUsage, TsdbKey, TsdbModel};

/// Bucketed increment counters with ranged reads
pub trait TsdbBackend: Send + Sync {
    /// Rollups configured for `model`, finest first
    fn rollups(&self, model: TsdbModel) -> Result<&[Rollup], StoreError>;

    /// Current store time in epoch seconds
    fn now(&self) -> i64;

    /// Add `amount` to the bucket covering `timestamp` (default: now) at every
    /// resolution configured for `model`
    ///
    /// There is no deduplication: a retried call counts twice.
    fn incr(
        &self,
        model: TsdbModel,
        key: &TsdbKey,
        timestamp: Option<i64>,
        amount: u64,
        tenant: &TenantIds,
    ) -> Result<(), StoreError>;

    /// Validate every item, then apply all increments at one timestamp
    fn incr_multi(
        &self,
        items: &[(TsdbModel, TsdbKey, u64)],
        timestamp: Option<i64>,
        tenant: &TenantIds,
    ) -> Result<(), StoreError> {
        tenant.require_organization()?;
        for (model, key, _) in items {
            self.rollups(*model)?;
            key.validate()?;
        }
        let timestamp = timestamp.unwrap_or_else(|| self.now());
        for (model, key, amount) in items {
            self.incr(*model, key, Some(timestamp), *amount, tenant)?;
        }
        Ok(())
    }

    /// One zero-filled series per distinct key covering `[since, until]`
    ///
    /// `resolution` falls back to the largest supported resolution not
    /// exceeding it; without one the store picks the finest rollup whose
    /// retention reaches `since`.
    fn get_range(
        &self,
        model: TsdbModel,
        keys: &[TsdbKey],
        since: i64,
        until: i64,
        resolution: Option<u32>,
        tenant: &TenantIds,
    ) -> Result<RangeResult, StoreError>;

    /// Per-key totals over `[since, until]`, in input order
    fn get_sums(
        &self,
        model: TsdbModel,
        keys: &[TsdbKey],
        since: i64,
        until: i64,
        resolution: Option<u32>,
        tenant: &TenantIds,
    ) -> Result<Vec<(TsdbKey, u64)>, StoreError> {
        let range = self.get_range(model, keys, since, until, resolution, tenant)?;
        Ok(range
            .into_iter()
            .map(|(key, series)| {
                let total = series.iter().fold(0u64, |acc, (_, count)| acc.saturating_add(*count));
                (key, total)
            })
            .collect())
    }

    /// Drop every bucket that has rolled off its retention window at `now`,
    /// returning how many were removed
    fn evict_expired(&self, now: i64) -> usize;

    /// Reads and writes recorded for an organization
    fn tenant_usage(&self, organization_id: u64) -> TenantUsage;
}

/// Rollups per enabled model
///
/// A model absent from the table is unknown to the store.
#[derive(Debug, Clone, Default)]
pub struct ModelRollups {
    table: BTreeMap<TsdbModel, Vec<Rollup>>,
}

impl ModelRollups {
    /// Same rollups for every model
    pub fn uniform(rollups: Vec<Rollup>) -> Self {
        Self::only(&TsdbModel::ALL, rollups)
    }

    /// Enable just `models`
    pub fn only(models: &[TsdbModel], rollups: Vec<Rollup>) -> Self {
        let rollups = normalize(rollups);
        let table = models
            .iter()
            .map(|model| (*model, rollups.clone()))
            .collect();
        ModelRollups { table }
    }

    /// Override (or enable) one model
    pub fn with_model(mut self, model: TsdbModel, rollups: Vec<Rollup>) -> Self {
        self.table.insert(model, normalize(rollups));
        self
    }

    pub fn get(&self, model: TsdbModel) -> Result<&[Rollup], StoreError> {
        match self.table.get(&model) {
            Some(rollups) if !rollups.is_empty() => Ok(rollups.as_slice()),
            _ => Err(StoreError::UnknownModel(model.as_str().to_string())),
        }
    }

    /// Rollup for `model` at exactly `resolution_secs`
    pub fn find(&self, model: TsdbModel, resolution_secs: u32) -> Option<Rollup> {
        self.table
            .get(&model)?
            .iter()
            .find(|rollup| rollup.resolution_secs == resolution_secs)
            .copied()
    }
}
