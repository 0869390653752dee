//! Core counter-store types
//!
//! Models name counter namespaces, keys identify the counted entity within a
//! model, and tenant ids tag every call for isolation and accounting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::StoreError;

/// A bucket start (epoch seconds) paired with the count recorded in that bucket.
pub type Point = (i64, u64);

/// Chronological, gap-free sequence of buckets for one key.
pub type Series = Vec<Point>;

/// Counter namespace
///
/// Lookup from user input goes through [`TsdbModel::from_name`], a closed
/// mapping with an explicit not-found branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TsdbModel {
    /// Events received for a project
    Project,
    /// Events received for an issue group
    Group,
    /// Events received for a release
    Release,
    /// Events received across an organization
    OrganizationTotalReceived,
    /// An integration app's page was viewed
    SentryAppViewed,
    /// A UI component registered by an integration app was interacted with
    SentryAppComponentInteracted,
}

impl TsdbModel {
    pub const ALL: [TsdbModel; 6] = [
        TsdbModel::Project,
        TsdbModel::Group,
        TsdbModel::Release,
        TsdbModel::OrganizationTotalReceived,
        TsdbModel::SentryAppViewed,
        TsdbModel::SentryAppComponentInteracted,
    ];

    /// Stable snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            TsdbModel::Project => "project",
            TsdbModel::Group => "group",
            TsdbModel::Release => "release",
            TsdbModel::OrganizationTotalReceived => "organization_total_received",
            TsdbModel::SentryAppViewed => "sentry_app_viewed",
            TsdbModel::SentryAppComponentInteracted => "sentry_app_component_interacted",
        }
    }

    /// Map a name back to its model, `None` when no model has that name
    pub fn from_name(name: &str) -> Option<TsdbModel> {
        Self::ALL.into_iter().find(|model| model.as_str() == name)
    }
}

impl fmt::Display for TsdbModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TsdbModel {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| StoreError::UnknownModel(s.to_string()))
    }
}

/// Identifier of the counted entity
///
/// The store never looks inside a key; composite conventions belong to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TsdbKey {
    Id(u64),
    Name(String),
}

impl TsdbKey {
    pub fn validate(&self) -> Result<(), StoreError> {
        match self {
            TsdbKey::Id(_) => Ok(()),
            TsdbKey::Name(name) if name.is_empty() => {
                Err(StoreError::InvalidKey("key must not be empty".to_string()))
            }
            TsdbKey::Name(_) => Ok(()),
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            TsdbKey::Name(name) => Some(name),
            TsdbKey::Id(_) => None,
        }
    }
}

impl fmt::Display for TsdbKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TsdbKey::Id(id) => write!(f, "{}", id),
            TsdbKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<u64> for TsdbKey {
    fn from(id: u64) -> Self {
        TsdbKey::Id(id)
    }
}

impl From<String> for TsdbKey {
    fn from(name: String) -> Self {
        TsdbKey::Name(name)
    }
}

impl From<&str> for TsdbKey {
    fn from(name: &str) -> Self {
        TsdbKey::Name(name.to_string())
    }
}

/// Tenant tags carried by every store call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantIds {
    pub organization_id: Option<u64>,
    pub referrer: Option<String>,
}

impl TenantIds {
    pub fn for_organization(organization_id: u64) -> Self {
        TenantIds {
            organization_id: Some(organization_id),
            referrer: None,
        }
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// The organization id, or `MissingTenant` when absent
    pub fn require_organization(&self) -> Result<u64, StoreError> {
        self.organization_id.ok_or(StoreError::MissingTenant)
    }
}

/// Per-organization call accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TenantUsage {
    pub reads: u64,
    pub writes: u64,
}

/// Result of a ranged read: one series per distinct input key, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeResult {
    entries: Vec<(TsdbKey, Series)>,
}

impl RangeResult {
    pub fn with_capacity(capacity: usize) -> Self {
        RangeResult {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append a series; a key already present keeps its first position
    pub fn push(&mut self, key: TsdbKey, series: Series) {
        if !self.contains_key(&key) {
            self.entries.push((key, series));
        }
    }

    pub fn contains_key(&self, key: &TsdbKey) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &TsdbKey) -> Option<&Series> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, series)| series)
    }

    pub fn remove(&mut self, key: &TsdbKey) -> Option<Series> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TsdbKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TsdbKey, &Series)> {
        self.entries.iter().map(|(k, s)| (k, s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for RangeResult {
    type Item = (TsdbKey, Series);
    type IntoIter = std::vec::IntoIter<(TsdbKey, Series)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
