//! App interaction counters on top of the counter store
//!
//! Views are counted under the app id. Component interactions are counted
//! under `<slug>:<component type>` keys; this service owns that convention and
//! re-keys read results by component type.

use std::collections::BTreeMap;
use std::slice;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::component::ComponentType;
use super::error::InteractionError;
use super::key::ComponentInteractionKey;
use super::query::{StatsParams, StatsQuery};
use super::registry::{AppRegistry, SentryApp};
use crate::tsdb::{Rollup, Series, TenantIds, TsdbBackend, TsdbKey, TsdbModel, DEFAULT_MAX_POINTS};

/// Models that may be incremented through the interaction endpoint
///
/// This list is the guard; other models stay off-limits even though they
/// parse as valid model names.
pub const INTERACTION_MODELS: [TsdbModel; 2] = [
    TsdbModel::SentryAppViewed,
    TsdbModel::SentryAppComponentInteracted,
];

/// Referrers attached to store calls so logs show which endpoint issued them
pub const STATS_REFERRER: &str = "sentry_apps.interaction.stats";
pub const RECORD_REFERRER: &str = "sentry_apps.interaction.record";

pub fn allowed_field_names() -> String {
    INTERACTION_MODELS
        .iter()
        .map(|model| model.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map a user-supplied field name to an allowlisted model
pub fn interaction_model(field: &str) -> Option<TsdbModel> {
    TsdbModel::from_name(field).filter(|model| INTERACTION_MODELS.contains(model))
}

/// Body of an interaction increment
///
/// Fields are kept as raw JSON so a non-string value is a validation error
/// with the usual detail message rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInteraction {
    #[serde(default)]
    pub tsdb_field: Option<Value>,
    #[serde(default)]
    pub component_type: Option<Value>,
}

impl RecordInteraction {
    pub fn new(tsdb_field: &str, component_type: Option<&str>) -> Self {
        RecordInteraction {
            tsdb_field: Some(Value::from(tsdb_field)),
            component_type: component_type.map(Value::from),
        }
    }
}

/// View and component interaction series for one app
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionStats {
    pub views: Series,
    /// Keyed by component type
    pub component_interactions: BTreeMap<String, Series>,
}

pub struct InteractionService {
    store: Arc<dyn TsdbBackend>,
    registry: Arc<dyn AppRegistry>,
    max_points: u64,
}

impl InteractionService {
    pub fn new(store: Arc<dyn TsdbBackend>, registry: Arc<dyn AppRegistry>) -> Self {
        InteractionService {
            store,
            registry,
            max_points: DEFAULT_MAX_POINTS,
        }
    }

    /// Largest number of buckets per series a stats query may ask for
    pub fn with_max_points(mut self, max_points: u64) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn find_app(&self, slug: &str) -> Result<SentryApp, InteractionError> {
        self.registry
            .find_app_by_slug(slug)
            .ok_or_else(|| InteractionError::AppNotFound(slug.to_string()))
    }

    /// Resolutions usable for both interaction models
    fn supported_rollups(&self) -> Result<Vec<Rollup>, InteractionError> {
        let views = self.store.rollups(TsdbModel::SentryAppViewed)?;
        let components = self.store.rollups(TsdbModel::SentryAppComponentInteracted)?;
        Ok(views
            .iter()
            .filter(|rollup| {
                components
                    .iter()
                    .any(|other| other.resolution_secs == rollup.resolution_secs)
            })
            .copied()
            .collect())
    }

    pub fn parse_query(&self, params: &StatsParams) -> Result<StatsQuery, InteractionError> {
        let rollups = self.supported_rollups()?;
        StatsQuery::parse(params, &rollups, self.store.now(), self.max_points)
    }

    pub fn interactions(
        &self,
        app: &SentryApp,
        query: &StatsQuery,
    ) -> Result<InteractionStats, InteractionError> {
        let tenant = TenantIds::for_organization(app.owner_id).with_referrer(STATS_REFERRER);

        let views_key = TsdbKey::Id(app.id);
        let mut views = self.store.get_range(
            TsdbModel::SentryAppViewed,
            slice::from_ref(&views_key),
            query.since,
            query.until,
            query.resolution,
            &tenant,
        )?;
        let views = views.remove(&views_key).unwrap_or_default();

        let mut keys = Vec::new();
        for component in self.registry.find_app_components(app.id) {
            let key = ComponentInteractionKey::new(&app.slug, &component.component_type)?;
            let key = TsdbKey::Name(key.encode());
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        let mut component_interactions = BTreeMap::new();
        if !keys.is_empty() {
            let range = self.store.get_range(
                TsdbModel::SentryAppComponentInteracted,
                &keys,
                query.since,
                query.until,
                query.resolution,
                &tenant,
            )?;
            for (key, series) in range {
                let name = key.as_name().unwrap_or_default();
                let decoded = ComponentInteractionKey::decode(name)?;
                component_interactions.insert(decoded.component_type().to_string(), series);
            }
        }

        debug!(
            app = %app.slug,
            components = component_interactions.len(),
            "read app interactions"
        );
        Ok(InteractionStats {
            views,
            component_interactions,
        })
    }

    pub fn record(&self, app: &SentryApp, request: &RecordInteraction) -> Result<(), InteractionError> {
        let field = request
            .tsdb_field
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default();
        let model = interaction_model(field).ok_or(InteractionError::InvalidTsdbField)?;

        let key = match model {
            TsdbModel::SentryAppViewed => TsdbKey::Id(app.id),
            TsdbModel::SentryAppComponentInteracted => {
                let component_type = request
                    .component_type
                    .as_ref()
                    .and_then(Value::as_str)
                    .and_then(ComponentType::from_name)
                    .ok_or(InteractionError::InvalidComponentType)?;
                let key = ComponentInteractionKey::new(&app.slug, component_type.as_str())?;
                TsdbKey::Name(key.encode())
            }
            _ => return Err(InteractionError::InvalidTsdbField),
        };

        self.store.incr(
            model,
            &key,
            None,
            1,
            &TenantIds::for_organization(app.owner_id).with_referrer(RECORD_REFERRER),
        )?;
        debug!(app = %app.slug, %model, %key, "recorded app interaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::InMemoryAppRegistry;
    use crate::tsdb::{InMemoryTsdb, ManualClock, ModelRollups, StoreError, Timestamp};

    const NOW: i64 = 1_700_000_000;

    fn app() -> SentryApp {
        SentryApp {
            id: 3,
            slug: "acme-ci".to_string(),
            owner_id: 42,
        }
    }

    fn service_with(registry: InMemoryAppRegistry) -> (InteractionService, Arc<InMemoryTsdb<ManualClock>>) {
        let store = Arc::new(InMemoryTsdb::with_clock(
            ModelRollups::uniform(Rollup::defaults()),
            ManualClock::new(Timestamp::from_secs(NOW as u64)),
        ));
        let service = InteractionService::new(store.clone(), Arc::new(registry));
        (service, store)
    }

    fn service() -> (InteractionService, Arc<InMemoryTsdb<ManualClock>>) {
        let registry = InMemoryAppRegistry::new();
        registry.register_app(app()).unwrap();
        registry.register_component(3, "issue-link").unwrap();
        registry.register_component(3, "stacktrace-link").unwrap();
        service_with(registry)
    }

    fn last_bucket(store: &InMemoryTsdb<ManualClock>, model: TsdbModel, key: TsdbKey) -> u64 {
        let range = store
            .get_range(model, &[key.clone()], NOW, NOW, Some(10), &TenantIds::for_organization(42))
            .unwrap();
        range.get(&key).unwrap()[0].1
    }

    #[test]
    fn test_interaction_model_allowlist() {
        assert_eq!(interaction_model("sentry_app_viewed"), Some(TsdbModel::SentryAppViewed));
        assert_eq!(interaction_model("project"), None);
        assert_eq!(interaction_model("not_a_real_field"), None);
        assert_eq!(
            allowed_field_names(),
            "sentry_app_viewed, sentry_app_component_interacted"
        );
    }

    #[test]
    fn test_record_view() {
        let (service, store) = service();
        service
            .record(&app(), &RecordInteraction::new("sentry_app_viewed", None))
            .unwrap();
        assert_eq!(last_bucket(&store, TsdbModel::SentryAppViewed, TsdbKey::Id(3)), 1);
        assert_eq!(store.tenant_usage(42).writes, 1);
    }

    #[test]
    fn test_record_component_interaction() {
        let (service, store) = service();
        service
            .record(
                &app(),
                &RecordInteraction::new("sentry_app_component_interacted", Some("issue-link")),
            )
            .unwrap();
        assert_eq!(
            last_bucket(
                &store,
                TsdbModel::SentryAppComponentInteracted,
                TsdbKey::from("acme-ci:issue-link")
            ),
            1
        );
    }

    #[test]
    fn test_record_rejects_bad_input() {
        let (service, store) = service();
        let cases = [
            (RecordInteraction::default(), InteractionError::InvalidTsdbField),
            (RecordInteraction::new("project", None), InteractionError::InvalidTsdbField),
            (
                RecordInteraction::new("sentry_app_component_interacted", None),
                InteractionError::InvalidComponentType,
            ),
            (
                RecordInteraction::new("sentry_app_component_interacted", Some("alert-rule-action")),
                InteractionError::InvalidComponentType,
            ),
            (
                RecordInteraction {
                    tsdb_field: Some(Value::from(5)),
                    component_type: None,
                },
                InteractionError::InvalidTsdbField,
            ),
        ];
        for (request, expected) in cases {
            assert_eq!(service.record(&app(), &request), Err(expected));
        }
        assert_eq!(store.cell_count(), 0);
    }

    #[test]
    fn test_interactions_rekeys_by_component_type() {
        let (service, _store) = service();
        service
            .record(&app(), &RecordInteraction::new("sentry_app_viewed", None))
            .unwrap();
        service
            .record(
                &app(),
                &RecordInteraction::new("sentry_app_component_interacted", Some("stacktrace-link")),
            )
            .unwrap();

        let query = StatsQuery {
            since: NOW - 60,
            until: NOW,
            resolution: Some(10),
        };
        let stats = service.interactions(&app(), &query).unwrap();

        assert_eq!(stats.views.len(), 7);
        assert_eq!(stats.views.last(), Some(&(NOW, 1)));
        let keys: Vec<_> = stats.component_interactions.keys().cloned().collect();
        assert_eq!(keys, vec!["issue-link", "stacktrace-link"]);
        assert_eq!(stats.component_interactions["stacktrace-link"].last(), Some(&(NOW, 1)));
        assert!(stats.component_interactions["issue-link"].iter().all(|(_, c)| *c == 0));
    }

    #[test]
    fn test_interactions_without_components() {
        let registry = InMemoryAppRegistry::new();
        registry.register_app(app()).unwrap();
        let (service, _store) = service_with(registry);

        let query = StatsQuery {
            since: NOW,
            until: NOW,
            resolution: None,
        };
        let stats = service.interactions(&app(), &query).unwrap();
        assert_eq!(stats.views, vec![(NOW, 0)]);
        assert!(stats.component_interactions.is_empty());
    }

    #[test]
    fn test_store_errors_propagate() {
        let store = Arc::new(InMemoryTsdb::with_clock(
            ModelRollups::only(&[TsdbModel::SentryAppViewed], Rollup::defaults()),
            ManualClock::new(Timestamp::from_secs(NOW as u64)),
        ));
        let registry = InMemoryAppRegistry::new();
        registry.register_app(app()).unwrap();
        let service = InteractionService::new(store, Arc::new(registry));

        let err = service
            .record(
                &app(),
                &RecordInteraction::new("sentry_app_component_interacted", Some("issue-link")),
            )
            .unwrap_err();
        assert_eq!(
            err,
            InteractionError::Store(StoreError::UnknownModel(
                "sentry_app_component_interacted".to_string()
            ))
        );
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_parse_query_honors_point_limit() {
        let (service, _store) = service();
        let params = StatsParams {
            since: Some((NOW - 3600).to_string()),
            until: Some(NOW.to_string()),
            resolution: Some("10s".to_string()),
        };
        assert!(service.parse_query(&params).is_ok());

        let service = service.with_max_points(100);
        assert!(matches!(
            service.parse_query(&params),
            Err(InteractionError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_find_app() {
        let (service, _store) = service();
        assert_eq!(service.find_app("acme-ci"), Ok(app()));
        assert_eq!(
            service.find_app("nope"),
            Err(InteractionError::AppNotFound("nope".to_string()))
        );
    }
}
