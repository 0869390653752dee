//! Integration app registry
//!
//! Lookup of apps by slug and of the UI components each app registered.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::key::DELIMITER;

/// An integration app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentryApp {
    pub id: u64,
    pub slug: String,
    /// Organization that owns the app; tenant for every counter call
    pub owner_id: u64,
}

/// A UI component registered by an app
///
/// `component_type` is the registered string as-is and may name types that
/// are not eligible for interaction counting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppComponent {
    pub app_id: u64,
    pub component_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("app id {0} is already registered")]
    DuplicateId(u64),

    #[error("app slug '{0}' is already registered")]
    DuplicateSlug(String),

    #[error("app slug '{0}' must be non-empty and must not contain ':'")]
    InvalidSlug(String),

    #[error("component type '{0}' must be non-empty and must not contain ':'")]
    InvalidComponentType(String),

    #[error("app id {0} is not registered")]
    UnknownApp(u64),
}

pub trait AppRegistry: Send + Sync {
    fn find_app_by_slug(&self, slug: &str) -> Option<SentryApp>;

    fn find_app_components(&self, app_id: u64) -> Vec<AppComponent>;
}

#[derive(Default)]
struct RegistryState {
    apps: HashMap<u64, SentryApp>,
    slugs: HashMap<String, u64>,
    components: HashMap<u64, Vec<AppComponent>>,
}

/// Registry held in memory, seeded at bootstrap
#[derive(Default)]
pub struct InMemoryAppRegistry {
    state: RwLock<RegistryState>,
}

impl InMemoryAppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_app(&self, app: SentryApp) -> Result<(), RegistryError> {
        if !is_valid_part(&app.slug) {
            return Err(RegistryError::InvalidSlug(app.slug));
        }

        let mut state = self.state.write();
        if state.apps.contains_key(&app.id) {
            return Err(RegistryError::DuplicateId(app.id));
        }
        if state.slugs.contains_key(&app.slug) {
            return Err(RegistryError::DuplicateSlug(app.slug));
        }
        state.slugs.insert(app.slug.clone(), app.id);
        state.apps.insert(app.id, app);
        Ok(())
    }

    pub fn register_component(&self, app_id: u64, component_type: &str) -> Result<(), RegistryError> {
        if !is_valid_part(component_type) {
            return Err(RegistryError::InvalidComponentType(component_type.to_string()));
        }

        let mut state = self.state.write();
        if !state.apps.contains_key(&app_id) {
            return Err(RegistryError::UnknownApp(app_id));
        }
        state.components.entry(app_id).or_default().push(AppComponent {
            app_id,
            component_type: component_type.to_string(),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.state.read().apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AppRegistry for InMemoryAppRegistry {
    fn find_app_by_slug(&self, slug: &str) -> Option<SentryApp> {
        let state = self.state.read();
        let id = state.slugs.get(slug)?;
        state.apps.get(id).cloned()
    }

    fn find_app_components(&self, app_id: u64) -> Vec<AppComponent> {
        self.state
            .read()
            .components
            .get(&app_id)
            .cloned()
            .unwrap_or_default()
    }
}

fn is_valid_part(value: &str) -> bool {
    !value.is_empty() && !value.contains(DELIMITER)
}
