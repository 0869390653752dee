//! App interaction façade
//!
//! Validates interaction requests and maps them onto the counter store:
//!
//! - **Allowlisted models**: only app views and component interactions
//! - **Component key codec**: `<slug>:<component type>` keys, owned here
//! - **Stats queries**: `since`/`until`/`resolution` parsing
//! - **App registry**: apps and their registered UI components

mod component;
mod error;
mod key;
mod query;
mod registry;
mod service;

pub use component::ComponentType;
pub use error::InteractionError;
pub use key::{ComponentInteractionKey, KeyCodecError, DELIMITER};
pub use query::{StatsParams, StatsQuery};
pub use registry::{AppComponent, AppRegistry, InMemoryAppRegistry, RegistryError, SentryApp};
pub use service::{
    allowed_field_names, interaction_model, InteractionService, InteractionStats,
    RecordInteraction, INTERACTION_MODELS,
};
