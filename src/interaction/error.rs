use thiserror::Error;

use super::component::ComponentType;
use super::key::KeyCodecError;
use super::service::allowed_field_names;
use crate::tsdb::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("The tsdbField must be one of: {fields}", fields = allowed_field_names())]
    InvalidTsdbField,

    #[error(
        "The field componentType is required and must be one of {types}",
        types = ComponentType::allowed_list()
    )]
    InvalidComponentType,

    #[error("{0}")]
    InvalidQuery(String),

    #[error("sentry app '{0}' does not exist")]
    AppNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    KeyCodec(#[from] KeyCodecError),
}

impl InteractionError {
    /// Errors caused by the caller's input rather than by this service
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            InteractionError::InvalidTsdbField
                | InteractionError::InvalidComponentType
                | InteractionError::InvalidQuery(_)
        )
    }
}
