// Error codes and the unified error type for connection handling.
//
// `ErrorCode` is the stable, serializable identifier; `ConnectError` carries
// the context. Flows that render errors to users match on `code()`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionKey;

/// Stable error identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ProviderNotFound,
    ProviderAlreadyRegistered,
    DuplicateConnection,
    NoSuchConnection,
    NotConnected,
    InvalidUserId,
    CollaboratorsDetached,
    InvalidSessionData,
    SessionUnavailable,
    ProviderApiError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::ProviderNotFound => "Provider not found",
            Self::ProviderAlreadyRegistered => "Provider already registered",
            Self::DuplicateConnection => "This account is already connected",
            Self::NoSuchConnection => "Connection not found",
            Self::NotConnected => "Not connected to provider",
            Self::InvalidUserId => "Invalid user id",
            Self::CollaboratorsDetached => "Sign-in attempt is not attached",
            Self::InvalidSessionData => "Invalid session data",
            Self::SessionUnavailable => "Session unavailable",
            Self::ProviderApiError => "Provider API error",
        };
        write!(f, "{msg}")
    }
}

/// Errors raised while creating, storing or linking provider connections.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// No connection factory is registered for the provider id.
    #[error("No connection factory registered for provider '{provider_id}'")]
    UnregisteredProvider { provider_id: String },

    #[error("A connection factory for provider '{0}' is already registered")]
    DuplicateFactory(String),

    /// The user already holds a connection to this provider account.
    #[error("The connection {0} already exists")]
    DuplicateConnection(ConnectionKey),

    #[error("No connection {0}")]
    NoSuchConnection(ConnectionKey),

    #[error("Not connected to provider '{provider_id}'")]
    NotConnected { provider_id: String },

    #[error("User id must not be empty")]
    InvalidUserId,

    /// An operation needing the injected collaborators ran before they were
    /// re-attached after deserialization.
    #[error("{0} is not attached to its collaborators")]
    Detached(&'static str),

    #[error("Session data could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Raised by network or database backed `SessionStore`s.
    #[error("Session store error: {0}")]
    Session(String),

    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

impl ConnectError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnregisteredProvider { .. } => ErrorCode::ProviderNotFound,
            Self::DuplicateFactory(_) => ErrorCode::ProviderAlreadyRegistered,
            Self::DuplicateConnection(_) => ErrorCode::DuplicateConnection,
            Self::NoSuchConnection(_) => ErrorCode::NoSuchConnection,
            Self::NotConnected { .. } => ErrorCode::NotConnected,
            Self::InvalidUserId => ErrorCode::InvalidUserId,
            Self::Detached(_) => ErrorCode::CollaboratorsDetached,
            Self::Serialization(_) => ErrorCode::InvalidSessionData,
            Self::Session(_) => ErrorCode::SessionUnavailable,
            Self::Api(_) => ErrorCode::ProviderApiError,
        }
    }

    /// Whether the calling flow should present this error to the user
    /// instead of failing the request.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::DuplicateConnection(_) | Self::NoSuchConnection(_) | Self::NotConnected { .. }
        )
    }

    /// Build a JSON body for the error.
    pub fn to_json(&self) -> serde_json::Value {
        let code = self.code();
        serde_json::json!({
            "code": code,
            "message": code.to_string(),
        })
    }
}

/// Unified result type for connection operations.
pub type Result<T> = std::result::Result<T, ConnectError>;
