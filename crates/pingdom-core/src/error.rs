//! Error types for the reconciliation engine
//!
//! Every error that leaves the engine carries enough context (resource kind,
//! entity id or lookup filter, underlying message) for a caller to act on it.

use thiserror::Error;

use crate::traits::ApiError;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation engine
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete credential combination; the session cannot start
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport-level client construction failure; the session cannot start
    #[error("Client initialization failed: {0}")]
    ClientInit(String),

    /// Non-success response to a remote call
    #[error("Remote API error ({kind}{}): {message}", fmt_id(.id))]
    RemoteApi {
        /// Resource kind the call was made for
        kind: String,
        /// Entity id, when one is known
        id: Option<u64>,
        /// Message reported by the transport
        message: String,
    },

    /// The remote create succeeded but the confirmation read did not.
    ///
    /// The id is surfaced so the caller can adopt or clean up the entity.
    #[error("Partial create ({kind} id {id}): created but not confirmed: {message}")]
    PartialCreate {
        /// Resource kind
        kind: String,
        /// Id assigned by the service
        id: u64,
        /// Message from the failed confirmation call
        message: String,
    },

    /// Exact-match lookup found nothing
    #[error("{kind} not found: {filter}")]
    NotFound {
        /// Lookup kind
        kind: String,
        /// Filter value that matched nothing
        filter: String,
    },

    /// Declared attributes failed descriptor checks
    #[error("Validation error ({kind}): {message}")]
    Validation {
        /// Resource kind
        kind: String,
        /// What failed
        message: String,
    },

    /// No reconciler is registered for the requested kind
    #[error("Unknown resource kind: {0}")]
    UnknownKind(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

fn fmt_id(id: &Option<u64>) -> String {
    match id {
        Some(id) => format!(" id {}", id),
        None => String::new(),
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a client initialization error
    pub fn client_init(msg: impl Into<String>) -> Self {
        Self::ClientInit(msg.into())
    }

    /// Create a remote API error
    pub fn remote(kind: impl Into<String>, id: Option<u64>, message: impl Into<String>) -> Self {
        Self::RemoteApi {
            kind: kind.into(),
            id,
            message: message.into(),
        }
    }

    /// Map a transport failure for `kind`/`id` into the taxonomy
    ///
    /// An entity id reported by the transport takes precedence over `id`.
    pub fn from_api(kind: impl Into<String>, id: Option<u64>, err: ApiError) -> Self {
        match err {
            ApiError::NotFound => Self::remote(kind, id, "not found"),
            ApiError::Failed {
                status,
                message,
                entity_id,
            } => {
                let message = match status {
                    Some(code) => format!("HTTP {}: {}", code, message),
                    None => message,
                };
                Self::remote(kind, entity_id.or(id), message)
            }
        }
    }

    /// Create a "not found" lookup error
    pub fn not_found(kind: impl Into<String>, filter: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            filter: filter.into(),
        }
    }

    /// Create a validation error
    pub fn validation(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Whether the session cannot start because of this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::ClientInit(_))
    }

    /// Entity id carried by this error, if any
    pub fn entity_id(&self) -> Option<u64> {
        match self {
            Self::RemoteApi { id, .. } => *id,
            Self::PartialCreate { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
