// # API Client Trait
//
// Defines the interface to the remote monitoring service.
//
// ## Implementations
//
// - Pingdom API 3.1 (token auth) and the extended org-scoped API
//   (username/password): `pingdom-client` crate
//
// ## Usage
//
// ```rust,ignore
// use pingdom_core::traits::{ApiClient, Endpoint};
//
// async fn count_teams(client: &dyn ApiClient) -> usize {
//     client.list(Endpoint::Teams, &[]).await.map(|t| t.len()).unwrap_or(0)
// }
// ```

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::config::{PrimaryCredentials, SecondaryCredentials};

/// Remote collection an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Uptime checks
    Checks,
    /// Alerting teams
    Teams,
    /// Alerting contacts
    Contacts,
    /// Integrations (extended API)
    Integrations,
    /// Maintenance windows
    Maintenance,
    /// Maintenance window occurrences
    Occurrences,
    /// Transaction (synthetic) checks
    TmsChecks,
}

impl Endpoint {
    /// Stable name, used in logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Checks => "checks",
            Endpoint::Teams => "teams",
            Endpoint::Contacts => "contacts",
            Endpoint::Integrations => "integrations",
            Endpoint::Maintenance => "maintenance",
            Endpoint::Occurrences => "occurrences",
            Endpoint::TmsChecks => "tms_checks",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which client of the bundle an operation needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientTarget {
    /// Token-authenticated client
    Primary,
    /// Username/password, org-scoped client
    Secondary,
}

/// Transport-level failure
///
/// The transport's own errors are opaque; only "not found" is distinguished.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The entity (or collection) does not exist
    #[error("not found")]
    NotFound,

    /// Any other non-success outcome
    #[error("{message}")]
    Failed {
        /// HTTP status, when the transport is HTTP
        status: Option<u16>,
        /// Message reported by the transport
        message: String,
        /// Id of an entity the service reports as created despite the failure
        entity_id: Option<u64>,
    },
}

impl ApiError {
    /// Failure with only a message
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            status: None,
            message: message.into(),
            entity_id: None,
        }
    }

    /// Failure with an HTTP status
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Failed {
            status: Some(status),
            message: message.into(),
            entity_id: None,
        }
    }

    /// Whether this is the "not found" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Result type for transport calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Trait for remote API clients
///
/// Payloads and responses are unwrapped entity objects; envelope handling
/// (`{"team": {...}}`) belongs to the implementation.
///
/// # Thread Safety
///
/// Clients are passive handles shared read-only by every reconciler of a
/// session. They must not hold mutable state between calls.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ One remote call per method invocation
/// - ✅ Map transport failures to [`ApiError`]
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (callers re-run reconciliation instead)
/// - ❌ Cache responses (every read is a fresh remote call)
/// - ❌ Spawn tasks
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// List every entity of a collection, in the order the service returns
    async fn list(&self, endpoint: Endpoint, query: &[(&str, String)]) -> ApiResult<Vec<Value>>;

    /// Fetch one entity by id
    ///
    /// Returns `Err(ApiError::NotFound)` if the entity does not exist.
    async fn get(&self, endpoint: Endpoint, id: u64) -> ApiResult<Value>;

    /// Create an entity; returns the created entity (at least its id)
    async fn create(&self, endpoint: Endpoint, payload: &Value) -> ApiResult<Value>;

    /// Partially update an entity
    async fn update(&self, endpoint: Endpoint, id: u64, payload: &Value) -> ApiResult<Value>;

    /// Delete an entity
    ///
    /// Returns `Err(ApiError::NotFound)` if the entity was already absent.
    async fn delete(&self, endpoint: Endpoint, id: u64) -> ApiResult<()>;

    /// Client name (for logging/debugging)
    fn client_name(&self) -> &'static str;
}

/// Helper trait for constructing API clients from resolved credentials
///
/// Construction must not perform network I/O.
pub trait ApiClientFactory: Send + Sync {
    /// Build the token-authenticated client
    fn create_primary(
        &self,
        credentials: &PrimaryCredentials,
    ) -> Result<Arc<dyn ApiClient>, crate::Error>;

    /// Build the username/password, org-scoped client
    fn create_secondary(
        &self,
        credentials: &SecondaryCredentials,
    ) -> Result<Arc<dyn ApiClient>, crate::Error>;
}
