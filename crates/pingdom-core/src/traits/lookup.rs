//! Read-only lookup ("data source") interface

use async_trait::async_trait;

use super::api_client::{ApiClient, ClientTarget};
use crate::attributes::Attributes;
use crate::error::Result;

/// Outcome of a successful lookup
#[derive(Debug, Clone, PartialEq)]
pub struct LookupResult {
    /// Pseudo-identity for caller-side tracking
    pub id: String,
    /// Resolved attributes
    pub attributes: Attributes,
}

/// Resolves an externally managed entity by natural key
#[async_trait]
pub trait Lookup: Send + Sync {
    /// Lookup kind name (e.g. "team", "teams")
    fn kind(&self) -> &'static str;

    /// Client this lookup lists with
    fn target(&self) -> ClientTarget {
        ClientTarget::Primary
    }

    /// Resolve `filter` (already validated) against the remote collection
    async fn lookup(&self, client: &dyn ApiClient, filter: &Attributes) -> Result<LookupResult>;
}
