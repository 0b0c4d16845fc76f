// # State Store Trait
//
// Defines the interface for last-known-state persistence.
//
// ## Purpose
//
// The state store lets repeated runs converge by tracking, per resource
// address (e.g. "team.sre"):
// - The resource kind
// - The numeric id the service assigned at creation
// - The attributes observed after the last successful reconciliation
//
// Without it every run would re-create every resource.
//
// ## Usage
//
// ```rust,ignore
// use pingdom_core::traits::{StateRecord, StateStore};
//
// async fn remember(store: &dyn StateStore, id: u64, attrs: Attributes) -> Result<()> {
//     store.set_record("team.sre", &StateRecord::new("team", id, attrs)).await
// }
// ```

use async_trait::async_trait;

use crate::attributes::Attributes;

/// Last-known state of one managed resource
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StateRecord {
    /// Resource kind
    pub kind: String,
    /// Id assigned by the service
    pub id: u64,
    /// Attributes observed after the last reconciliation
    pub attributes: Attributes,
    /// Timestamp of the last reconciliation
    pub last_reconciled: chrono::DateTime<chrono::Utc>,
}

impl StateRecord {
    /// Create a record stamped with the current time
    pub fn new(kind: impl Into<String>, id: u64, attributes: Attributes) -> Self {
        Self {
            kind: kind.into(),
            id,
            attributes,
            last_reconciled: chrono::Utc::now(),
        }
    }
}

/// Trait for state store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Cache state in memory (with explicit flush)
///
/// ## Forbidden Capabilities
/// - ❌ Make remote calls (owned by `Engine`)
/// - ❌ Decide what to reconcile (owned by the caller)
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the state record stored under `address`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(StateRecord))`: The stored record
    /// - `Ok(None)`: No record found
    /// - `Err(Error)`: Storage error
    async fn get_record(&self, address: &str) -> Result<Option<StateRecord>, crate::Error>;

    /// Create or replace the record stored under `address`
    async fn set_record(&self, address: &str, record: &StateRecord) -> Result<(), crate::Error>;

    /// Delete a state record
    ///
    /// Deleting a missing record succeeds.
    async fn delete_record(&self, address: &str) -> Result<(), crate::Error>;

    /// List all addresses in the store
    async fn list_records(&self) -> Result<Vec<String>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
