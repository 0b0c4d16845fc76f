//! Core traits for the reconciliation engine
//!
//! - [`ApiClient`]: Remote calls against one API (primary or extended)
//! - [`Resource`]: Per-kind translation between attributes and wire shape
//! - [`Lookup`]: Read-only resolution of existing entities by natural key
//! - [`StateStore`]: Last-known-state persistence

pub mod api_client;
pub mod lookup;
pub mod resource;
pub mod state_store;

pub use api_client::{ApiClient, ApiClientFactory, ApiError, ApiResult, ClientTarget, Endpoint};
pub use lookup::{Lookup, LookupResult};
pub use resource::Resource;
pub use state_store::{StateRecord, StateStore};
