//! Client bundle
//!
//! The set of authenticated handles used by one reconciliation session:
//! exactly one primary client and, when secondary credentials resolved, one
//! secondary client. The bundle is built once and never mutated; share it
//! behind an `Arc`.

use std::fmt;
use std::sync::Arc;

use crate::config::CredentialSet;
use crate::error::{Error, Result};
use crate::traits::{ApiClient, ApiClientFactory, ClientTarget};

/// Primary client plus optional secondary client
#[derive(Clone)]
pub struct ClientBundle {
    primary: Arc<dyn ApiClient>,
    secondary: Option<Arc<dyn ApiClient>>,
}

impl ClientBundle {
    /// Build the bundle from resolved credentials
    ///
    /// The secondary client is only attempted when secondary credentials are
    /// present; its failure fails the whole bundle.
    pub fn build(credentials: &CredentialSet, factory: &dyn ApiClientFactory) -> Result<Self> {
        let primary = factory
            .create_primary(&credentials.primary)
            .map_err(|e| wrap_init("primary", e))?;
        tracing::debug!("Primary client ready: {}", primary.client_name());

        let secondary = match &credentials.secondary {
            Some(secondary) if !secondary.username.is_empty() => {
                let client = factory
                    .create_secondary(secondary)
                    .map_err(|e| wrap_init("secondary", e))?;
                tracing::debug!("Secondary client ready: {}", client.client_name());
                Some(client)
            }
            _ => None,
        };

        Ok(Self { primary, secondary })
    }

    /// Assemble a bundle from existing clients
    pub fn new(primary: Arc<dyn ApiClient>, secondary: Option<Arc<dyn ApiClient>>) -> Self {
        Self { primary, secondary }
    }

    /// The token-authenticated client
    pub fn primary(&self) -> &Arc<dyn ApiClient> {
        &self.primary
    }

    /// The org-scoped client, if configured
    pub fn secondary(&self) -> Option<&Arc<dyn ApiClient>> {
        self.secondary.as_ref()
    }

    /// Client for `target`
    ///
    /// Fails with a configuration error naming `kind` when the secondary
    /// client is needed but was not configured.
    pub fn for_target(&self, target: ClientTarget, kind: &str) -> Result<&Arc<dyn ApiClient>> {
        match target {
            ClientTarget::Primary => Ok(&self.primary),
            ClientTarget::Secondary => self.secondary.as_ref().ok_or_else(|| {
                Error::config(format!(
                    "{} requires solarwinds_user and solarwinds_passwd to be configured",
                    kind
                ))
            }),
        }
    }
}

impl fmt::Debug for ClientBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBundle")
            .field("primary", &self.primary.client_name())
            .field("secondary", &self.secondary.as_ref().map(|c| c.client_name()))
            .finish()
    }
}

fn wrap_init(which: &str, err: Error) -> Error {
    match err {
        Error::ClientInit(msg) => Error::client_init(format!("{} client: {}", which, msg)),
        other => Error::client_init(format!("{} client: {}", which, other)),
    }
}
