//! Declarative manifest
//!
//! ```json
//! {
//!   "provider": { "api_token": "..." },
//!   "resources": [
//!     { "address": "team.sre", "kind": "team", "attributes": { "name": "SRE" } }
//!   ],
//!   "lookups": [
//!     { "address": "data.team.ops", "kind": "team", "filter": { "name": "Ops" } }
//!   ]
//! }
//! ```
//!
//! `provider` is the explicit configuration layer; the environment still
//! wins over it.

use anyhow::{Context, Result};
use pingdom_core::{Attributes, ProviderConfig};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub resources: Vec<DeclaredResource>,

    #[serde(default)]
    pub lookups: Vec<DeclaredLookup>,
}

/// One managed resource
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclaredResource {
    /// Stable key of the resource across runs
    pub address: String,
    pub kind: String,
    #[serde(default)]
    pub attributes: Attributes,
}

/// One lookup ("data source")
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclaredLookup {
    /// Defaults to `data.<kind>`
    #[serde(default)]
    pub address: Option<String>,
    pub kind: String,
    #[serde(default)]
    pub filter: Attributes,
}

impl DeclaredLookup {
    pub fn address(&self) -> String {
        self.address
            .clone()
            .unwrap_or_else(|| format!("data.{}", self.kind))
    }
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid manifest {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(contents)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Addresses must be non-empty and unique across resources and lookups
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let addresses = self
            .resources
            .iter()
            .map(|r| r.address.clone())
            .chain(self.lookups.iter().map(DeclaredLookup::address));

        for address in addresses {
            if address.trim().is_empty() {
                anyhow::bail!("resource address cannot be empty");
            }
            if !seen.insert(address.clone()) {
                anyhow::bail!("duplicate address '{}'", address);
            }
        }
        Ok(())
    }

    /// Whether `address` is declared as a managed resource
    pub fn declares(&self, address: &str) -> bool {
        self.resources.iter().any(|r| r.address == address)
    }
}
