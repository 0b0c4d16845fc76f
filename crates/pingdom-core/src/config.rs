//! Configuration types and credential resolution
//!
//! Credentials are resolved as a layered merge:
//!
//! ```text
//! explicit ProviderConfig ──► ConfigLayer (explicit)
//!                                   │
//! process environment   ──► ConfigLayer (environment) ──► CredentialSet
//! ```
//!
//! Environment values win over explicit values. Secondary user and password
//! are only ever taken from the environment as a pair.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable overriding `api_token`
pub const ENV_API_TOKEN: &str = "PINGDOM_API_TOKEN";
/// Environment variable overriding `api_token_only`
pub const ENV_API_TOKEN_ONLY: &str = "PINGDOM_API_TOKEN_ONLY";
/// Environment variable overriding `solarwinds_user`
pub const ENV_SOLARWINDS_USER: &str = "SOLARWINDS_USER";
/// Environment variable overriding `solarwinds_passwd`
pub const ENV_SOLARWINDS_PASSWD: &str = "SOLARWINDS_PASSWD";
/// Environment variable overriding `solarwinds_org_id`
pub const ENV_SOLARWINDS_ORG_ID: &str = "SOLARWINDS_ORG_ID";

/// Default base URL of the primary API
pub const DEFAULT_API_URL: &str = "https://api.pingdom.com/api/3.1";

/// Default base URL of the extended (org-scoped) API
pub const DEFAULT_EXT_API_URL: &str = "https://my.pingdom.com/api/3.1";

/// Explicitly configured provider options
///
/// All options are optional; any of them can be supplied (or overridden)
/// through the environment.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Primary API token
    #[serde(default)]
    pub api_token: Option<String>,

    /// Alternative primary API token
    #[serde(default)]
    pub api_token_only: Option<String>,

    /// Extended API username
    #[serde(default)]
    pub solarwinds_user: Option<String>,

    /// Extended API password
    #[serde(default)]
    pub solarwinds_passwd: Option<String>,

    /// Extended API organization id
    #[serde(default)]
    pub solarwinds_org_id: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_token", &redact(&self.api_token))
            .field("api_token_only", &redact(&self.api_token_only))
            .field("solarwinds_user", &self.solarwinds_user)
            .field("solarwinds_passwd", &redact(&self.solarwinds_passwd))
            .field("solarwinds_org_id", &self.solarwinds_org_id)
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve this configuration against the process environment
    pub fn resolve(&self) -> Result<CredentialSet> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve this configuration against an arbitrary environment lookup
    pub fn resolve_with<F>(&self, lookup: F) -> Result<CredentialSet>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = ConfigLayer::from_config(self);
        let environment = ConfigLayer::from_env_lookup(lookup)?;
        explicit.merge(environment).into_credentials()
    }
}

/// One layer of credential values
///
/// Empty strings are treated as absent so that `VAR=` in the environment
/// does not override an explicit value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    api_token: Option<String>,
    api_token_only: Option<String>,
    secondary: Option<(String, String)>,
    secondary_org_id: Option<String>,
    partial_secondary: Option<(Option<String>, Option<String>)>,
}

impl fmt::Debug for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLayer")
            .field("api_token", &redact(&self.api_token))
            .field("api_token_only", &redact(&self.api_token_only))
            .field("secondary_user", &self.secondary.as_ref().map(|(u, _)| u))
            .field("secondary_org_id", &self.secondary_org_id)
            .finish()
    }
}

impl ConfigLayer {
    /// Layer built from explicit configuration
    pub fn from_config(config: &ProviderConfig) -> Self {
        let user = non_empty(config.solarwinds_user.clone());
        let passwd = non_empty(config.solarwinds_passwd.clone());
        let (secondary, partial_secondary) = pair(user, passwd);

        Self {
            api_token: non_empty(config.api_token.clone()),
            api_token_only: non_empty(config.api_token_only.clone()),
            secondary,
            secondary_org_id: non_empty(config.solarwinds_org_id.clone()),
            partial_secondary,
        }
    }

    /// Layer built from an environment lookup
    ///
    /// A username without a password (or the reverse) in the environment is
    /// rejected immediately rather than being merged with explicit values.
    pub fn from_env_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let user = non_empty(lookup(ENV_SOLARWINDS_USER));
        let passwd = non_empty(lookup(ENV_SOLARWINDS_PASSWD));
        let (secondary, partial) = pair(user, passwd);
        if partial.is_some() {
            return Err(Error::config("user and password must be present together"));
        }

        Ok(Self {
            api_token: non_empty(lookup(ENV_API_TOKEN)),
            api_token_only: non_empty(lookup(ENV_API_TOKEN_ONLY)),
            secondary,
            secondary_org_id: non_empty(lookup(ENV_SOLARWINDS_ORG_ID)),
            partial_secondary: None,
        })
    }

    /// Merge `other` on top of `self`; values present in `other` win
    pub fn merge(self, other: ConfigLayer) -> ConfigLayer {
        // A complete secondary pair from the upper layer replaces whatever the
        // lower layer had, including a partial pair.
        let (secondary, partial_secondary) = match other.secondary {
            Some(pair) => (Some(pair), None),
            None => (self.secondary, self.partial_secondary),
        };

        ConfigLayer {
            api_token: other.api_token.or(self.api_token),
            api_token_only: other.api_token_only.or(self.api_token_only),
            secondary,
            secondary_org_id: other.secondary_org_id.or(self.secondary_org_id),
            partial_secondary,
        }
    }

    /// Validate the merged layer into a credential set
    pub fn into_credentials(self) -> Result<CredentialSet> {
        if self.partial_secondary.is_some() {
            return Err(Error::config("user and password must be present together"));
        }

        let secondary = self.secondary.map(|(username, password)| SecondaryCredentials {
            username,
            password,
            org_id: self.secondary_org_id.clone(),
        });

        if secondary.is_none() && self.secondary_org_id.is_some() {
            tracing::debug!("Organization id configured without extended credentials, ignoring");
        }

        Ok(CredentialSet {
            primary: PrimaryCredentials {
                api_token: self.api_token,
                api_token_only: self.api_token_only,
            },
            secondary,
        })
    }
}

/// Resolved, validated credentials for one reconciliation session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSet {
    /// Token credentials for the primary API
    pub primary: PrimaryCredentials,
    /// Username/password credentials for the extended API, when configured
    pub secondary: Option<SecondaryCredentials>,
}

/// Token credentials for the primary API
#[derive(Clone, PartialEq, Eq)]
pub struct PrimaryCredentials {
    /// API token
    pub api_token: Option<String>,
    /// Alternative API token
    pub api_token_only: Option<String>,
}

impl PrimaryCredentials {
    /// Token to present to the API; `api_token` takes precedence
    pub fn bearer_token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .or(self.api_token_only.as_deref())
    }
}

impl fmt::Debug for PrimaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimaryCredentials")
            .field("api_token", &redact(&self.api_token))
            .field("api_token_only", &redact(&self.api_token_only))
            .finish()
    }
}

/// Username/password credentials for the extended API
#[derive(Clone, PartialEq, Eq)]
pub struct SecondaryCredentials {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
    /// Organization the session is scoped to
    pub org_id: Option<String>,
}

impl fmt::Debug for SecondaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecondaryCredentials")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("org_id", &self.org_id)
            .finish()
    }
}

/// Transport endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the primary API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL of the extended API
    #[serde(default = "default_ext_api_url")]
    pub ext_api_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl EndpointConfig {
    /// Validate the endpoint configuration
    pub fn validate(&self) -> Result<()> {
        for url in [&self.api_url, &self.ext_api_url] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(Error::config(format!(
                    "API URL must use HTTP or HTTPS scheme. Got: {}",
                    url
                )));
            }
        }
        if !(1..=300).contains(&self.timeout_secs) {
            return Err(Error::config(format!(
                "HTTP timeout must be between 1 and 300 seconds. Got: {}",
                self.timeout_secs
            )));
        }
        Ok(())
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ext_api_url: default_ext_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the reconcile event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<()> {
        if self.event_channel_capacity == 0 {
            return Err(Error::config("event_channel_capacity must be at least 1"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_ext_api_url() -> String {
    DEFAULT_EXT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

type Pair = (Option<(String, String)>, Option<(Option<String>, Option<String>)>);

fn pair(user: Option<String>, passwd: Option<String>) -> Pair {
    match (user, passwd) {
        (Some(u), Some(p)) => (Some((u, p)), None),
        (None, None) => (None, None),
        (u, p) => (None, Some((u, p))),
    }
}

fn redact(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "<REDACTED>",
        None => "<unset>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn environment_token_wins_over_explicit() {
        let config = ProviderConfig {
            api_token: Some("explicit".to_string()),
            ..Default::default()
        };
        let creds = config
            .resolve_with(env(&[(ENV_API_TOKEN, "from-env")]))
            .unwrap();
        assert_eq!(creds.primary.api_token.as_deref(), Some("from-env"));
    }

    #[test]
    fn explicit_token_kept_without_environment() {
        let config = ProviderConfig {
            api_token_only: Some("only".to_string()),
            ..Default::default()
        };
        let creds = config.resolve_with(env(&[])).unwrap();
        assert_eq!(creds.primary.api_token_only.as_deref(), Some("only"));
        assert_eq!(creds.primary.bearer_token(), Some("only"));
        assert!(creds.secondary.is_none());
    }

    #[test]
    fn env_user_without_password_is_rejected() {
        let config = ProviderConfig {
            solarwinds_user: Some("a".to_string()),
            solarwinds_passwd: Some("b".to_string()),
            ..Default::default()
        };
        let err = config
            .resolve_with(env(&[(ENV_SOLARWINDS_USER, "env-user")]))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("present together"));
    }

    #[test]
    fn env_password_without_user_is_rejected() {
        let err = ProviderConfig::default()
            .resolve_with(env(&[(ENV_SOLARWINDS_PASSWD, "pw")]))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn explicit_partial_secondary_is_rejected() {
        let config = ProviderConfig {
            api_token: Some("t".to_string()),
            solarwinds_passwd: Some("pw".to_string()),
            ..Default::default()
        };
        let err = config.resolve_with(env(&[])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn env_pair_replaces_explicit_partial_pair() {
        let config = ProviderConfig {
            solarwinds_user: Some("explicit".to_string()),
            ..Default::default()
        };
        let creds = config
            .resolve_with(env(&[
                (ENV_SOLARWINDS_USER, "env-user"),
                (ENV_SOLARWINDS_PASSWD, "env-pw"),
            ]))
            .unwrap();
        let secondary = creds.secondary.unwrap();
        assert_eq!(secondary.username, "env-user");
        assert_eq!(secondary.password, "env-pw");
    }

    #[test]
    fn env_org_id_always_overrides() {
        let config = ProviderConfig {
            solarwinds_user: Some("u".to_string()),
            solarwinds_passwd: Some("p".to_string()),
            solarwinds_org_id: Some("1".to_string()),
            ..Default::default()
        };
        let creds = config
            .resolve_with(env(&[(ENV_SOLARWINDS_ORG_ID, "99")]))
            .unwrap();
        assert_eq!(creds.secondary.unwrap().org_id.as_deref(), Some("99"));
    }

    #[test]
    fn empty_env_values_do_not_override() {
        let config = ProviderConfig {
            api_token: Some("explicit".to_string()),
            ..Default::default()
        };
        let creds = config
            .resolve_with(env(&[(ENV_API_TOKEN, "")]))
            .unwrap();
        assert_eq!(creds.primary.api_token.as_deref(), Some("explicit"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = ProviderConfig {
            api_token: Some("secret_token_12345".to_string()),
            solarwinds_user: Some("alice".to_string()),
            solarwinds_passwd: Some("hunter2".to_string()),
            ..Default::default()
        };
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("secret_token_12345"));
        assert!(!debug_str.contains("hunter2"));
        assert!(debug_str.contains("alice"));

        let creds = config.resolve_with(env(&[])).unwrap();
        let debug_str = format!("{:?}", creds);
        assert!(!debug_str.contains("secret_token_12345"));
        assert!(!debug_str.contains("hunter2"));
    }

    #[test]
    fn endpoint_config_validation() {
        assert!(EndpointConfig::default().validate().is_ok());

        let bad_scheme = EndpointConfig {
            api_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(bad_scheme.validate().is_err());

        let bad_timeout = EndpointConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(bad_timeout.validate().is_err());
    }
}
