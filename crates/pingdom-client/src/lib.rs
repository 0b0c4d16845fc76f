// # Pingdom HTTP Transport
//
// reqwest-based `ApiClient` implementations for the two Pingdom APIs:
//
// - **Primary** (API 3.1): bearer token authentication
// - **Extended** (org-scoped): HTTP basic authentication plus an `X-Org-Id`
//   header when an organization id is configured
//
// ## Architectural Constraints
//
// ### Trust Level: Untrusted (transport)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS calls to the configured base URLs only
// - ✅ Unwrap response envelopes (`{"team": {...}}`, `{"teams": [...]}`)
// - ✅ Map HTTP statuses to `ApiError`
//
// **Forbidden Capabilities**:
// - ❌ Retry or back off (callers re-run reconciliation instead)
// - ❌ Cache responses between calls
// - ❌ Spawn tasks or threads
//
// ## Security Requirements
//
// - Tokens and passwords NEVER appear in logs or `Debug` output
// - Construction fails fast on a missing token; no network I/O happens
//   before the first call
//
// ## API Reference
//
// - Checks: `/checks`, envelope `check` / `checks`
// - Teams: `/alerting/teams`, envelope `team` / `teams`
// - Contacts: `/alerting/contacts`, envelope `contact` / `contacts`
// - Maintenance: `/maintenance`, envelope `maintenance` / `maintenance`
// - Occurrences: `/maintenance.occurrences`, envelope `occurrence` / `occurrences`
// - Transaction checks: `/tms/check`, envelope `check` / `checks`
// - Integrations (extended): `/integrations`, envelope `integration` / `integrations`

use async_trait::async_trait;
use pingdom_core::config::{EndpointConfig, PrimaryCredentials, SecondaryCredentials};
use pingdom_core::traits::{ApiClient, ApiClientFactory, ApiError, ApiResult, Endpoint};
use pingdom_core::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Path and envelope keys of one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Route {
    path: &'static str,
    one: &'static str,
    many: &'static str,
}

fn route(endpoint: Endpoint) -> Route {
    let (path, one, many) = match endpoint {
        Endpoint::Checks => ("checks", "check", "checks"),
        Endpoint::Teams => ("alerting/teams", "team", "teams"),
        Endpoint::Contacts => ("alerting/contacts", "contact", "contacts"),
        Endpoint::Maintenance => ("maintenance", "maintenance", "maintenance"),
        Endpoint::Occurrences => ("maintenance.occurrences", "occurrence", "occurrences"),
        Endpoint::TmsChecks => ("tms/check", "check", "checks"),
        Endpoint::Integrations => ("integrations", "integration", "integrations"),
    };
    Route { path, one, many }
}

/// How requests are authenticated
#[derive(Clone)]
enum Auth {
    /// ⚠️ NEVER log this value
    Bearer(String),
    Basic {
        username: String,
        /// ⚠️ NEVER log this value
        password: String,
        org_id: Option<String>,
    },
}

/// Pingdom error body: `{"error": {"statuscode": 400, "errormessage": "..."}}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    statusdesc: Option<String>,
    #[serde(default)]
    errormessage: Option<String>,
}

/// HTTP client for one of the Pingdom APIs
///
/// Passive handle: holds a connection pool and credentials, nothing else.
/// One method call is exactly one HTTP request.
pub struct PingdomClient {
    name: &'static str,
    base_url: String,
    auth: Auth,
    client: reqwest::Client,
}

// Custom Debug implementation that hides credentials
impl std::fmt::Debug for PingdomClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("PingdomClient");
        s.field("name", &self.name).field("base_url", &self.base_url);
        match &self.auth {
            Auth::Bearer(_) => s.field("api_token", &"<REDACTED>"),
            Auth::Basic {
                username, org_id, ..
            } => s
                .field("username", username)
                .field("password", &"<REDACTED>")
                .field("org_id", org_id),
        };
        s.finish()
    }
}

impl PingdomClient {
    /// Token-authenticated client for the primary API
    ///
    /// # Errors
    ///
    /// `Error::ClientInit` if the token is empty or the HTTP client cannot
    /// be built.
    pub fn primary(
        base_url: impl Into<String>,
        api_token: &str,
        timeout: Duration,
    ) -> Result<Self> {
        if api_token.is_empty() {
            return Err(Error::client_init("API token cannot be empty"));
        }
        Self::build("pingdom", base_url.into(), Auth::Bearer(api_token.to_string()), timeout)
    }

    /// Basic-auth, org-scoped client for the extended API
    pub fn extended(
        base_url: impl Into<String>,
        credentials: &SecondaryCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        if credentials.username.is_empty() {
            return Err(Error::client_init("extended API username cannot be empty"));
        }
        let auth = Auth::Basic {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            org_id: credentials.org_id.clone(),
        };
        Self::build("pingdom-ext", base_url.into(), auth, timeout)
    }

    fn build(name: &'static str, base_url: String, auth: Auth, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::client_init(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            client,
        })
    }

    fn url(&self, route: Route, id: Option<u64>) -> String {
        match id {
            Some(id) => format!("{}/{}/{}", self.base_url, route.path, id),
            None => format!("{}/{}", self.base_url, route.path),
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");
        match &self.auth {
            Auth::Bearer(token) => builder.bearer_auth(token),
            Auth::Basic {
                username,
                password,
                org_id,
            } => {
                let builder = builder.basic_auth(username, Some(password));
                match org_id {
                    Some(org) => builder.header("X-Org-Id", org),
                    None => builder,
                }
            }
        }
    }

    /// Send a request and parse the JSON body of a success response
    async fn send(&self, builder: reqwest::RequestBuilder) -> ApiResult<Value> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::failed(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| ApiError::failed(format!("failed to read response: {}", e)))?;
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text)
                .map_err(|e| ApiError::failed(format!("failed to parse response: {}", e)));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        match status.as_u16() {
            404 => Err(ApiError::NotFound),
            code => {
                let message = match code {
                    401 | 403 => format!("authentication failed: {}", error_message(&body)),
                    429 => format!("rate limit exceeded: {}", error_message(&body)),
                    _ => error_message(&body),
                };
                Err(ApiError::status(code, message))
            }
        }
    }
}

/// Human-readable message of an error response
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: ErrorDetail {
                errormessage: Some(message),
                ..
            },
        }) => message,
        Ok(ErrorBody {
            error: ErrorDetail {
                statusdesc: Some(desc),
                ..
            },
        }) => desc,
        _ => body.to_string(),
    }
}

/// Take `key` out of an envelope; bodies without the envelope pass through
fn unwrap_envelope(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut obj) if obj.contains_key(key) => obj.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}

#[async_trait]
impl ApiClient for PingdomClient {
    async fn list(&self, endpoint: Endpoint, query: &[(&str, String)]) -> ApiResult<Vec<Value>> {
        let route = route(endpoint);
        let url = self.url(route, None);
        tracing::debug!("[{}] GET {}", self.name, url);

        let body = self.send(self.request(reqwest::Method::GET, &url).query(query)).await?;
        match unwrap_envelope(body, route.many) {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(ApiError::failed(format!(
                "invalid response format: '{}' is not an array: {}",
                route.many, other
            ))),
        }
    }

    async fn get(&self, endpoint: Endpoint, id: u64) -> ApiResult<Value> {
        let route = route(endpoint);
        let url = self.url(route, Some(id));
        tracing::debug!("[{}] GET {}", self.name, url);

        let body = self.send(self.request(reqwest::Method::GET, &url)).await?;
        Ok(unwrap_envelope(body, route.one))
    }

    async fn create(&self, endpoint: Endpoint, payload: &Value) -> ApiResult<Value> {
        let route = route(endpoint);
        let url = self.url(route, None);
        tracing::debug!("[{}] POST {}", self.name, url);

        let body = self
            .send(self.request(reqwest::Method::POST, &url).json(payload))
            .await?;
        Ok(unwrap_envelope(body, route.one))
    }

    async fn update(&self, endpoint: Endpoint, id: u64, payload: &Value) -> ApiResult<Value> {
        let route = route(endpoint);
        let url = self.url(route, Some(id));
        tracing::debug!("[{}] PUT {}", self.name, url);

        let body = self
            .send(self.request(reqwest::Method::PUT, &url).json(payload))
            .await?;
        Ok(unwrap_envelope(body, route.one))
    }

    async fn delete(&self, endpoint: Endpoint, id: u64) -> ApiResult<()> {
        let url = self.url(route(endpoint), Some(id));
        tracing::debug!("[{}] DELETE {}", self.name, url);

        self.send(self.request(reqwest::Method::DELETE, &url)).await?;
        Ok(())
    }

    fn client_name(&self) -> &'static str {
        self.name
    }
}

/// Factory building HTTP clients from resolved credentials
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory {
    endpoints: EndpointConfig,
}

impl HttpClientFactory {
    pub fn new(endpoints: EndpointConfig) -> Self {
        Self { endpoints }
    }
}

impl ApiClientFactory for HttpClientFactory {
    fn create_primary(&self, credentials: &PrimaryCredentials) -> Result<Arc<dyn ApiClient>> {
        let token = credentials
            .bearer_token()
            .ok_or_else(|| Error::client_init("api_token or api_token_only is required"))?;
        let client =
            PingdomClient::primary(&self.endpoints.api_url, token, self.endpoints.timeout())?;
        Ok(Arc::new(client))
    }

    fn create_secondary(&self, credentials: &SecondaryCredentials) -> Result<Arc<dyn ApiClient>> {
        let client = PingdomClient::extended(
            &self.endpoints.ext_api_url,
            credentials,
            self.endpoints.timeout(),
        )?;
        Ok(Arc::new(client))
    }
}
