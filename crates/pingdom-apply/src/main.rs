// # pingdom-apply
//
// Converges a declarative manifest of Pingdom resources against the live
// service, once, and prints the resulting state as JSON.
//
// This binary is a THIN integration layer: reconciliation logic lives in
// pingdom-core, HTTP in pingdom-client. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Resolving credentials and building the client bundle
// 3. Loading the manifest and the state file
// 4. Running one converge pass
//
// ## Configuration
//
// ### Run
// - `PINGDOM_MANIFEST`: Path to the JSON manifest (required)
// - `PINGDOM_STATE_PATH`: Path to the state file (default: pingdom-state.json)
// - `PINGDOM_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ### Endpoints
// - `PINGDOM_API_URL`: Primary API base URL
// - `PINGDOM_EXT_API_URL`: Extended API base URL
// - `PINGDOM_HTTP_TIMEOUT_SECS`: Per-request timeout, 1..=300 (default: 30)
//
// ### Credentials
// - `PINGDOM_API_TOKEN` / `PINGDOM_API_TOKEN_ONLY`: Primary API token
// - `SOLARWINDS_USER` / `SOLARWINDS_PASSWD`: Extended API credentials (as a pair)
// - `SOLARWINDS_ORG_ID`: Extended API organization
//
// Credentials may also be given in the manifest's `provider` block; the
// environment wins.
//
// ## Example
//
// ```bash
// export PINGDOM_API_TOKEN=your_token
// export PINGDOM_MANIFEST=./monitoring.json
// export PINGDOM_STATE_PATH=/var/lib/pingdom/state.json
//
// pingdom-apply
// ```

mod apply;
mod manifest;

use anyhow::{Context, Result};
use pingdom_client::HttpClientFactory;
use pingdom_core::config::{DEFAULT_API_URL, DEFAULT_EXT_API_URL};
use pingdom_core::{
    ClientBundle, Engine, EngineConfig, EndpointConfig, FileStateStore, ReconcileEvent,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

use crate::manifest::Manifest;

/// Exit codes for different termination scenarios
///
/// - 0: Every resource converged
/// - 1: Configuration or startup error
/// - 2: At least one resource failed to converge
#[derive(Debug, Clone, Copy)]
enum ApplyExitCode {
    Converged = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<ApplyExitCode> for ExitCode {
    fn from(code: ApplyExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    manifest_path: PathBuf,
    state_path: PathBuf,
    endpoints: EndpointConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let manifest_path = lookup("PINGDOM_MANIFEST").filter(|p| !p.is_empty()).context(
            "PINGDOM_MANIFEST is required. Set it via: export PINGDOM_MANIFEST=./monitoring.json",
        )?;

        let timeout_secs = match lookup("PINGDOM_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse().with_context(|| {
                format!("PINGDOM_HTTP_TIMEOUT_SECS must be a number. Got: {}", raw)
            })?,
            None => EndpointConfig::default().timeout_secs,
        };

        Ok(Self {
            manifest_path: PathBuf::from(manifest_path),
            state_path: PathBuf::from(
                lookup("PINGDOM_STATE_PATH").unwrap_or_else(|| "pingdom-state.json".to_string()),
            ),
            endpoints: EndpointConfig {
                api_url: lookup("PINGDOM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                ext_api_url: lookup("PINGDOM_EXT_API_URL")
                    .unwrap_or_else(|| DEFAULT_EXT_API_URL.to_string()),
                timeout_secs,
            },
            log_level: lookup("PINGDOM_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if !self.manifest_path.exists() {
            anyhow::bail!(
                "PINGDOM_MANIFEST does not exist: {}",
                self.manifest_path.display()
            );
        }

        if self.state_path.as_os_str().is_empty() {
            anyhow::bail!("PINGDOM_STATE_PATH cannot be empty");
        }

        self.endpoints.validate()?;

        if self.endpoints.api_url.starts_with("http://") {
            eprintln!(
                "WARNING: PINGDOM_API_URL uses HTTP (not HTTPS). \
                 The API token will be sent in clear text."
            );
        }

        self.level()?;
        Ok(())
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "PINGDOM_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ApplyExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return ApplyExitCode::ConfigError.into();
    }

    let log_level = config.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ApplyExitCode::ConfigError.into();
    }

    let manifest = match Manifest::load(&config.manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("{:#}", e);
            return ApplyExitCode::ConfigError.into();
        }
    };
    info!(
        "Manifest loaded: {} resource(s), {} lookup(s)",
        manifest.resources.len(),
        manifest.lookups.len()
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ApplyExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(config, manifest)).into()
}

/// Build the session and run one converge pass
async fn run(config: Config, manifest: Manifest) -> ApplyExitCode {
    let credentials = match manifest.provider.resolve() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("{}", e);
            return ApplyExitCode::ConfigError;
        }
    };
    debug!("Resolved credentials: {:?}", credentials);

    let factory = HttpClientFactory::new(config.endpoints.clone());
    let clients = match ClientBundle::build(&credentials, &factory) {
        Ok(clients) => Arc::new(clients),
        Err(e) => {
            error!("{}", e);
            return ApplyExitCode::ConfigError;
        }
    };
    info!("Clients ready: {:?}", clients);

    match converge(config, manifest, clients).await {
        Ok(true) => ApplyExitCode::Converged,
        Ok(false) => ApplyExitCode::RuntimeError,
        Err(e) => {
            error!("{:#}", e);
            if e.downcast_ref::<pingdom_core::Error>().is_some_and(|e| e.is_fatal()) {
                ApplyExitCode::ConfigError
            } else {
                ApplyExitCode::RuntimeError
            }
        }
    }
}

async fn converge(config: Config, manifest: Manifest, clients: Arc<ClientBundle>) -> Result<bool> {
    let (engine, mut events) = Engine::builtin(clients, &EngineConfig::default())?;
    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let store = FileStateStore::new(&config.state_path).await?;
    info!("State loaded from {}", store.path().display());

    let outcome = apply::converge(&engine, &store, &manifest).await;
    drop(engine);
    if let Err(e) = event_logger.await {
        error!("Event logger failed: {}", e);
    }
    let outcome = outcome?;

    let rendered = apply::render(&store, &outcome.lookups).await?;
    println!("{}", serde_json::to_string_pretty(&rendered)?);

    info!("Converge finished: {}", outcome.summary);
    Ok(outcome.summary.is_success())
}

fn log_event(event: &ReconcileEvent) {
    match event {
        ReconcileEvent::Transition { kind, id, from, to } => {
            debug!("{} {:?}: {} -> {}", kind, id, from, to)
        }
        ReconcileEvent::Failed { kind, id, from, error } => {
            debug!("{} {:?}: failed while {}: {}", kind, id, from, error)
        }
        ReconcileEvent::Vanished { kind, id } => debug!("{} {} vanished", kind, id),
        ReconcileEvent::LookupResolved { kind, id } => debug!("lookup {} -> {}", kind, id),
        ReconcileEvent::LookupFailed { kind, error } => debug!("lookup {} failed: {}", kind, error),
    }
}
