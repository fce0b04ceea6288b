//! Daemon configuration.
//!
//! Everything is resolved once at startup from flags and environment
//! variables; anything missing or malformed is fatal before the first
//! watch request goes out.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use kubewarn_core::cache::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};
use kubewarn_watch::source::ApiConfig;
use kubewarn_watch::{RelayConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_RECONNECT_DELAY};

/// The service account token mounted into every in-cluster pod.
const IN_CLUSTER_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Configuration errors, all fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting was not provided.
    #[error("{name} is required (flag --{flag} or env {env})")]
    Missing {
        /// Human name of the setting.
        name: &'static str,
        /// The CLI flag that sets it.
        flag: &'static str,
        /// The environment variable that sets it.
        env: &'static str,
    },

    /// A provided setting could not be used.
    #[error("invalid {name}: {reason}")]
    Invalid {
        /// Human name of the setting.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Command-line interface of `kubewarnd`.
#[derive(Debug, Parser)]
#[command(name = "kubewarnd")]
#[command(about = "Relays novel cluster warning events to a Slack webhook")]
#[command(version)]
pub struct Cli {
    /// Slack incoming-webhook URL to deliver notifications to.
    #[arg(long, env = "SLACK_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Base URL of the cluster console, used for deep links in messages.
    #[arg(long, env = "CONSOLE_BASE_URL")]
    pub console_url: Option<String>,

    /// Address for the liveness endpoint.
    #[arg(long, env = "KUBEWARN_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Kubernetes API server URL. Defaults to the in-cluster service
    /// environment when unset.
    #[arg(long, env = "KUBERNETES_API_URL")]
    pub api_url: Option<String>,

    /// Path to a bearer token file for the API server.
    #[arg(long, env = "KUBEWARN_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Skip TLS verification of the API server certificate.
    #[arg(long, env = "KUBEWARN_INSECURE_SKIP_TLS_VERIFY")]
    pub insecure_skip_tls_verify: bool,

    /// Seconds a deduplicated fingerprint stays suppressed.
    #[arg(long, env = "KUBEWARN_CACHE_TTL_SECS", default_value_t = DEFAULT_TTL.as_secs())]
    pub cache_ttl_secs: u64,

    /// Seconds between background sweeps of expired cache entries.
    #[arg(long, env = "KUBEWARN_SWEEP_INTERVAL_SECS", default_value_t = DEFAULT_SWEEP_INTERVAL.as_secs())]
    pub sweep_interval_secs: u64,

    /// Seconds to wait before reopening a broken watch stream.
    #[arg(long, env = "KUBEWARN_RECONNECT_DELAY_SECS", default_value_t = DEFAULT_RECONNECT_DELAY.as_secs())]
    pub reconnect_delay_secs: u64,

    /// Capacity of the notification delivery queue.
    #[arg(long, env = "KUBEWARN_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// In-cluster service host, injected by the kubelet.
    #[arg(long, env = "KUBERNETES_SERVICE_HOST", hide = true)]
    pub service_host: Option<String>,

    /// In-cluster service port, injected by the kubelet.
    #[arg(long, env = "KUBERNETES_SERVICE_PORT", hide = true)]
    pub service_port: Option<String>,
}

/// Fully resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Slack webhook URL.
    pub webhook_url: String,
    /// Console base URL for deep links.
    pub console_url: String,
    /// Liveness endpoint bind address.
    pub listen_addr: SocketAddr,
    /// API server connection settings.
    pub api: ApiConfig,
    /// Dedup cache TTL.
    pub cache_ttl: Duration,
    /// Background sweep interval.
    pub sweep_interval: Duration,
    /// Relay loop settings.
    pub relay: RelayConfig,
}

impl Config {
    /// Resolves and validates the full configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required setting is absent, a value
    /// cannot be parsed, or the in-cluster token file cannot be read.
    pub fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let webhook_url = required(cli.webhook_url, "webhook URL", "webhook-url", "SLACK_WEBHOOK_URL")?;
        let console_url = required(cli.console_url, "console URL", "console-url", "CONSOLE_BASE_URL")?;

        let listen_addr: SocketAddr =
            cli.listen_addr
                .parse()
                .map_err(|e| ConfigError::Invalid {
                    name: "listen address",
                    reason: format!("{}: {e}", cli.listen_addr),
                })?;

        let api = resolve_api(
            cli.api_url,
            cli.service_host,
            cli.service_port,
            cli.token_file,
            cli.insecure_skip_tls_verify,
        )?;

        if cli.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "cache TTL",
                reason: "must be greater than 0".to_string(),
            });
        }
        if cli.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "queue capacity",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            webhook_url,
            console_url,
            listen_addr,
            api,
            cache_ttl: Duration::from_secs(cli.cache_ttl_secs),
            sweep_interval: Duration::from_secs(cli.sweep_interval_secs),
            relay: RelayConfig {
                reconnect_delay: Duration::from_secs(cli.reconnect_delay_secs),
                queue_capacity: cli.queue_capacity,
            },
        })
    }
}

fn required(
    value: Option<String>,
    name: &'static str,
    flag: &'static str,
    env: &'static str,
) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing { name, flag, env }),
    }
}

/// Resolves the API server endpoint and credentials.
///
/// An explicit `--api-url` wins and needs no token (e.g. a local
/// `kubectl proxy`). Otherwise the in-cluster service environment is
/// used and the mounted service account token is required.
fn resolve_api(
    api_url: Option<String>,
    service_host: Option<String>,
    service_port: Option<String>,
    token_file: Option<PathBuf>,
    insecure: bool,
) -> Result<ApiConfig, ConfigError> {
    if let Some(base_url) = api_url {
        let token = match token_file {
            Some(path) => Some(read_token(&path)?),
            None => None,
        };
        return Ok(ApiConfig {
            base_url,
            token,
            insecure,
        });
    }

    let (Some(host), Some(port)) = (service_host, service_port) else {
        return Err(ConfigError::Missing {
            name: "API server URL",
            flag: "api-url",
            env: "KUBERNETES_API_URL",
        });
    };

    let path = token_file.unwrap_or_else(|| PathBuf::from(IN_CLUSTER_TOKEN_PATH));
    let token = read_token(&path)?;

    Ok(ApiConfig {
        base_url: format!("https://{host}:{port}"),
        token: Some(token),
        insecure,
    })
}

fn read_token(path: &std::path::Path) -> Result<String, ConfigError> {
    let token = std::fs::read_to_string(path).map_err(|e| ConfigError::Invalid {
        name: "token file",
        reason: format!("failed to read '{}': {e}", path.display()),
    })?;

    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(ConfigError::Invalid {
            name: "token file",
            reason: format!("'{}' is empty", path.display()),
        });
    }
    Ok(token)
}
