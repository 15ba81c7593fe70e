// SPDX-License-Identifier: Apache-2.0
use crate::properties::{PASSWORD, USERNAME};
use crate::telemetry::TelemetryConfig;
use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use vault_gateway_secrets::{AuthMethod, StoreConfig, ValidationConfig};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// JSON structured logging for log aggregation (ELK, Loki).
    Json,
}

/// Secret store authentication method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum VaultAuthMethod {
    #[default]
    Token,
    Approle,
}

impl From<VaultAuthMethod> for AuthMethod {
    fn from(method: VaultAuthMethod) -> Self {
        match method {
            VaultAuthMethod::Token => AuthMethod::Token,
            VaultAuthMethod::Approle => AuthMethod::AppRole,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "vault-gateway",
    version,
    about = "Exposes resolved configuration and checks secret store connectivity at startup"
)]
pub struct Args {
    /// Listen address for the HTTP API, health checks and Prometheus metrics.
    #[arg(long, env = "GATEWAY_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen_http: SocketAddr,

    /// Log output format: text or json.
    #[arg(long, env = "GATEWAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OpenTelemetry OTLP endpoint URL (e.g., http://jaeger:4317). Enables distributed tracing.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Service name for OpenTelemetry traces.
    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = "vault-gateway")]
    pub otel_service_name: String,

    /// Graceful shutdown timeout in seconds after SIGTERM or Ctrl-C.
    #[arg(long, env = "GATEWAY_SHUTDOWN_TIMEOUT_SECS", default_value_t = 30)]
    pub shutdown_timeout_secs: u64,

    // ==================== Secret store ====================
    /// Secret store address (e.g., https://vault.internal:8200).
    #[arg(long, env = "VAULT_ADDR", default_value = "http://127.0.0.1:8200")]
    pub vault_address: String,

    /// Secret store authentication method.
    #[arg(long, env = "VAULT_AUTH_METHOD", value_enum, default_value_t = VaultAuthMethod::Token)]
    pub vault_auth_method: VaultAuthMethod,

    /// Static token for token authentication.
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    pub vault_token: Option<String>,

    /// File containing the token for token authentication; wins over --vault-token.
    #[arg(long, env = "VAULT_TOKEN_FILE")]
    pub vault_token_file: Option<PathBuf>,

    /// Mount point of the AppRole auth method.
    #[arg(long, env = "VAULT_APPROLE_MOUNT", default_value = "approle")]
    pub vault_approle_mount: String,

    /// Path to file containing the AppRole role_id.
    #[arg(long, env = "VAULT_ROLE_ID_FILE")]
    pub vault_role_id_file: Option<PathBuf>,

    /// Path to file containing the AppRole secret_id.
    #[arg(long, env = "VAULT_SECRET_ID_FILE")]
    pub vault_secret_id_file: Option<PathBuf>,

    /// Enterprise namespace.
    #[arg(long, env = "VAULT_NAMESPACE")]
    pub vault_namespace: Option<String>,

    /// Optional CA certificate file for secret store TLS verification.
    #[arg(long, env = "VAULT_CACERT")]
    pub vault_ca_file: Option<PathBuf>,

    /// Per-request timeout for secret store calls in milliseconds.
    #[arg(long, env = "VAULT_TIMEOUT_MS", default_value_t = 5000)]
    pub vault_timeout_ms: u64,

    // ==================== Startup diagnostic ====================
    /// Secret path read once at startup to confirm the store is reachable.
    #[arg(long, env = "GATEWAY_VALIDATION_PATH", default_value = "secret/data/myapp")]
    pub validation_path: String,

    /// Upper bound for the startup diagnostic read in milliseconds.
    #[arg(long, env = "GATEWAY_VALIDATION_TIMEOUT_MS", default_value_t = 10_000)]
    pub validation_timeout_ms: u64,

    /// Skip the startup diagnostic read.
    #[arg(long, env = "GATEWAY_SKIP_VALIDATION", default_value_t = false)]
    pub skip_validation: bool,

    // ==================== Exposed properties ====================
    /// Secret path whose `username`/`password` keys back the exposed properties.
    #[arg(long, env = "GATEWAY_PROPERTIES_PATH")]
    pub properties_path: Option<String>,

    /// Value exposed as `username`; overrides the secret store and the default.
    #[arg(long, env = "APP_USERNAME")]
    pub username: Option<String>,

    /// Value exposed as `password`; overrides the secret store and the default.
    #[arg(long, env = "APP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl Args {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            address: self.vault_address.clone(),
            auth_method: self.vault_auth_method.into(),
            token: self.vault_token.clone(),
            token_file: self.vault_token_file.clone(),
            approle_mount: self.vault_approle_mount.clone(),
            role_id_file: self.vault_role_id_file.clone(),
            secret_id_file: self.vault_secret_id_file.clone(),
            namespace: self.vault_namespace.clone(),
            ca_file: self.vault_ca_file.clone(),
            timeout_ms: self.vault_timeout_ms,
        }
    }

    pub fn validation_config(&self) -> ValidationConfig {
        ValidationConfig {
            enabled: !self.skip_validation,
            path: self.validation_path.clone(),
            timeout_ms: self.validation_timeout_ms,
        }
    }

    /// Properties set explicitly on the command line or in the environment.
    pub fn explicit_properties(&self) -> BTreeMap<String, String> {
        [(USERNAME, &self.username), (PASSWORD, &self.password)]
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key.to_string(), v)))
            .collect()
    }

    pub fn telemetry_config(&self) -> Option<TelemetryConfig> {
        self.otlp_endpoint
            .as_ref()
            .filter(|endpoint| !endpoint.is_empty())
            .map(|endpoint| TelemetryConfig::new(endpoint.clone(), self.otel_service_name.clone()))
    }
}
