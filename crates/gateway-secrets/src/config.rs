// SPDX-License-Identifier: Apache-2.0
//! Configuration structures for secret store access.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How the client authenticates to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Static token, given inline or in a file.
    #[default]
    Token,
    /// AppRole login with role_id/secret_id read from files.
    AppRole,
}

/// Vault/OpenBao client configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store address (e.g., "https://vault.internal:8200").
    pub address: String,

    #[serde(default)]
    pub auth_method: AuthMethod,

    /// Inline token for [`AuthMethod::Token`].
    #[serde(default)]
    pub token: Option<String>,

    /// File holding the token for [`AuthMethod::Token`]; wins over `token`.
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// Mount point of the AppRole auth method.
    #[serde(default = "default_approle_mount")]
    pub approle_mount: String,

    /// Path to file containing the AppRole role_id.
    #[serde(default)]
    pub role_id_file: Option<PathBuf>,

    /// Path to file containing the AppRole secret_id.
    #[serde(default)]
    pub secret_id_file: Option<PathBuf>,

    /// Enterprise namespace sent as `X-Vault-Namespace`.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Optional CA certificate file for TLS verification.
    #[serde(default)]
    pub ca_file: Option<PathBuf>,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            auth_method: AuthMethod::default(),
            token: None,
            token_file: None,
            approle_mount: default_approle_mount(),
            role_id_file: None,
            secret_id_file: None,
            namespace: None,
            ca_file: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("address", &self.address)
            .field("auth_method", &self.auth_method)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("token_file", &self.token_file)
            .field("approle_mount", &self.approle_mount)
            .field("role_id_file", &self.role_id_file)
            .field("secret_id_file", &self.secret_id_file)
            .field("namespace", &self.namespace)
            .field("ca_file", &self.ca_file)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Startup diagnostic read configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Secret path read by the diagnostic.
    #[serde(default = "default_validation_path")]
    pub path: String,

    /// Upper bound for the whole diagnostic read in milliseconds.
    #[serde(default = "default_validation_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            path: default_validation_path(),
            timeout_ms: default_validation_timeout_ms(),
        }
    }
}

// Default value functions for serde
fn default_address() -> String {
    "http://127.0.0.1:8200".to_string()
}

fn default_approle_mount() -> String {
    "approle".to_string()
}

fn default_timeout_ms() -> u64 {
    5000 // 5 seconds
}

fn default_enabled() -> bool {
    true
}

fn default_validation_path() -> String {
    "secret/data/myapp".to_string()
}

fn default_validation_timeout_ms() -> u64 {
    10_000
}
