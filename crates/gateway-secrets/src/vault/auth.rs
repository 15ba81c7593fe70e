// SPDX-License-Identifier: Apache-2.0
//! Credentials for authenticating to Vault.

use crate::config::{AuthMethod, StoreConfig};
use crate::error::SecretStoreError;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// Credential used to obtain a client token.
pub enum Credentials {
    Token(TokenSource),
    AppRole(AppRoleAuth),
}

impl Credentials {
    /// Pick the credential described by `config`.
    pub fn from_config(config: &StoreConfig) -> Result<Self, SecretStoreError> {
        match config.auth_method {
            AuthMethod::Token => {
                let source = match (&config.token_file, &config.token) {
                    (Some(file), _) => TokenSource::File(file.clone()),
                    (None, Some(token)) => TokenSource::Inline(token.clone()),
                    (None, None) => {
                        return Err(SecretStoreError::auth(
                            None,
                            "token auth selected but no token or token file configured",
                        ))
                    }
                };
                Ok(Credentials::Token(source))
            }
            AuthMethod::AppRole => match (&config.role_id_file, &config.secret_id_file) {
                (Some(role_id_file), Some(secret_id_file)) => Ok(Credentials::AppRole(
                    AppRoleAuth::new(
                        config.approle_mount.clone(),
                        role_id_file.clone(),
                        secret_id_file.clone(),
                    ),
                )),
                _ => Err(SecretStoreError::auth(
                    None,
                    "approle auth requires both a role_id file and a secret_id file",
                )),
            },
        }
    }
}

/// Where a static token comes from.
pub enum TokenSource {
    Inline(String),
    /// Re-read on every request so an agent-managed sink file can be rotated.
    File(PathBuf),
}

impl TokenSource {
    pub fn load(&self) -> Result<String, SecretStoreError> {
        let token = match self {
            TokenSource::Inline(token) => token.trim().to_string(),
            TokenSource::File(path) => read_trimmed(path, "token")?,
        };
        if token.is_empty() {
            return Err(SecretStoreError::auth(None, "configured token is empty"));
        }
        Ok(token)
    }
}

/// AppRole authentication handler.
///
/// Reads role_id and secret_id from files on disk.
pub struct AppRoleAuth {
    mount: String,
    role_id_file: PathBuf,
    secret_id_file: PathBuf,
}

impl AppRoleAuth {
    pub fn new(mount: String, role_id_file: PathBuf, secret_id_file: PathBuf) -> Self {
        Self {
            mount: mount.trim_matches('/').to_string(),
            role_id_file,
            secret_id_file,
        }
    }

    /// Load credentials from the configured files.
    ///
    /// Returns (role_id, secret_id).
    pub fn load_credentials(&self) -> Result<(String, String), SecretStoreError> {
        let role_id = read_trimmed(&self.role_id_file, "AppRole role_id")?;
        let secret_id = read_trimmed(&self.secret_id_file, "AppRole secret_id")?;
        Ok((role_id, secret_id))
    }

    /// API path of the login endpoint, relative to `/v1/`.
    pub fn login_path(&self) -> String {
        format!("auth/{}/login", self.mount)
    }
}

fn read_trimmed(path: &Path, what: &str) -> Result<String, SecretStoreError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SecretStoreError::auth(None, format!("failed to read {what} from {path:?}")).with_source(e)
    })?;
    debug!(path = ?path, "loaded {what}");
    Ok(content.trim().to_string())
}

/// Cached client token from a login.
#[derive(Default)]
pub(crate) struct TokenState {
    token: Option<String>,
    expires_at: Option<Instant>,
}

impl TokenState {
    /// Tokens this close to expiry are treated as expired.
    const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

    /// Store a fresh token. A zero lease means the token does not expire.
    pub(crate) fn set(&mut self, token: String, lease_duration_secs: u64) {
        self.token = Some(token);
        self.expires_at = (lease_duration_secs > 0)
            .then(|| Instant::now() + Duration::from_secs(lease_duration_secs));
    }

    pub(crate) fn clear(&mut self) {
        self.token = None;
        self.expires_at = None;
    }

    /// The cached token if it is still usable.
    pub(crate) fn current(&self) -> Option<String> {
        let token = self.token.as_ref()?;
        match self.expires_at {
            Some(expires) if expires <= Instant::now() + Self::EXPIRY_MARGIN => None,
            _ => Some(token.clone()),
        }
    }
}
