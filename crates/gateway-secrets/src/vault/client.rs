// SPDX-License-Identifier: Apache-2.0
//! Vault HTTP client.

use super::auth::{AppRoleAuth, Credentials, TokenState};
use super::kv::{error_message, payload_from_response, ApiResponse};
use crate::config::StoreConfig;
use crate::error::SecretStoreError;
use crate::path::SecretPath;
use crate::store::{SecretPayload, SecretStoreClient};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// Read-only Vault/OpenBao client.
///
/// Holds the HTTP connection pool and, for AppRole, the cached client token.
/// Every read is a single attempt bounded by the configured timeout.
pub struct VaultClient {
    http: Client,
    address: String,
    base: Url,
    namespace: Option<String>,
    credentials: Credentials,
    token: Arc<RwLock<TokenState>>,
}

impl VaultClient {
    /// Build a client from configuration. No request is sent.
    pub fn new(config: &StoreConfig) -> Result<Self, SecretStoreError> {
        let address = config.address.trim_end_matches('/').to_string();
        let parsed = Url::parse(&address).map_err(|e| {
            SecretStoreError::connection(format!("invalid secret store address {address:?}"), e)
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SecretStoreError::Connection {
                message: format!("unsupported scheme in secret store address {address:?}"),
                source: None,
            });
        }

        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_max_idle_per_host(4);

        // Configure TLS if CA file is provided
        if let Some(ref ca_path) = config.ca_file {
            let ca_cert = std::fs::read(ca_path).map_err(|e| {
                SecretStoreError::connection(format!("failed to read CA file {ca_path:?}"), e)
            })?;
            let cert = reqwest::Certificate::from_pem(&ca_cert).map_err(|e| {
                SecretStoreError::connection(format!("failed to parse CA certificate {ca_path:?}"), e)
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| SecretStoreError::connection("failed to build HTTP client", e))?;

        let credentials = Credentials::from_config(config)?;

        info!(address = %address, auth_method = ?config.auth_method, "secret store client configured");

        Ok(Self {
            http,
            address,
            base: parsed,
            namespace: config.namespace.clone().filter(|ns| !ns.is_empty()),
            credentials,
            token: Arc::new(RwLock::new(TokenState::default())),
        })
    }

    /// Get the base address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// API URL for `segments` under `/v1`. Each segment is percent-encoded,
    /// so `?`, `#` and `%` stay part of the path.
    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base.clone();
        // http(s) URLs always have path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("v1").extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);
        match &self.namespace {
            Some(namespace) => request.header(NAMESPACE_HEADER, namespace),
            None => request,
        }
    }

    /// Get a usable token, logging in with AppRole when needed.
    async fn token(&self) -> Result<String, SecretStoreError> {
        match &self.credentials {
            Credentials::Token(source) => source.load(),
            Credentials::AppRole(auth) => {
                {
                    let state = self.token.read().await;
                    if let Some(token) = state.current() {
                        return Ok(token);
                    }
                }
                self.login(auth).await
            }
        }
    }

    /// Log in with AppRole and cache the returned token.
    async fn login(&self, auth: &AppRoleAuth) -> Result<String, SecretStoreError> {
        let (role_id, secret_id) = auth.load_credentials()?;
        let login_path = auth.login_path();
        let url = self.url(login_path.split('/'));
        let body = serde_json::json!({
            "role_id": role_id,
            "secret_id": secret_id
        });

        let response = self
            .request(Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = body_message(response).await;
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    SecretStoreError::auth(Some(status.as_u16()), format!("approle login failed: {message}"))
                }
                _ => SecretStoreError::store(
                    Some(status.as_u16()),
                    format!("approle login returned {status}: {message}"),
                ),
            });
        }

        let api_response: ApiResponse<Value> = response
            .json()
            .await
            .map_err(|e| body_error(status, "failed to parse login response", e))?;
        let auth_info = api_response.auth.ok_or_else(|| {
            SecretStoreError::store(Some(status.as_u16()), "no auth info in login response")
        })?;

        debug!(
            policies = ?auth_info.policies,
            lease_duration_secs = auth_info.lease_duration,
            renewable = auth_info.renewable,
            "authenticated with secret store"
        );

        let mut state = self.token.write().await;
        state.set(auth_info.client_token.clone(), auth_info.lease_duration);
        Ok(auth_info.client_token)
    }

    async fn forget_token(&self) {
        if matches!(self.credentials, Credentials::AppRole(_)) {
            self.token.write().await.clear();
        }
    }
}

#[async_trait]
impl SecretStoreClient for VaultClient {
    async fn read_secret(
        &self,
        path: &SecretPath,
    ) -> Result<Option<SecretPayload>, SecretStoreError> {
        let token = self.token().await?;
        let url = self.url(path.segments());
        debug!(path = %path, mount = path.mount(), "reading secret");

        let response = self
            .request(Method::GET, url)
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let api_response: ApiResponse<Value> = response
                    .json()
                    .await
                    .map_err(|e| body_error(status, "failed to parse secret response", e))?;
                if let Some(warnings) = api_response.warnings.as_ref().filter(|w| !w.is_empty()) {
                    warn!(path = %path, warnings = ?warnings, "secret store returned warnings");
                }
                payload_from_response(api_response)
            }
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
                debug!(path = %path, status = status.as_u16(), "no secret at path");
                Ok(None)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                // Token might be invalid; force a fresh login next time.
                self.forget_token().await;
                let message = body_message(response).await;
                Err(SecretStoreError::auth(
                    Some(status.as_u16()),
                    format!("{status}: {message}"),
                ))
            }
            _ => {
                let message = body_message(response).await;
                Err(SecretStoreError::store(
                    Some(status.as_u16()),
                    format!("{status}: {message}"),
                ))
            }
        }
    }
}

async fn body_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    error_message(&text)
}

fn body_error(status: StatusCode, message: &str, err: reqwest::Error) -> SecretStoreError {
    if err.is_decode() {
        SecretStoreError::store(Some(status.as_u16()), message).with_source(err)
    } else {
        transport_error(err)
    }
}

fn transport_error(err: reqwest::Error) -> SecretStoreError {
    let message = if err.is_timeout() {
        "request to secret store timed out"
    } else if err.is_connect() {
        "failed to connect to secret store"
    } else {
        "request to secret store failed"
    };
    SecretStoreError::connection(message, err)
}
