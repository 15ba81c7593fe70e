// SPDX-License-Identifier: Apache-2.0
//! Configuration values exposed over `/vault/properties`.
//!
//! Values are bound once at startup and never change afterwards. Each key is
//! taken from the first layer that has it: explicit CLI/env value, then the
//! secret store document at `--properties-path`, then the built-in default.

use crate::metrics::metrics;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};
use vault_gateway_secrets::{SecretPath, SecretPayload, SecretStoreClient};

pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";

const DEFAULTS: [(&str, &str); 2] = [(USERNAME, "defaultUser"), (PASSWORD, "defaultPassword")];

/// Where a bound value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertySource {
    Explicit,
    SecretStore,
    Default,
}

impl PropertySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertySource::Explicit => "explicit",
            PropertySource::SecretStore => "secret_store",
            PropertySource::Default => "default",
        }
    }
}

/// Immutable set of bound values; serializes as a flat JSON object.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedProperties {
    values: BTreeMap<String, String>,
    sources: BTreeMap<String, PropertySource>,
}

impl ResolvedProperties {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn source(&self, key: &str) -> Option<PropertySource> {
        self.sources.get(key).copied()
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl Serialize for ResolvedProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

impl fmt::Debug for ResolvedProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.sources.iter().map(|(k, s)| (k, s.as_str())))
            .finish()
    }
}

/// Binds the exposed keys from their layered sources.
#[derive(Debug, Clone, Default)]
pub struct PropertyBinder {
    explicit: BTreeMap<String, String>,
}

impl PropertyBinder {
    pub fn new(explicit: BTreeMap<String, String>) -> Self {
        Self { explicit }
    }

    /// Bind every exposed key. `store` is the document read from the
    /// properties path, if any.
    pub fn bind(&self, store: Option<&SecretPayload>) -> ResolvedProperties {
        let mut values = BTreeMap::new();
        let mut sources = BTreeMap::new();

        for (key, default) in DEFAULTS {
            let (value, source) = if let Some(value) = self.explicit.get(key) {
                (value.clone(), PropertySource::Explicit)
            } else if let Some(value) = store.and_then(|payload| payload.get_string(key)) {
                (value, PropertySource::SecretStore)
            } else {
                (default.to_string(), PropertySource::Default)
            };
            values.insert(key.to_string(), value);
            sources.insert(key.to_string(), source);
        }

        ResolvedProperties { values, sources }
    }

    /// Read the properties document once, then bind.
    ///
    /// A failed or empty read falls back to the remaining layers.
    pub async fn resolve(
        &self,
        store: Option<(&dyn SecretStoreClient, &SecretPath)>,
    ) -> ResolvedProperties {
        let payload = match store {
            Some((client, path)) => match client.read_secret(path).await {
                Ok(Some(payload)) => {
                    debug!(path = %path, keys = payload.len(), "loaded properties from secret store");
                    Some(payload)
                }
                Ok(None) => {
                    warn!(path = %path, "no properties found in secret store, using defaults");
                    None
                }
                Err(e) => {
                    warn!(
                        path = %path,
                        kind = %e.kind(),
                        error = %e.display_chain(),
                        "failed to read properties from secret store, using defaults"
                    );
                    None
                }
            },
            None => None,
        };

        let resolved = self.bind(payload.as_ref());
        for (key, source) in &resolved.sources {
            metrics()
                .property_bindings_total
                .with_label_values(&[source.as_str()])
                .inc();
            info!(property = %key, source = source.as_str(), "bound property");
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_gateway_secrets::{ErrorKind, StaticSecretStore};

    fn explicit(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn props_path() -> SecretPath {
        SecretPath::new("secret/data/myapp").unwrap()
    }

    #[test]
    fn defaults_without_overrides() {
        let resolved = PropertyBinder::default().bind(None);
        assert_eq!(resolved.get(USERNAME), Some("defaultUser"));
        assert_eq!(resolved.get(PASSWORD), Some("defaultPassword"));
        assert_eq!(resolved.source(USERNAME), Some(PropertySource::Default));
        assert_eq!(
            serde_json::to_value(&resolved).unwrap(),
            serde_json::json!({"username": "defaultUser", "password": "defaultPassword"})
        );
    }

    #[test]
    fn explicit_value_overrides_default() {
        let resolved = PropertyBinder::new(explicit(&[("username", "alice")])).bind(None);
        assert_eq!(resolved.get(USERNAME), Some("alice"));
        assert_eq!(resolved.get(PASSWORD), Some("defaultPassword"));
        assert_eq!(resolved.source(USERNAME), Some(PropertySource::Explicit));
    }

    #[test]
    fn store_value_sits_between_explicit_and_default() {
        let payload = SecretPayload::from_pairs([("username", "vault-user"), ("password", "vault-pass")]);
        let resolved = PropertyBinder::new(explicit(&[("password", "cli-pass")])).bind(Some(&payload));

        assert_eq!(resolved.get(USERNAME), Some("vault-user"));
        assert_eq!(resolved.source(USERNAME), Some(PropertySource::SecretStore));
        assert_eq!(resolved.get(PASSWORD), Some("cli-pass"));
        assert_eq!(resolved.source(PASSWORD), Some(PropertySource::Explicit));
    }

    #[test]
    fn unrelated_store_keys_are_not_exposed() {
        let payload = SecretPayload::from_pairs([("api_key", "xyz")]);
        let resolved = PropertyBinder::default().bind(Some(&payload));
        assert_eq!(resolved.values().len(), 2);
        assert!(resolved.get("api_key").is_none());
    }

    #[test]
    fn debug_hides_values() {
        let resolved = PropertyBinder::new(explicit(&[("password", "hunter2")])).bind(None);
        let debug = format!("{resolved:?}");
        assert!(debug.contains("password"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn resolve_reads_store_once() {
        let store = StaticSecretStore::new().with_secret(
            props_path(),
            SecretPayload::from_pairs([("username", "vault-user")]),
        );
        let client: &dyn SecretStoreClient = &store;
        let path = props_path();

        let resolved = PropertyBinder::default().resolve(Some((client, &path))).await;
        assert_eq!(resolved.get(USERNAME), Some("vault-user"));
        assert_eq!(resolved.get(PASSWORD), Some("defaultPassword"));
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn resolve_falls_back_when_store_fails() {
        let store = StaticSecretStore::failing(ErrorKind::Connection, "connection refused");
        let client: &dyn SecretStoreClient = &store;
        let path = props_path();

        let resolved = PropertyBinder::new(explicit(&[("username", "alice")]))
            .resolve(Some((client, &path)))
            .await;
        assert_eq!(resolved.get(USERNAME), Some("alice"));
        assert_eq!(resolved.get(PASSWORD), Some("defaultPassword"));
    }

    #[tokio::test]
    async fn resolve_without_store_uses_defaults() {
        let resolved = PropertyBinder::default().resolve(None).await;
        assert_eq!(resolved, PropertyBinder::default().bind(None));
    }
}
