// SPDX-License-Identifier: Apache-2.0
//! SecretStoreClient trait, payload types and an in-memory store.

use crate::error::{ErrorKind, SecretStoreError};
use crate::path::SecretPath;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Document read from a secret path.
///
/// Values are opaque JSON. The `Debug` output lists keys only.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretPayload {
    /// Key/value data of the stored document.
    pub data: BTreeMap<String, Value>,

    /// KV v2 version metadata, when the path is served by a KV v2 engine.
    #[serde(default)]
    pub metadata: Option<KvMetadata>,

    /// Lease attached to the response, for dynamic secrets.
    #[serde(default)]
    pub lease: Option<Lease>,
}

/// KV v2 secret metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvMetadata {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub deletion_time: Option<String>,
    #[serde(default)]
    pub destroyed: bool,
}

/// Lease information returned alongside a secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub lease_id: Option<String>,
    pub duration_secs: Option<u64>,
    #[serde(default)]
    pub renewable: bool,
}

impl SecretPayload {
    pub fn new(data: BTreeMap<String, Value>) -> Self {
        Self {
            data,
            metadata: None,
            lease: None,
        }
    }

    /// Build a payload of string values.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Value of `key` rendered as text.
    ///
    /// Strings are returned as-is, other scalars as their JSON text. Null,
    /// arrays and objects yield `None`.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.data.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretPayload")
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .field("metadata", &self.metadata)
            .field("lease", &self.lease)
            .finish()
    }
}

/// Read-only access to a secret store.
///
/// `Ok(None)` means the store was reachable but holds nothing at the path.
#[async_trait]
pub trait SecretStoreClient: Send + Sync {
    /// Read the secret at `path` with a single attempt.
    async fn read_secret(&self, path: &SecretPath)
        -> Result<Option<SecretPayload>, SecretStoreError>;
}

/// In-memory secret store.
///
/// Serves a fixed set of payloads, or fails every read with a fixed error
/// kind. Counts reads so callers can check how often the store was hit.
#[derive(Default)]
pub struct StaticSecretStore {
    secrets: HashMap<SecretPath, SecretPayload>,
    failure: Option<(ErrorKind, String)>,
    reads: AtomicUsize,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, path: SecretPath, payload: SecretPayload) -> Self {
        self.secrets.insert(path, payload);
        self
    }

    /// A store whose every read fails with `kind`.
    pub fn failing(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            failure: Some((kind, message.into())),
            ..Self::default()
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStoreClient for StaticSecretStore {
    async fn read_secret(
        &self,
        path: &SecretPath,
    ) -> Result<Option<SecretPayload>, SecretStoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        debug!(path = %path, "reading secret from static store");

        if let Some((kind, message)) = &self.failure {
            return Err(match kind {
                ErrorKind::Connection => SecretStoreError::Connection {
                    message: message.clone(),
                    source: None,
                },
                ErrorKind::Auth => SecretStoreError::auth(None, message.clone()),
                ErrorKind::Store => SecretStoreError::store(None, message.clone()),
            });
        }

        Ok(self.secrets.get(path).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> SecretPath {
        SecretPath::new(s).unwrap()
    }

    #[test]
    fn payload_keys_are_sorted() {
        let payload = SecretPayload::from_pairs([("password", "p"), ("username", "u"), ("api", "a")]);
        assert_eq!(payload.keys().collect::<Vec<_>>(), ["api", "password", "username"]);
        assert_eq!(payload.len(), 3);
    }

    #[test]
    fn get_string_renders_scalars() {
        let mut data = BTreeMap::new();
        data.insert("s".to_string(), json!("text"));
        data.insert("n".to_string(), json!(42));
        data.insert("b".to_string(), json!(true));
        data.insert("o".to_string(), json!({"nested": 1}));
        data.insert("z".to_string(), Value::Null);
        let payload = SecretPayload::new(data);

        assert_eq!(payload.get_string("s").as_deref(), Some("text"));
        assert_eq!(payload.get_string("n").as_deref(), Some("42"));
        assert_eq!(payload.get_string("b").as_deref(), Some("true"));
        assert_eq!(payload.get_string("o"), None);
        assert_eq!(payload.get_string("z"), None);
        assert_eq!(payload.get_string("missing"), None);
    }

    #[test]
    fn debug_does_not_print_values() {
        let payload = SecretPayload::from_pairs([("password", "hunter2")]);
        let debug = format!("{payload:?}");
        assert!(debug.contains("password"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn static_store_returns_stored_document() {
        let store = StaticSecretStore::new().with_secret(
            path("secret/data/myapp"),
            SecretPayload::from_pairs([("username", "alice")]),
        );

        let payload = store
            .read_secret(&path("secret/data/myapp"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload.get_string("username").as_deref(), Some("alice"));
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn static_store_missing_path_is_none() {
        let store = StaticSecretStore::new();
        let result = store.read_secret(&path("secret/data/other")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn static_store_failure_has_requested_kind() {
        for kind in [ErrorKind::Connection, ErrorKind::Auth, ErrorKind::Store] {
            let store = StaticSecretStore::failing(kind, "boom");
            let err = store
                .read_secret(&path("secret/data/myapp"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), kind);
            assert!(err.to_string().contains("boom"));
        }
    }

    fn _assert_object_safe(_: &dyn SecretStoreClient) {}
}
