// SPDX-License-Identifier: Apache-2.0
//! Startup diagnostic read against the secret store.

use crate::config::ValidationConfig;
use crate::error::{ErrorKind, InvalidSecretPath};
use crate::path::SecretPath;
use crate::store::SecretStoreClient;
use std::time::Duration;
use tracing::{error, info, warn};

/// Result of one diagnostic read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The store answered with a non-empty document. Holds its keys, sorted.
    Connected { keys: Vec<String> },
    /// The store answered, but holds nothing (or an empty document) at the path.
    NoData,
    /// The read failed or timed out.
    Failed { kind: ErrorKind, message: String },
}

impl ValidationOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, ValidationOutcome::Connected { .. })
    }

    /// Short label, also used as a metrics label value.
    pub fn label(&self) -> &'static str {
        match self {
            ValidationOutcome::Connected { .. } => "connected",
            ValidationOutcome::NoData => "no_data",
            ValidationOutcome::Failed { .. } => "failed",
        }
    }

    /// Write the outcome to the process log. Secret values never appear.
    pub fn log(&self, path: &SecretPath) {
        match self {
            ValidationOutcome::Connected { keys } => {
                info!(path = %path, keys = ?keys, "secret store connection successful");
            }
            ValidationOutcome::NoData => {
                warn!(path = %path, "secret store connection failed: no data found");
            }
            ValidationOutcome::Failed { kind, message } => {
                error!(path = %path, kind = %kind, error = %message, "error connecting to secret store");
            }
        }
    }
}

/// One-shot reachability check of a configured secret path.
///
/// Holds no state between runs; every [`validate`](Self::validate) call is
/// independent.
#[derive(Debug, Clone)]
pub struct ConnectionValidator {
    path: SecretPath,
    timeout: Duration,
}

impl ConnectionValidator {
    pub fn new(path: SecretPath, timeout: Duration) -> Self {
        Self { path, timeout }
    }

    pub fn from_config(config: &ValidationConfig) -> Result<Self, InvalidSecretPath> {
        Ok(Self::new(
            SecretPath::new(&config.path)?,
            Duration::from_millis(config.timeout_ms),
        ))
    }

    pub fn path(&self) -> &SecretPath {
        &self.path
    }

    /// Read the configured path once and classify the answer.
    ///
    /// Never fails: errors and timeouts become [`ValidationOutcome::Failed`].
    pub async fn validate(&self, client: &dyn SecretStoreClient) -> ValidationOutcome {
        match tokio::time::timeout(self.timeout, client.read_secret(&self.path)).await {
            Err(_) => ValidationOutcome::Failed {
                kind: ErrorKind::Connection,
                message: format!(
                    "read of {} timed out after {} ms",
                    self.path,
                    self.timeout.as_millis()
                ),
            },
            Ok(Err(err)) => ValidationOutcome::Failed {
                kind: err.kind(),
                message: err.display_chain(),
            },
            Ok(Ok(None)) => ValidationOutcome::NoData,
            Ok(Ok(Some(payload))) if payload.is_empty() => ValidationOutcome::NoData,
            Ok(Ok(Some(payload))) => ValidationOutcome::Connected {
                keys: payload.keys().map(str::to_string).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SecretStoreError;
    use crate::store::{SecretPayload, StaticSecretStore};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    fn myapp() -> SecretPath {
        SecretPath::new("secret/data/myapp").unwrap()
    }

    fn validator() -> ConnectionValidator {
        ConnectionValidator::new(myapp(), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn connected_lists_keys_without_values() {
        let store = StaticSecretStore::new().with_secret(
            myapp(),
            SecretPayload::from_pairs([("username", "app"), ("password", "s3cr3t")]),
        );

        let outcome = validator().validate(&store).await;
        assert_eq!(
            outcome,
            ValidationOutcome::Connected {
                keys: vec!["password".to_string(), "username".to_string()]
            }
        );
        assert!(outcome.is_connected());
        assert!(!format!("{outcome:?}").contains("s3cr3t"));
    }

    #[tokio::test]
    async fn absent_payload_is_no_data() {
        let outcome = validator().validate(&StaticSecretStore::new()).await;
        assert_eq!(outcome, ValidationOutcome::NoData);
        assert_eq!(outcome.label(), "no_data");
    }

    #[tokio::test]
    async fn empty_payload_is_no_data() {
        let store = StaticSecretStore::new().with_secret(myapp(), SecretPayload::default());
        assert_eq!(validator().validate(&store).await, ValidationOutcome::NoData);
    }

    #[tokio::test]
    async fn errors_are_absorbed_with_their_kind() {
        for kind in [ErrorKind::Connection, ErrorKind::Auth, ErrorKind::Store] {
            let store = StaticSecretStore::failing(kind, "backend said no");
            match validator().validate(&store).await {
                ValidationOutcome::Failed { kind: got, message } => {
                    assert_eq!(got, kind);
                    assert!(message.contains("backend said no"));
                }
                other => panic!("expected failure, got {other:?}"),
            }
        }
    }

    struct StalledStore;

    #[async_trait]
    impl SecretStoreClient for StalledStore {
        async fn read_secret(
            &self,
            _path: &SecretPath,
        ) -> Result<Option<SecretPayload>, SecretStoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_read_is_bounded() {
        let validator = ConnectionValidator::new(myapp(), Duration::from_millis(250));
        match validator.validate(&StalledStore).await {
            ValidationOutcome::Failed { kind, message } => {
                assert_eq!(kind, ErrorKind::Connection);
                assert!(message.contains("timed out after 250 ms"));
            }
            other => panic!("expected timeout failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn repeated_runs_are_independent() {
        let healthy = StaticSecretStore::new()
            .with_secret(myapp(), SecretPayload::from_pairs([("username", "app")]));
        let broken = StaticSecretStore::failing(ErrorKind::Auth, "token expired");
        let validator = validator();

        let first = validator.validate(&broken).await;
        let second = validator.validate(&healthy).await;
        let third = validator.validate(&broken).await;

        assert_eq!(first.label(), "failed");
        assert!(second.is_connected());
        assert_eq!(first, third);
    }

    /// In-memory log sink for a scoped fmt subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    /// Validate against `store` and log the outcome, returning everything
    /// written at debug level or above.
    async fn validate_and_log(store: &dyn SecretStoreClient) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let validator = validator();
        let outcome = validator.validate(store).await;
        outcome.log(validator.path());
        logs.contents()
    }

    #[tokio::test]
    async fn success_log_names_keys_not_values() {
        let store = StaticSecretStore::new().with_secret(
            myapp(),
            SecretPayload::from_pairs([("username", "app-user"), ("password", "s3cr3t")]),
        );

        let logs = validate_and_log(&store).await;
        assert!(logs.contains("INFO"));
        assert!(logs.contains("secret store connection successful"));
        assert!(logs.contains("secret/data/myapp"));
        assert!(logs.contains("username"));
        assert!(logs.contains("password"));
        assert!(!logs.contains("s3cr3t"));
        assert!(!logs.contains("app-user"));
    }

    #[tokio::test]
    async fn no_data_log_is_a_warning() {
        let logs = validate_and_log(&StaticSecretStore::new()).await;
        assert!(logs.contains("WARN"));
        assert!(logs.contains("secret store connection failed: no data found"));
    }

    #[tokio::test]
    async fn failure_log_carries_kind_and_message() {
        let store = StaticSecretStore::failing(ErrorKind::Auth, "permission denied");

        let logs = validate_and_log(&store).await;
        assert!(logs.contains("ERROR"));
        assert!(logs.contains("error connecting to secret store"));
        assert!(logs.contains("AuthError"));
        assert!(logs.contains("permission denied"));
    }

    #[test]
    fn from_config_rejects_invalid_path() {
        let config = ValidationConfig {
            path: "secret//myapp".to_string(),
            ..Default::default()
        };
        assert!(ConnectionValidator::from_config(&config).is_err());

        let validator = ConnectionValidator::from_config(&ValidationConfig::default()).unwrap();
        assert_eq!(validator.path().as_str(), "secret/data/myapp");
    }
}
