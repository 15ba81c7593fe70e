// SPDX-License-Identifier: Apache-2.0
//! Startup diagnostic and shutdown signal handling.

use crate::http::{ServerState, StoreHealth};
use crate::metrics::{InstrumentedClient, metrics};
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};
use vault_gateway_secrets::{
    ConnectionValidator, SecretStoreClient, SecretStoreError, StoreConfig, ValidationOutcome,
    VaultClient,
};

/// Build the instrumented secret store client.
pub fn build_client(config: &StoreConfig) -> Result<Arc<dyn SecretStoreClient>, SecretStoreError> {
    let client = VaultClient::new(config)?;
    Ok(Arc::new(InstrumentedClient::new(Arc::new(client))))
}

/// Run the one-shot diagnostic and publish its outcome.
///
/// A client that could not be built is reported like a failed read; startup
/// continues either way.
pub async fn check_secret_store(
    validator: &ConnectionValidator,
    client: Result<&dyn SecretStoreClient, &SecretStoreError>,
    state: &ServerState,
) -> ValidationOutcome {
    let outcome = match client {
        Ok(client) => validator.validate(client).await,
        Err(err) => ValidationOutcome::Failed {
            kind: err.kind(),
            message: err.display_chain(),
        },
    };

    outcome.log(validator.path());
    metrics()
        .validation_total
        .with_label_values(&[outcome.label()])
        .inc();
    state.set_secret_store(StoreHealth::from(&outcome));
    outcome
}

/// Resolve on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vault_gateway_secrets::{ErrorKind, SecretPath, SecretPayload, StaticSecretStore};

    fn validator() -> ConnectionValidator {
        ConnectionValidator::new(
            SecretPath::new("secret/data/myapp").unwrap(),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn connected_store_updates_health() {
        let store = StaticSecretStore::new().with_secret(
            SecretPath::new("secret/data/myapp").unwrap(),
            SecretPayload::from_pairs([("username", "app")]),
        );
        let client: &dyn SecretStoreClient = &store;
        let state = ServerState::new();

        let outcome = check_secret_store(&validator(), Ok(client), &state).await;
        assert!(outcome.is_connected());
        assert_eq!(state.secret_store(), StoreHealth::Connected);
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn failed_read_is_reported_not_raised() {
        let store = StaticSecretStore::failing(ErrorKind::Connection, "connection refused");
        let client: &dyn SecretStoreClient = &store;
        let state = ServerState::new();

        let outcome = check_secret_store(&validator(), Ok(client), &state).await;
        assert_eq!(outcome.label(), "failed");
        assert_eq!(state.secret_store(), StoreHealth::Unreachable);
    }

    #[tokio::test]
    async fn client_build_error_counts_as_failed() {
        let err = SecretStoreError::Connection {
            message: "invalid secret store address".to_string(),
            source: None,
        };
        let state = ServerState::new();

        let outcome = check_secret_store(&validator(), Err(&err), &state).await;
        match outcome {
            ValidationOutcome::Failed { kind, message } => {
                assert_eq!(kind, ErrorKind::Connection);
                assert!(message.contains("invalid secret store address"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(state.secret_store(), StoreHealth::Unreachable);
    }

    #[test]
    fn build_client_rejects_bad_address() {
        let config = StoreConfig {
            address: "not a url".to_string(),
            token: Some("s.test".to_string()),
            ..Default::default()
        };
        assert!(build_client(&config).is_err());
    }
}
