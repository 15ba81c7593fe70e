// SPDX-License-Identifier: Apache-2.0
//! Prometheus metrics for gateway observability.

use async_trait::async_trait;
use prometheus::{CounterVec, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::sync::{Arc, OnceLock};
use vault_gateway_secrets::{SecretPath, SecretPayload, SecretStoreClient, SecretStoreError};

/// Global metrics registry singleton.
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

pub struct Metrics {
    registry: Registry,

    // Startup diagnostic
    pub validation_total: CounterVec,

    // Secret store reads
    pub secret_reads_total: CounterVec,
    pub secret_read_duration_seconds: Histogram,

    // Exposed properties
    pub property_requests_total: IntCounter,
    pub property_bindings_total: CounterVec,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let validation_total = CounterVec::new(
            Opts::new(
                "vault_gateway_validation_total",
                "Startup secret store diagnostics by outcome",
            ),
            &["outcome"],
        )
        .expect("metric can be created");

        let secret_reads_total = CounterVec::new(
            Opts::new(
                "vault_gateway_secret_reads_total",
                "Secret store reads by result",
            ),
            &["result"],
        )
        .expect("metric can be created");

        let secret_read_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "vault_gateway_secret_read_duration_seconds",
                "Secret store read duration in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )
        .expect("metric can be created");

        let property_requests_total = IntCounter::with_opts(Opts::new(
            "vault_gateway_property_requests_total",
            "Requests served by the properties endpoint",
        ))
        .expect("metric can be created");

        let property_bindings_total = CounterVec::new(
            Opts::new(
                "vault_gateway_property_bindings_total",
                "Properties bound at startup by source",
            ),
            &["source"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(validation_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(secret_reads_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(secret_read_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(property_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(property_bindings_total.clone()))
            .expect("metric can be registered");

        Self {
            registry,
            validation_total,
            secret_reads_total,
            secret_read_duration_seconds,
            property_requests_total,
            property_bindings_total,
        }
    }

    /// Encode all metrics in Prometheus text format.
    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }
}

/// Secret store client wrapper that records read counts and latency.
pub struct InstrumentedClient {
    inner: Arc<dyn SecretStoreClient>,
}

impl InstrumentedClient {
    pub fn new(inner: Arc<dyn SecretStoreClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SecretStoreClient for InstrumentedClient {
    async fn read_secret(
        &self,
        path: &SecretPath,
    ) -> Result<Option<SecretPayload>, SecretStoreError> {
        let start = std::time::Instant::now();
        let result = self.inner.read_secret(path).await;
        let m = metrics();
        m.secret_read_duration_seconds
            .observe(start.elapsed().as_secs_f64());
        let label = match &result {
            Ok(Some(_)) => "found",
            Ok(None) => "absent",
            Err(e) => e.kind().as_str(),
        };
        m.secret_reads_total.with_label_values(&[label]).inc();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_gateway_secrets::{ErrorKind, StaticSecretStore};

    #[test]
    fn test_metrics_initialization() {
        let m = metrics();
        m.validation_total.with_label_values(&["connected"]).inc();
        m.property_requests_total.inc();
        m.property_bindings_total.with_label_values(&["default"]).inc();

        let output = m.encode();
        assert!(output.contains("vault_gateway_validation_total"));
        assert!(output.contains("vault_gateway_property_requests_total"));
        assert!(output.contains("vault_gateway_property_bindings_total"));
    }

    #[tokio::test]
    async fn test_instrumented_client_records_reads() {
        let path = SecretPath::new("secret/data/myapp").unwrap();
        let inner = Arc::new(StaticSecretStore::new().with_secret(
            path.clone(),
            SecretPayload::from_pairs([("username", "app")]),
        ));
        let client = InstrumentedClient::new(inner.clone());

        let before = metrics()
            .secret_reads_total
            .with_label_values(&["found"])
            .get();
        assert!(client.read_secret(&path).await.unwrap().is_some());
        let after = metrics()
            .secret_reads_total
            .with_label_values(&["found"])
            .get();

        assert!(after >= before + 1.0);
        assert_eq!(inner.read_count(), 1);
        assert!(metrics()
            .encode()
            .contains("vault_gateway_secret_read_duration_seconds"));
    }

    #[tokio::test]
    async fn test_instrumented_client_passes_errors_through() {
        let path = SecretPath::new("secret/data/myapp").unwrap();
        let client = InstrumentedClient::new(Arc::new(StaticSecretStore::failing(
            ErrorKind::Auth,
            "permission denied",
        )));

        let err = client.read_secret(&path).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(metrics().encode().contains("AuthError"));
    }
}
