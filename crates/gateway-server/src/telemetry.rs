// SPDX-License-Identifier: Apache-2.0
//! Process logging, with spans optionally exported over OTLP.

use crate::config::LogFormat;
use opentelemetry::KeyValue;
use opentelemetry::trace::{TraceError, TracerProvider as _};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, runtime::Tokio, trace::TracerProvider};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Where and as whom spans are exported.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// OTLP/gRPC collector, e.g. `http://otel-collector:4317`.
    pub otlp_endpoint: String,
    pub service_name: String,
}

impl TelemetryConfig {
    pub fn new(otlp_endpoint: String, service_name: String) -> Self {
        Self {
            otlp_endpoint,
            service_name,
        }
    }

    fn resource(&self) -> Resource {
        Resource::new([
            KeyValue::new("service.name", self.service_name.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
    }

    /// Batch-exporting provider; installed globally by [`init_logging`].
    fn tracer_provider(&self) -> Result<TracerProvider, TraceError> {
        let exporter = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(self.otlp_endpoint.as_str())
            .build()?;

        Ok(TracerProvider::builder()
            .with_batch_exporter(exporter, Tokio)
            .with_resource(self.resource())
            .build())
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` selects levels (default `info`); lines carry RFC 3339 UTC
/// timestamps. With `telemetry` set, spans also go to the OTLP collector.
pub fn init_logging(format: LogFormat, telemetry: Option<&TelemetryConfig>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let output = match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_timer(UtcTime::rfc_3339())
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .boxed(),
    };

    let spans = match telemetry {
        Some(config) => {
            let provider = config.tracer_provider()?;
            let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
            opentelemetry::global::set_tracer_provider(provider);
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .with(spans)
        .try_init()?;

    if let Some(config) = telemetry {
        tracing::info!(endpoint = %config.otlp_endpoint, "exporting spans over OTLP");
    }
    Ok(())
}

/// Flush buffered spans. A no-op when export was never enabled.
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::{Key, Value};

    #[test]
    fn resource_names_the_service() {
        let config = TelemetryConfig::new(
            "http://localhost:4317".to_string(),
            "vault-gateway-test".to_string(),
        );

        let resource = config.resource();
        assert_eq!(
            resource.get(Key::new("service.name")),
            Some(Value::from("vault-gateway-test"))
        );
        assert!(resource.get(Key::new("service.version")).is_some());
    }
}
