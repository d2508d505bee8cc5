use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

use shared_types::AppError;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Keep the LoggerProvider alive for the process lifetime.
static LOGGER_PROVIDER: OnceLock<opentelemetry_sdk::logs::SdkLoggerProvider> = OnceLock::new();

/// Tokio runtime for the OTLP gRPC exporters. Tonic's `connect_lazy()`
/// calls `tokio::spawn`, so a runtime context must exist during init.
static OTEL_RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

/// Install the process-wide `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used
/// (e.g. `"info,server=debug"`).
pub fn init_logging(default_filter: &str) -> Result<(), AppError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| {
            AppError::internal(format!("invalid log filter '{default_filter}': {e}"))
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| AppError::internal(format!("tracing subscriber already set: {e}")))
}

/// Attach the SigNoz ingestion key as gRPC metadata when present.
fn ingestion_metadata() -> Result<Option<opentelemetry_otlp::tonic_types::metadata::MetadataMap>, AppError> {
    let Ok(key) = std::env::var("SIGNOZ_INGESTION_KEY") else {
        return Ok(None);
    };
    if key.is_empty() {
        return Ok(None);
    }
    let value = key
        .parse()
        .map_err(|_| AppError::internal("Invalid SIGNOZ_INGESTION_KEY value"))?;
    let mut metadata = opentelemetry_otlp::tonic_types::metadata::MetadataMap::new();
    metadata.insert("signoz-ingestion-key", value);
    Ok(Some(metadata))
}

/// Set up the OpenTelemetry trace and log exporters and register them
/// globally. Does nothing when `OTEL_EXPORTER_OTLP_ENDPOINT` is unset.
///
/// Reads config from environment:
///   - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector gRPC address
///   - `OTEL_SERVICE_NAME`: service name tag (default: `chapter-case-files`)
///   - `SIGNOZ_INGESTION_KEY`: SigNoz Cloud access token (optional for local)
///   - `DEPLOY_ENV`: deployment environment tag (default: `development`)
pub fn init_telemetry() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();

    let endpoint = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(ep) => ep,
        Err(_) => {
            tracing::info!("OTEL_EXPORTER_OTLP_ENDPOINT not set, skipping OTLP telemetry");
            return Ok(());
        }
    };

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "chapter-case-files".to_string());
    let environment = std::env::var("DEPLOY_ENV").unwrap_or_else(|_| "development".to_string());

    if OTEL_RUNTIME.get().is_none() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(1)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create OTEL runtime: {e}")))?;
        let _ = OTEL_RUNTIME.set(rt);
    }
    let rt = OTEL_RUNTIME
        .get()
        .ok_or_else(|| AppError::internal("OTEL runtime unavailable"))?;
    let _guard = rt.enter();

    let tls = endpoint.starts_with("https://");
    let metadata = ingestion_metadata()?;

    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint);
    if tls {
        builder = builder.with_tls_config(
            opentelemetry_otlp::tonic_types::transport::ClientTlsConfig::new().with_native_roots(),
        );
    }
    if let Some(md) = metadata.clone() {
        builder = builder.with_metadata(md);
    }
    let exporter = builder
        .build()
        .map_err(|e| AppError::internal(format!("Failed to create OTLP exporter: {e}")))?;

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name)
        .with_attribute(KeyValue::new("service.version", APP_VERSION))
        .with_attribute(KeyValue::new("deployment.environment", environment))
        .build();

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource.clone())
        .build();
    global::set_tracer_provider(provider);

    let mut log_builder = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint);
    if tls {
        log_builder = log_builder.with_tls_config(
            opentelemetry_otlp::tonic_types::transport::ClientTlsConfig::new().with_native_roots(),
        );
    }
    if let Some(md) = metadata {
        log_builder = log_builder.with_metadata(md);
    }
    let log_exporter = log_builder
        .build()
        .map_err(|e| AppError::internal(format!("Failed to create OTLP log exporter: {e}")))?;

    let logger_provider = opentelemetry_sdk::logs::SdkLoggerProvider::builder()
        .with_batch_exporter(log_exporter)
        .with_resource(resource)
        .build();
    let _ = LOGGER_PROVIDER.set(logger_provider);

    // Bridge the `log` crate into OpenTelemetry; `tracing` stays on the fmt subscriber.
    if let Some(lp) = LOGGER_PROVIDER.get() {
        let bridge = opentelemetry_appender_log::OpenTelemetryLogBridge::new(lp);
        match log::set_boxed_logger(Box::new(bridge)) {
            Ok(()) => log::set_max_level(log::LevelFilter::Info),
            Err(_) => tracing::warn!("Log bridge skipped, log crate logger already set"),
        }
    }

    tracing::info!("Telemetry initialized v{APP_VERSION}, exporting to {endpoint}");
    Ok(())
}
