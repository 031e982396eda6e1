use crate::config::Environment;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// `RUST_LOG` wins; otherwise fall back to the configured level.
pub(crate) fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Initialize tracing subscriber with pretty formatting for development
/// and JSON formatting for production.
///
/// Also adds an OpenTelemetry layer that exports traces if a global tracer provider
/// has been initialized (see [`crate::TelemetryGuard`]).
pub fn setup_logging(log_level: &str, environment: Environment) {
    let otel_layer = tracing_opentelemetry::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(otel_layer);

    match environment {
        Environment::Production => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_level(true))
                .init();
        }
        Environment::Development => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
                .init();
        }
    }
}
