use common::TelemetryGuard;
use gateway::{
    AppState, Storage, config::get_configuration, logging::setup_logging, run_server,
};
use segmentation::{BoxedBackend, SegmentationService};

#[cfg(feature = "ort-backend")]
use segmentation::backend::ort::OrtBackend as Backend;

#[cfg(not(feature = "ort-backend"))]
compile_error!("The gateway binary needs a model backend: enable the 'ort-backend' feature");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration()?;

    let _telemetry = match config.otel_endpoint.as_deref() {
        Some(endpoint) => Some(TelemetryGuard::init(
            "gateway",
            endpoint,
            config.environment,
            config.log_level.as_str(),
        )?),
        None => {
            setup_logging(&config);
            None
        }
    };

    tracing::info!(
        config = ?config,
        "Loaded configuration"
    );

    let storage = Storage::new(&config.storage);
    storage.ensure_dirs()?;

    tracing::info!("Loading segmentation model");
    let backend: BoxedBackend = Box::new(Backend::load_model(&config.model)?);
    tracing::info!("Model loaded successfully");

    let service = SegmentationService::new(backend, &config.model);
    let state = AppState::from_config(service, storage, &config);

    run_server(&config, state).await
}
