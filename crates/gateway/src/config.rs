use common::Environment;
use segmentation::ModelConfig;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub result_dir: PathBuf,
    pub plotted_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// Base for URLs handed back to clients; derived from `Host` when unset.
    pub public_base_url: Option<String>,
    pub otel_endpoint: Option<String>,
    pub max_upload_bytes: usize,
    pub overlay_scale: u32,
    pub storage: StorageConfig,
    pub model: ModelConfig,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Defaults overridden by `WETLAND_*` environment variables, with `__`
/// separating nested keys (e.g. `WETLAND_MODEL__PATH`).
pub fn get_configuration() -> Result<Config, config::ConfigError> {
    build_configuration(
        config::Environment::with_prefix("WETLAND")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}

pub fn build_configuration<S>(source: S) -> Result<Config, config::ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let defaults = ModelConfig::default();

    let config = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("environment", "development")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 5000_i64)?
        .set_default("max_upload_bytes", 16_i64 * 1024 * 1024)?
        .set_default("overlay_scale", 2_i64)?
        .set_default("storage.upload_dir", "uploads")?
        .set_default("storage.result_dir", "results")?
        .set_default("storage.plotted_dir", "plotedresults")?
        .set_default("model.path", defaults.path)?
        .set_default("model.input_width", i64::from(defaults.input_width))?
        .set_default("model.input_height", i64::from(defaults.input_height))?
        .set_default("model.layout", defaults.layout.as_str())?
        .set_default("model.threshold", f64::from(defaults.threshold))?
        .set_default("model.input_name", defaults.input_name)?
        .set_default("model.output_name", defaults.output_name)?
        .set_default("model.intra_threads", defaults.intra_threads as i64)?
        .add_source(source)
        .build()?;

    config.try_deserialize::<Config>()
}
