use crate::{config::Config, storage::Storage};
use axum::http::{HeaderMap, header};
use segmentation::{BoxedBackend, SegmentationService};
use std::sync::{Arc, Mutex};

/// One model session shared by all requests; inference is serialized.
pub type SharedService = Arc<Mutex<SegmentationService<BoxedBackend>>>;

#[derive(Clone)]
pub struct AppState {
    pub service: SharedService,
    pub storage: Storage,
    pub public_base_url: Option<String>,
    pub bind_addr: String,
    pub overlay_scale: u32,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn from_config(
        service: SegmentationService<BoxedBackend>,
        storage: Storage,
        config: &Config,
    ) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
            storage,
            public_base_url: config.public_base_url.clone(),
            bind_addr: config.bind_addr(),
            overlay_scale: config.overlay_scale,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Scheme and authority for absolute URLs in responses.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.public_base_url {
            return url.trim_end_matches('/').to_string();
        }

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(self.bind_addr.as_str());

        format!("http://{host}")
    }
}
