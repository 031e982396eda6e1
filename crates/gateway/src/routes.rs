use crate::{
    error::{ApiError, ApiResult, segmentation_failure},
    state::AppState,
    storage::{file_stem, sanitize_file_name},
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use image::ImageFormat;
use segmentation::overlay::render_overlay;
use serde::Serialize;

pub const HEALTH_MESSAGE: &str = "Wetland segmentation server is running with U-Net model!";
const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub wetland_percentage: f64,
    pub plotted_image: String,
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

struct ProcessedUpload {
    wetland_percentage: f64,
    mask_file_name: String,
    plotted_file_name: String,
}

pub async fn health() -> &'static str {
    HEALTH_MESSAGE
}

pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let upload = read_image_field(&mut multipart).await?;
    let file_name = sanitize_file_name(&upload.file_name).ok_or(ApiError::EmptyFileName)?;

    tokio::fs::write(state.storage.upload_path(&file_name), &upload.bytes).await?;
    tracing::info!(
        file_name = %file_name,
        bytes = upload.bytes.len(),
        "Received upload request"
    );

    let stem = file_stem(&file_name);
    let processed = {
        let state = state.clone();
        tokio::task::spawn_blocking(move || process_upload(&state, &upload.bytes, &stem))
            .await
            .map_err(|e| anyhow::anyhow!("segmentation task failed: {e}"))??
    };

    tracing::info!(
        file_name = %file_name,
        wetland_percentage = processed.wetland_percentage,
        mask = %processed.mask_file_name,
        plotted = %processed.plotted_file_name,
        "Upload processed"
    );

    Ok(Json(UploadResponse {
        message: "Upload and detection successful",
        wetland_percentage: processed.wetland_percentage,
        plotted_image: format!(
            "{}/processed/{}",
            state.base_url(&headers),
            processed.plotted_file_name
        ),
    }))
}

pub async fn get_processed_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let path = state
        .storage
        .find_processed(&filename)
        .await
        .ok_or(ApiError::NotFound)?;

    let bytes = tokio::fs::read(&path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename.replace('"', "")),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Find the `image` field; other fields are skipped.
async fn read_image_field(multipart: &mut Multipart) -> ApiResult<Upload> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            return Err(ApiError::EmptyFileName);
        }

        let bytes = field.bytes().await?.to_vec();
        return Ok(Upload { file_name, bytes });
    }

    Err(ApiError::MissingImage)
}

/// Decode, segment and write the mask and overlay PNGs. Runs on the blocking pool.
fn process_upload(state: &AppState, bytes: &[u8], stem: &str) -> ApiResult<ProcessedUpload> {
    let image = image::load_from_memory(bytes).map_err(ApiError::InvalidImage)?;

    let segmentation = {
        let mut service = state
            .service
            .lock()
            .map_err(|_| anyhow::anyhow!("segmentation service lock poisoned"))?;
        service.segment(&image).map_err(segmentation_failure)?
    };

    let (mask_file_name, mask_path) = state.storage.mask_path(stem);
    segmentation
        .mask
        .save_with_format(&mask_path, ImageFormat::Png)
        .map_err(anyhow::Error::from)?;

    let overlay = render_overlay(
        &segmentation.resized,
        &segmentation.mask,
        &segmentation.coverage,
        state.overlay_scale,
    )
    .map_err(anyhow::Error::from)?;

    let (plotted_file_name, plotted_path) = state.storage.plotted_path(stem);
    overlay
        .save_with_format(&plotted_path, ImageFormat::Png)
        .map_err(anyhow::Error::from)?;

    Ok(ProcessedUpload {
        wetland_percentage: segmentation.coverage.rounded_percentage(),
        mask_file_name,
        plotted_file_name,
    })
}
