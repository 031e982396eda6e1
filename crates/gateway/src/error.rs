use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use segmentation::SegmentationError;
use serde_json::json;
use std::io;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No image uploaded")]
    MissingImage,

    #[error("No selected file")]
    EmptyFileName,

    #[error("Invalid multipart request")]
    InvalidMultipart(#[source] MultipartError),

    #[error("Uploaded file is too large")]
    PayloadTooLarge(#[source] MultipartError),

    #[error("Uploaded file is not a valid image")]
    InvalidImage(#[source] image::ImageError),

    #[error("Uploaded file is not a valid image")]
    EmptyImage,

    #[error("File not found")]
    NotFound,

    #[error("Internal server error")]
    Storage(#[from] io::Error),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingImage | ApiError::EmptyFileName | ApiError::InvalidMultipart(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidImage(_) | ApiError::EmptyImage => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A decodable image with no pixels is the client's fault; anything else
/// the pipeline reports is internal.
pub fn segmentation_failure(err: anyhow::Error) -> ApiError {
    match err.downcast_ref::<SegmentationError>() {
        Some(SegmentationError::EmptyImage) => ApiError::EmptyImage,
        _ => ApiError::Internal(err),
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        // Body-limit overruns surface as multipart read errors
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err)
        } else {
            ApiError::InvalidMultipart(err)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::InvalidMultipart(e) => tracing::warn!(error = %e, "Malformed multipart body"),
            ApiError::PayloadTooLarge(e) => tracing::warn!(error = %e, "Upload exceeds body limit"),
            ApiError::InvalidImage(e) => tracing::warn!(error = %e, "Upload is not a decodable image"),
            ApiError::Storage(e) => tracing::error!(error = %e, "Storage error"),
            ApiError::Internal(e) => tracing::error!(error = ?e, "Internal error"),
            _ => {}
        }

        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
