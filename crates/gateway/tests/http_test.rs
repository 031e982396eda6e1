use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use gateway::{AppState, Storage, config::StorageConfig, router, routes::HEALTH_MESSAGE};
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::{Array, ArrayD, IxDyn};
use segmentation::{BoxedBackend, ModelConfig, SegmentationBackend, SegmentationService};
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "----wetland-test-boundary";
const MODEL_SIZE: u32 = 16;

/// Wetland wherever green beats red; stands in for the U-Net.
struct GreenBackend;

impl SegmentationBackend for GreenBackend {
    fn infer(&mut self, input: &ArrayD<f32>) -> anyhow::Result<ArrayD<f32>> {
        let (h, w) = (input.shape()[1], input.shape()[2]);
        let mut out = Array::zeros(IxDyn(&[1, h, w, 1]));
        for y in 0..h {
            for x in 0..w {
                out[[0, y, x, 0]] = if input[[0, y, x, 1]] > input[[0, y, x, 0]] {
                    0.95
                } else {
                    0.05
                };
            }
        }
        Ok(out)
    }
}

struct TestApp {
    app: Router,
    dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        Self::build(None, 1024 * 1024)
    }

    fn with_base_url(public_base_url: Option<&str>) -> Self {
        Self::build(public_base_url, 1024 * 1024)
    }

    fn with_upload_limit(max_upload_bytes: usize) -> Self {
        Self::build(None, max_upload_bytes)
    }

    fn build(public_base_url: Option<&str>, max_upload_bytes: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(&StorageConfig {
            upload_dir: dir.path().join("uploads"),
            result_dir: dir.path().join("results"),
            plotted_dir: dir.path().join("plotedresults"),
        });
        storage.ensure_dirs().unwrap();

        let model = ModelConfig {
            input_width: MODEL_SIZE,
            input_height: MODEL_SIZE,
            ..ModelConfig::default()
        };
        let backend: BoxedBackend = Box::new(GreenBackend);
        let service = SegmentationService::new(backend, &model);

        let state = AppState {
            service: Arc::new(Mutex::new(service)),
            storage,
            public_base_url: public_base_url.map(str::to_string),
            bind_addr: "127.0.0.1:5000".to_string(),
            overlay_scale: 2,
            max_upload_bytes,
        };

        Self {
            app: router(state),
            dir,
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>, header::HeaderMap) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec(), headers)
    }

    async fn upload(&self, field: &str, file_name: Option<&str>, content: &[u8]) -> (StatusCode, serde_json::Value) {
        self.post_multipart(multipart_body(field, file_name, content))
            .await
    }

    async fn post_multipart(&self, body: Vec<u8>) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::HOST, "localhost:5000")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, body, _) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>, header::HeaderMap) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }
}

fn multipart_body(field: &str, file_name: Option<&str>, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    match file_name {
        Some(name) => body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\n\
                 Content-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
        ),
    }
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Left half green (wetland), right half red.
fn half_green_png() -> Vec<u8> {
    let img = RgbImage::from_fn(64, 64, |x, _| {
        if x < 32 {
            Rgb([20, 180, 40])
        } else {
            Rgb([180, 60, 20])
        }
    });
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body, _) = app.get("/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), HEALTH_MESSAGE);
}

#[tokio::test]
async fn test_upload_runs_segmentation_and_writes_outputs() {
    let app = TestApp::new();
    let (status, json) = app.upload("image", Some("marsh.png"), &half_green_png()).await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {json}");
    assert_eq!(json["message"], "Upload and detection successful");

    let percentage = json["wetland_percentage"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&percentage));
    assert_eq!(percentage, 50.0);

    assert_eq!(
        json["plotted_image"],
        "http://localhost:5000/processed/plotted_marsh.png"
    );

    assert!(app.root().join("uploads/marsh.png").is_file());

    let mask = image::open(app.root().join("results/mask_marsh.png"))
        .unwrap()
        .to_luma8();
    assert_eq!(mask.dimensions(), (MODEL_SIZE, MODEL_SIZE));
    assert!(mask.pixels().all(|p| p[0] == 0 || p[0] == 255));
    assert_eq!(mask.get_pixel(0, MODEL_SIZE - 1)[0], 255);
    assert_eq!(mask.get_pixel(MODEL_SIZE - 1, MODEL_SIZE - 1)[0], 0);

    let overlay = image::open(app.root().join("plotedresults/plotted_marsh.png")).unwrap();
    assert_eq!(overlay.width(), MODEL_SIZE * 2);
}

#[tokio::test]
async fn test_processed_files_are_served_as_png_attachments() {
    let app = TestApp::new();
    let (status, _) = app.upload("image", Some("marsh.png"), &half_green_png()).await;
    assert_eq!(status, StatusCode::OK);

    for name in ["mask_marsh.png", "plotted_marsh.png"] {
        let (status, body, headers) = app.get(&format!("/processed/{name}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            format!("attachment; filename=\"{name}\"").as_str()
        );
        assert!(image::load_from_memory_with_format(&body, ImageFormat::Png).is_ok());
    }
}

#[tokio::test]
async fn test_public_base_url_overrides_host() {
    let app = TestApp::with_base_url(Some("https://wetlands.example.org/"));
    let (status, json) = app.upload("image", Some("delta.png"), &half_green_png()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["plotted_image"],
        "https://wetlands.example.org/processed/plotted_delta.png"
    );
}

#[tokio::test]
async fn test_upload_without_image_field_is_rejected() {
    let app = TestApp::new();
    let (status, json) = app.upload("file", Some("marsh.png"), &half_green_png()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No image uploaded");
}

#[tokio::test]
async fn test_upload_with_empty_file_name_is_rejected() {
    let app = TestApp::new();

    let (status, json) = app.upload("image", Some(""), &half_green_png()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No selected file");

    let (status, json) = app.upload("image", None, b"plain text").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No selected file");
}

#[tokio::test]
async fn test_truncated_multipart_is_rejected() {
    let app = TestApp::new();
    let mut body = multipart_body("image", Some("marsh.png"), &half_green_png());
    // Drop the closing boundary and the tail of the file part
    body.truncate(body.len() - BOUNDARY.len() - 16);

    let (status, json) = app.post_multipart(body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid multipart request");
    assert!(!app.root().join("results/mask_marsh.png").exists());
}

#[tokio::test]
async fn test_upload_over_body_limit_is_too_large() {
    let app = TestApp::with_upload_limit(1024);
    let (status, json) = app
        .upload("image", Some("huge.png"), &vec![0u8; 10 * 1024])
        .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["error"], "Uploaded file is too large");
    assert!(!app.root().join("uploads/huge.png").exists());
}

#[tokio::test]
async fn test_upload_within_body_limit_is_accepted() {
    let png = half_green_png();
    let app = TestApp::with_upload_limit(png.len() + 1024);
    let (status, json) = app.upload("image", Some("marsh.png"), &png).await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {json}");
}

#[tokio::test]
async fn test_upload_of_non_image_is_unprocessable() {
    let app = TestApp::new();
    let (status, json) = app.upload("image", Some("notes.png"), b"definitely not a png").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "Uploaded file is not a valid image");
    assert!(!app.root().join("results/mask_notes.png").exists());
}

#[tokio::test]
async fn test_upload_file_name_is_confined_to_upload_dir() {
    let app = TestApp::new();
    let (status, json) = app
        .upload("image", Some("../../escape.png"), &half_green_png())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["plotted_image"],
        "http://localhost:5000/processed/plotted_escape.png"
    );
    assert!(app.root().join("uploads/escape.png").is_file());
    assert!(!app.root().join("../escape.png").exists());
}

#[tokio::test]
async fn test_missing_processed_file_is_not_found() {
    let app = TestApp::new();
    let (status, body, _) = app.get("/processed/plotted_nothing.png").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "File not found");
}

#[tokio::test]
async fn test_processed_route_does_not_escape_storage() {
    let app = TestApp::new();
    let (status, _) = app.upload("image", Some("marsh.png"), &half_green_png()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = app.get("/processed/..%2Fuploads%2Fmarsh.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
