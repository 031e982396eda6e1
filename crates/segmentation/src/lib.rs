//! Wetland segmentation: model backends, tensor pre/post-processing, overlay
//! rendering and evaluation metrics around a pretrained U-Net.

pub mod backend;
pub mod config;
pub mod error;
pub mod font;
pub mod metrics;
pub mod overlay;
pub mod processing;
pub mod service;

// Re-export commonly used types for convenience
pub use backend::{BoxedBackend, SegmentationBackend};
pub use config::{DEFAULT_INPUT_SIZE, InputSize, ModelConfig, TensorLayout};
pub use error::SegmentationError;
pub use processing::post::{Coverage, MaskPostProcessor, ProbabilityMap};
pub use processing::pre::PreProcessor;
pub use service::{Segmentation, SegmentationService};
