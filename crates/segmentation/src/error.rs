use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("Image has no pixels")]
    EmptyImage,

    #[error("Resize failed: {0}")]
    Resize(String),

    #[error("Model output has {actual} elements, expected {expected} ({width}x{height})")]
    OutputShape {
        expected: usize,
        actual: usize,
        width: u32,
        height: u32,
    },

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Invalid tensor layout `{0}`. Use either `nhwc` or `nchw`.")]
    InvalidLayout(String),
}
