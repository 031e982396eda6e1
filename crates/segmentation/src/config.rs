use crate::error::SegmentationError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_INPUT_SIZE: InputSize = InputSize {
    width: 256,
    height: 256,
};
pub const DEFAULT_THRESHOLD: f32 = 0.5;
pub const DEFAULT_MODEL_PATH: &str = "model/final_wetland_unet.onnx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl InputSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Memory order of the model's image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, H, W, 3]`, as exported from Keras.
    #[default]
    Nhwc,
    /// `[1, 3, H, W]`
    Nchw,
}

impl TensorLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            TensorLayout::Nhwc => "nhwc",
            TensorLayout::Nchw => "nchw",
        }
    }
}

impl fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TensorLayout {
    type Err = SegmentationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nhwc" => Ok(Self::Nhwc),
            "nchw" => Ok(Self::Nchw),
            other => Err(SegmentationError::InvalidLayout(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub path: String,
    pub input_width: u32,
    pub input_height: u32,
    pub layout: TensorLayout,
    pub threshold: f32,
    pub input_name: String,
    pub output_name: String,
    pub intra_threads: usize,
}

impl ModelConfig {
    pub fn input_size(&self) -> InputSize {
        InputSize::new(self.input_width, self.input_height)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_MODEL_PATH.to_string(),
            input_width: DEFAULT_INPUT_SIZE.width,
            input_height: DEFAULT_INPUT_SIZE.height,
            layout: TensorLayout::Nhwc,
            threshold: DEFAULT_THRESHOLD,
            input_name: "input_1".to_string(),
            output_name: "output_1".to_string(),
            intra_threads: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_str_is_case_insensitive() {
        assert_eq!("NHWC".parse::<TensorLayout>().unwrap(), TensorLayout::Nhwc);
        assert_eq!("nchw".parse::<TensorLayout>().unwrap(), TensorLayout::Nchw);
        assert!(matches!(
            "hwc".parse::<TensorLayout>(),
            Err(SegmentationError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_default_model_config_matches_unet_export() {
        let config = ModelConfig::default();
        assert_eq!(config.input_size(), InputSize::new(256, 256));
        assert_eq!(config.input_size().pixel_count(), 65536);
        assert_eq!(config.layout, TensorLayout::Nhwc);
        assert_eq!(config.threshold, 0.5);
    }
}
