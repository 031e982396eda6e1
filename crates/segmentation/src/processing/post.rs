use crate::config::{DEFAULT_THRESHOLD, InputSize};
use crate::error::SegmentationError;
use common::span;
use image::{GrayImage, Luma};
use ndarray::ArrayViewD;

pub const WETLAND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Per-pixel wetland probabilities in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityMap {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f32>,
}

impl ProbabilityMap {
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.width + x) as usize]
    }
}

/// Share of mask pixels classified as wetland.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coverage {
    pub wetland_pixels: usize,
    pub total_pixels: usize,
    pub percentage: f64,
}

impl Coverage {
    pub fn from_counts(wetland_pixels: usize, total_pixels: usize) -> Self {
        let percentage = if total_pixels == 0 {
            0.0
        } else {
            wetland_pixels as f64 / total_pixels as f64 * 100.0
        };

        Self {
            wetland_pixels,
            total_pixels,
            percentage,
        }
    }

    /// Percentage rounded to two decimal places, as reported to clients.
    /// Halves go to the even neighbour, so 3.125 reports as 3.12.
    pub fn rounded_percentage(&self) -> f64 {
        (self.percentage * 100.0).round_ties_even() / 100.0
    }
}

pub struct MaskPostProcessor {
    pub threshold: f32,
}

impl MaskPostProcessor {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Interpret the model output as an `H x W` probability map.
    ///
    /// Any output with exactly `H * W` elements is accepted, so `[1, H, W, 1]`
    /// and `[1, 1, H, W]` both work: they share the same row-major order.
    pub fn probability_map(
        &self,
        output: &ArrayViewD<f32>,
        size: InputSize,
    ) -> Result<ProbabilityMap, SegmentationError> {
        let _s = span!("probability_map");

        let expected = size.pixel_count();
        if output.len() != expected {
            return Err(SegmentationError::OutputShape {
                expected,
                actual: output.len(),
                width: size.width,
                height: size.height,
            });
        }

        tracing::trace!(shape = ?output.shape(), "Reading model output");

        Ok(ProbabilityMap {
            width: size.width,
            height: size.height,
            values: output.iter().copied().collect(),
        })
    }

    /// Pixels strictly above the threshold become wetland (255), the rest 0.
    pub fn binarize(&self, map: &ProbabilityMap) -> GrayImage {
        let _s = span!("binarize");

        GrayImage::from_fn(map.width, map.height, |x, y| {
            if map.get(x, y) > self.threshold {
                Luma([WETLAND])
            } else {
                Luma([BACKGROUND])
            }
        })
    }
}

impl Default for MaskPostProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

pub fn coverage(mask: &GrayImage) -> Coverage {
    let wetland_pixels = mask.as_raw().iter().filter(|&&v| v == WETLAND).count();
    Coverage::from_counts(wetland_pixels, mask.as_raw().len())
}
