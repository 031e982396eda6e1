//! Pixel-level agreement between predicted and ground-truth masks.

use crate::error::SegmentationError;
use crate::processing::post::WETLAND;
use image::GrayImage;

/// Clamp used by Keras' `binary_crossentropy`.
pub const BCE_EPSILON: f64 = 1e-7;
/// Ground-truth pixels above this value are wetland.
pub const TARGET_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub true_positive: u64,
    pub false_positive: u64,
    pub true_negative: u64,
    pub false_negative: u64,
}

impl ConfusionCounts {
    /// Add one predicted mask against its normalized target (`[0, 1]`, row-major).
    pub fn record(&mut self, predicted: &GrayImage, targets: &[f32]) -> Result<(), SegmentationError> {
        if predicted.as_raw().len() != targets.len() {
            return Err(SegmentationError::DimensionMismatch(format!(
                "mask has {} pixels, target has {}",
                predicted.as_raw().len(),
                targets.len()
            )));
        }

        for (&p, &t) in predicted.as_raw().iter().zip(targets) {
            match (p == WETLAND, t > TARGET_THRESHOLD) {
                (true, true) => self.true_positive += 1,
                (true, false) => self.false_positive += 1,
                (false, false) => self.true_negative += 1,
                (false, true) => self.false_negative += 1,
            }
        }

        Ok(())
    }

    pub fn merge(&mut self, other: &ConfusionCounts) {
        self.true_positive += other.true_positive;
        self.false_positive += other.false_positive;
        self.true_negative += other.true_negative;
        self.false_negative += other.false_negative;
    }

    pub fn total(&self) -> u64 {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total()).unwrap_or(0.0)
    }

    /// Intersection over union of the wetland class. Two empty masks agree
    /// perfectly.
    pub fn iou(&self) -> f64 {
        let union = self.true_positive + self.false_positive + self.false_negative;
        ratio(self.true_positive, union).unwrap_or(1.0)
    }

    pub fn dice(&self) -> f64 {
        let denom = 2 * self.true_positive + self.false_positive + self.false_negative;
        ratio(2 * self.true_positive, denom).unwrap_or(1.0)
    }

    /// `None` when nothing was predicted as wetland.
    pub fn precision(&self) -> Option<f64> {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    /// `None` when the ground truth has no wetland.
    pub fn recall(&self) -> Option<f64> {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }
}

fn ratio(num: u64, denom: u64) -> Option<f64> {
    (denom > 0).then(|| num as f64 / denom as f64)
}

/// Mean binary cross-entropy between predicted probabilities and targets.
pub fn binary_cross_entropy(probabilities: &[f32], targets: &[f32]) -> Result<f64, SegmentationError> {
    if probabilities.len() != targets.len() {
        return Err(SegmentationError::DimensionMismatch(format!(
            "{} probabilities, {} targets",
            probabilities.len(),
            targets.len()
        )));
    }
    if probabilities.is_empty() {
        return Ok(0.0);
    }

    let sum: f64 = probabilities
        .iter()
        .zip(targets)
        .map(|(&p, &t)| {
            let p = (p as f64).clamp(BCE_EPSILON, 1.0 - BCE_EPSILON);
            let t = t as f64;
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        })
        .sum();

    Ok(sum / probabilities.len() as f64)
}
