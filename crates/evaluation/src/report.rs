use image::GrayImage;
use segmentation::{Coverage, metrics::{ConfusionCounts, binary_cross_entropy}};
use serde::Serialize;
use std::fmt;

/// Running totals across the evaluated pairs.
#[derive(Debug, Default)]
pub struct Accumulator {
    counts: ConfusionCounts,
    bce_sum: f64,
    coverage_sum: f64,
    pairs: usize,
}

impl Accumulator {
    pub fn record(
        &mut self,
        probabilities: &[f32],
        mask: &GrayImage,
        targets: &[f32],
        coverage: &Coverage,
    ) -> anyhow::Result<()> {
        self.counts.record(mask, targets)?;
        self.bce_sum += binary_cross_entropy(probabilities, targets)?;
        self.coverage_sum += coverage.percentage;
        self.pairs += 1;
        Ok(())
    }

    pub fn summary(&self) -> Summary {
        let pairs = self.pairs.max(1) as f64;
        Summary {
            pairs: self.pairs,
            accuracy: self.counts.accuracy(),
            iou: self.counts.iou(),
            dice: self.counts.dice(),
            precision: self.counts.precision(),
            recall: self.counts.recall(),
            binary_cross_entropy: self.bce_sum / pairs,
            mean_wetland_percentage: self.coverage_sum / pairs,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub pairs: usize,
    pub accuracy: f64,
    pub iou: f64,
    pub dice: f64,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub binary_cross_entropy: f64,
    pub mean_wetland_percentage: f64,
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pairs:                   {}", self.pairs)?;
        writeln!(f, "pixel accuracy:          {:.4}", self.accuracy)?;
        writeln!(f, "IoU (wetland):           {:.4}", self.iou)?;
        writeln!(f, "Dice:                    {:.4}", self.dice)?;
        writeln!(f, "precision:               {}", optional(self.precision))?;
        writeln!(f, "recall:                  {}", optional(self.recall))?;
        writeln!(f, "binary cross-entropy:    {:.4}", self.binary_cross_entropy)?;
        write!(f, "mean wetland coverage:   {:.2}%", self.mean_wetland_percentage)
    }
}
