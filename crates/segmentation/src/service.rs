use crate::{
    backend::SegmentationBackend,
    config::{InputSize, ModelConfig},
    processing::{
        post::{self, Coverage, MaskPostProcessor, ProbabilityMap},
        pre::PreProcessor,
    },
};
use image::{DynamicImage, GrayImage, RgbImage};
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};
use std::time::Instant;

/// Result of segmenting one image at model resolution.
pub struct Segmentation {
    /// Binary mask, 255 for wetland.
    pub mask: GrayImage,
    pub coverage: Coverage,
    /// The input image after resizing; aligned with `mask`.
    pub resized: RgbImage,
}

pub struct SegmentationService<B: SegmentationBackend> {
    backend: B,
    preprocessor: PreProcessor,
    postprocessor: MaskPostProcessor,
    duration_histogram: Histogram<f64>,
    images_counter: Counter<u64>,
    coverage_histogram: Histogram<f64>,
}

fn init_metrics(meter_name: &'static str) -> (Histogram<f64>, Counter<u64>, Histogram<f64>) {
    let meter = global::meter(meter_name);
    let latency_buckets = [
        0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
    ];
    let duration_histogram: Histogram<f64> = meter
        .f64_histogram("segmentation_duration_seconds")
        .with_description("Time to segment a single image (preprocess + infer + postprocess)")
        .with_unit("s")
        .with_boundaries(latency_buckets.to_vec())
        .build();
    let images_counter: Counter<u64> = meter
        .u64_counter("segmentation_images_total")
        .with_description("Total images segmented")
        .build();
    let coverage_histogram: Histogram<f64> = meter
        .f64_histogram("segmentation_wetland_percentage")
        .with_description("Wetland coverage of segmented images")
        .with_unit("%")
        .with_boundaries(vec![1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 90.0, 100.0])
        .build();

    (duration_histogram, images_counter, coverage_histogram)
}

impl<B: SegmentationBackend> SegmentationService<B> {
    pub fn new(backend: B, config: &ModelConfig) -> Self {
        let preprocessor = PreProcessor::new(config.input_size(), config.layout);
        let postprocessor = MaskPostProcessor::new(config.threshold);
        let (duration_histogram, images_counter, coverage_histogram) =
            init_metrics("segmentation");

        Self {
            backend,
            preprocessor,
            postprocessor,
            duration_histogram,
            images_counter,
            coverage_histogram,
        }
    }

    pub fn input_size(&self) -> InputSize {
        self.preprocessor.input_size
    }

    pub fn threshold(&self) -> f32 {
        self.postprocessor.threshold
    }

    /// Run the model and return the raw probability map with the resized input.
    pub fn probabilities(
        &mut self,
        image: &DynamicImage,
    ) -> anyhow::Result<(ProbabilityMap, RgbImage)> {
        let (input, resized) = self.preprocessor.preprocess(image)?;

        let output = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            self.backend.infer(&input)?
        };

        let map = self
            .postprocessor
            .probability_map(&output.view(), self.input_size())?;

        Ok((map, resized))
    }

    /// Threshold a probability map into a mask and measure its coverage.
    pub fn mask(&self, map: &ProbabilityMap) -> (GrayImage, Coverage) {
        let mask = self.postprocessor.binarize(map);
        let coverage = post::coverage(&mask);
        (mask, coverage)
    }

    #[tracing::instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn segment(&mut self, image: &DynamicImage) -> anyhow::Result<Segmentation> {
        let start = Instant::now();

        let (map, resized) = self.probabilities(image)?;
        let (mask, coverage) = self.mask(&map);

        self.duration_histogram
            .record(start.elapsed().as_secs_f64(), &[]);
        self.images_counter.add(1, &[]);
        self.coverage_histogram.record(coverage.percentage, &[]);

        tracing::debug!(
            wetland_pixels = coverage.wetland_pixels,
            total_pixels = coverage.total_pixels,
            percentage = coverage.percentage,
            "Image segmented"
        );

        Ok(Segmentation {
            mask,
            coverage,
            resized,
        })
    }
}
