//! Score the segmentation model against a labelled dataset of image/mask pairs.

mod dataset;
mod report;

use clap::Parser;
use common::{Environment, setup_logging};
use indicatif::{ProgressBar, ProgressStyle};
use report::{Accumulator, Summary};
use segmentation::{
    ModelConfig, SegmentationService, TensorLayout, backend::ort::OrtBackend,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Evaluate the wetland U-Net against ground-truth masks")]
struct Args {
    /// Directory of input images
    #[arg(long, default_value = "train_images")]
    images: PathBuf,

    /// Directory of ground-truth masks, paired with images by sorted name
    #[arg(long, default_value = "train_masks")]
    masks: PathBuf,

    /// ONNX model file
    #[arg(long, default_value = segmentation::config::DEFAULT_MODEL_PATH)]
    model: String,

    #[arg(long, default_value_t = segmentation::config::DEFAULT_THRESHOLD)]
    threshold: f32,

    #[arg(long, default_value_t = 256)]
    width: u32,

    #[arg(long, default_value_t = 256)]
    height: u32,

    #[arg(long, default_value_t = TensorLayout::Nhwc)]
    layout: TensorLayout,

    #[arg(long, default_value = "input_1")]
    input_name: String,

    #[arg(long, default_value = "output_1")]
    output_name: String,

    /// Stop after this many pairs
    #[arg(long)]
    limit: Option<usize>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn model_config(&self) -> ModelConfig {
        ModelConfig {
            path: self.model.clone(),
            input_width: self.width,
            input_height: self.height,
            layout: self.layout,
            threshold: self.threshold,
            input_name: self.input_name.clone(),
            output_name: self.output_name.clone(),
            ..ModelConfig::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging("warn", Environment::from_env());

    let mut samples = dataset::load_samples(&args.images, &args.masks)?;
    if let Some(limit) = args.limit {
        samples.truncate(limit);
    }
    if samples.is_empty() {
        anyhow::bail!(
            "No image/mask pairs found in {} and {}",
            args.images.display(),
            args.masks.display()
        );
    }

    let model_config = args.model_config();
    let backend = OrtBackend::load_model(&model_config)?;
    let mut service = SegmentationService::new(backend, &model_config);
    let size = service.input_size();

    let progress = ProgressBar::new(samples.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} [{elapsed_precise}] {msg}")?,
    );

    let mut accumulator = Accumulator::default();
    for sample in &samples {
        progress.set_message(
            sample
                .image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );

        let image = image::open(&sample.image)?;
        let targets = dataset::load_mask(&sample.mask, size)?;

        let (map, _) = service.probabilities(&image)?;
        let (mask, coverage) = service.mask(&map);
        accumulator.record(&map.values, &mask, &targets, &coverage)?;

        progress.inc(1);
    }
    progress.finish_and_clear();

    let summary: Summary = accumulator.summary();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }

    Ok(())
}
