use image::{GrayImage, imageops};
use segmentation::InputSize;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff"];

/// An image and its ground-truth mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub image: PathBuf,
    pub mask: PathBuf,
}

/// Image files directly inside `dir`, sorted by name.
pub fn list_images(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let pattern = dir.join("*");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Non UTF-8 path: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in glob::glob(pattern)? {
        let path = entry?;
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()));
        if path.is_file() && is_image {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Pair images with masks by sorted position.
pub fn pair_samples(images: Vec<PathBuf>, masks: Vec<PathBuf>) -> Vec<Sample> {
    if images.len() != masks.len() {
        tracing::warn!(
            images = images.len(),
            masks = masks.len(),
            "Image and mask counts differ; extra files are ignored"
        );
    }

    images
        .into_iter()
        .zip(masks)
        .map(|(image, mask)| Sample { image, mask })
        .collect()
}

pub fn load_samples(image_dir: &Path, mask_dir: &Path) -> anyhow::Result<Vec<Sample>> {
    Ok(pair_samples(list_images(image_dir)?, list_images(mask_dir)?))
}

/// Load a mask as grayscale at model resolution, normalized to `[0, 1]`.
pub fn load_mask(path: &Path, size: InputSize) -> anyhow::Result<Vec<f32>> {
    let mask = image::open(path)?.to_luma8();
    Ok(normalize_mask(&mask, size))
}

pub fn normalize_mask(mask: &GrayImage, size: InputSize) -> Vec<f32> {
    let resized;
    let mask = if mask.dimensions() == (size.width, size.height) {
        mask
    } else {
        resized = imageops::resize(mask, size.width, size.height, imageops::FilterType::Nearest);
        &resized
    };

    mask.as_raw().iter().map(|&v| v as f32 / 255.0).collect()
}
