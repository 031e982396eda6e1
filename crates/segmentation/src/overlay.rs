use crate::error::SegmentationError;
use crate::font::{draw_text, text_size};
use crate::processing::post::{Coverage, WETLAND};
use common::span;
use image::{GrayImage, Rgb, RgbImage, imageops};

/// Ends of the "Reds" colour map; the mask is binary so only these are used.
const REDS_LOW: [u8; 3] = [0xff, 0xf5, 0xf0];
const REDS_HIGH: [u8; 3] = [0x67, 0x00, 0x0d];
const MASK_ALPHA: f32 = 0.5;
const CAPTION_BOX_ALPHA: f32 = 0.7;
const CAPTION_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

pub fn caption(coverage: &Coverage) -> String {
    format!("Wetland Area: {:.2}%", coverage.percentage)
}

/// Blend the mask over the model-resolution image, upscale by `scale` and
/// stamp the coverage caption in the top-left corner.
pub fn render_overlay(
    resized: &RgbImage,
    mask: &GrayImage,
    coverage: &Coverage,
    scale: u32,
) -> Result<RgbImage, SegmentationError> {
    let _s = span!("render_overlay");

    if resized.dimensions() != mask.dimensions() {
        return Err(SegmentationError::DimensionMismatch(format!(
            "image is {:?}, mask is {:?}",
            resized.dimensions(),
            mask.dimensions()
        )));
    }

    let blended = RgbImage::from_fn(resized.width(), resized.height(), |x, y| {
        let base = resized.get_pixel(x, y);
        let tint = if mask.get_pixel(x, y)[0] == WETLAND {
            REDS_HIGH
        } else {
            REDS_LOW
        };
        Rgb([
            blend(base[0], tint[0], MASK_ALPHA),
            blend(base[1], tint[1], MASK_ALPHA),
            blend(base[2], tint[2], MASK_ALPHA),
        ])
    });

    let scale = scale.max(1);
    let mut output = if scale == 1 {
        blended
    } else {
        imageops::resize(
            &blended,
            blended.width() * scale,
            blended.height() * scale,
            imageops::FilterType::Nearest,
        )
    };

    draw_caption(&mut output, &caption(coverage), scale);

    Ok(output)
}

fn draw_caption(image: &mut RgbImage, text: &str, scale: u32) {
    let margin = 4 * scale;
    let padding = 2 * scale;
    let (text_width, text_height) = text_size(text, scale);

    let box_right = (margin + text_width + 2 * padding).min(image.width());
    let box_bottom = (margin + text_height + 2 * padding).min(image.height());

    for y in margin.min(box_bottom)..box_bottom {
        for x in margin.min(box_right)..box_right {
            let px = image.get_pixel_mut(x, y);
            for c in 0..3 {
                px[c] = blend(px[c], 0, CAPTION_BOX_ALPHA);
            }
        }
    }

    draw_text(
        image,
        text,
        margin + padding,
        margin + padding,
        scale,
        CAPTION_COLOR,
    );
}

#[inline]
fn blend(base: u8, over: u8, alpha: f32) -> u8 {
    (base as f32 * (1.0 - alpha) + over as f32 * alpha).round() as u8
}
