use crate::config::{DEFAULT_INPUT_SIZE, InputSize, TensorLayout};
use crate::error::SegmentationError;
use common::{span, span_debug};
use fast_image_resize::{PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use image::{DynamicImage, RgbImage};
use ndarray::{Array, ArrayD, IxDyn};

pub struct PreProcessor {
    pub input_size: InputSize,
    pub layout: TensorLayout,
    resizer: Resizer,
}

impl PreProcessor {
    pub fn new(input_size: InputSize, layout: TensorLayout) -> Self {
        Self {
            input_size,
            layout,
            resizer: Resizer::new(),
        }
    }

    /// Resize `image` to the model resolution and build the input tensor.
    ///
    /// Returns the tensor together with the resized RGB image, which is what
    /// the mask lines up with pixel for pixel.
    pub fn preprocess(
        &mut self,
        image: &DynamicImage,
    ) -> Result<(ArrayD<f32>, RgbImage), SegmentationError> {
        let _s = span!("preprocess_image");

        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(SegmentationError::EmptyImage);
        }

        tracing::trace!(
            width,
            height,
            target_width = self.input_size.width,
            target_height = self.input_size.height,
            "Preprocessing image"
        );

        let resized = self.resize(rgb)?;
        let input = self.normalize(&resized)?;

        Ok((input, resized))
    }

    /// Nearest-neighbour resize to the model input size.
    pub fn resize(&mut self, rgb: RgbImage) -> Result<RgbImage, SegmentationError> {
        let _s = span_debug!("resize");

        let InputSize {
            width: dst_width,
            height: dst_height,
        } = self.input_size;

        if rgb.dimensions() == (dst_width, dst_height) {
            return Ok(rgb);
        }

        let (width, height) = rgb.dimensions();
        let src = Image::from_vec_u8(width, height, rgb.into_raw(), PixelType::U8x3)
            .map_err(|e| SegmentationError::Resize(e.to_string()))?;
        let mut dst = Image::new(dst_width, dst_height, PixelType::U8x3);

        self.resizer
            .resize(
                &src,
                &mut dst,
                &ResizeOptions::new().resize_alg(ResizeAlg::Nearest),
            )
            .map_err(|e| SegmentationError::Resize(e.to_string()))?;

        RgbImage::from_raw(dst_width, dst_height, dst.buffer().to_vec()).ok_or_else(|| {
            SegmentationError::Resize("resized buffer does not match target size".to_string())
        })
    }

    /// Scale to `[0, 1]` and lay out as `[1, H, W, 3]` or `[1, 3, H, W]`.
    fn normalize(&self, image: &RgbImage) -> Result<ArrayD<f32>, SegmentationError> {
        let _s = span_debug!("normalize");

        let width = image.width() as usize;
        let height = image.height() as usize;
        let buf = image.as_raw();

        let (shape, output) = match self.layout {
            TensorLayout::Nhwc => {
                let output: Vec<f32> = buf.iter().map(|&v| v as f32 / 255.0).collect();
                ([1, height, width, 3], output)
            }
            TensorLayout::Nchw => {
                let spatial = width * height;
                let mut output = vec![0.0f32; 3 * spatial];
                for (i, px) in buf.chunks_exact(3).enumerate() {
                    output[i] = px[0] as f32 / 255.0;
                    output[i + spatial] = px[1] as f32 / 255.0;
                    output[i + 2 * spatial] = px[2] as f32 / 255.0;
                }
                ([1, 3, height, width], output)
            }
        };

        Array::from_shape_vec(IxDyn(&shape), output)
            .map_err(|e| SegmentationError::DimensionMismatch(e.to_string()))
    }
}

impl Default for PreProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE, TensorLayout::default())
    }
}
