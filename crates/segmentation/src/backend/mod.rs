use ndarray::ArrayD;

#[cfg(feature = "ort-backend")]
pub mod ort;

pub trait SegmentationBackend {
    /// Run the model on one preprocessed image and return the raw
    /// per-pixel probability tensor.
    fn infer(&mut self, input: &ArrayD<f32>) -> anyhow::Result<ArrayD<f32>>;
}

/// Type-erased backend, for holders that must not be generic over the model.
pub type BoxedBackend = Box<dyn SegmentationBackend + Send>;

impl<B: SegmentationBackend + ?Sized> SegmentationBackend for Box<B> {
    fn infer(&mut self, input: &ArrayD<f32>) -> anyhow::Result<ArrayD<f32>> {
        (**self).infer(input)
    }
}
