use super::SegmentationBackend;
use crate::config::ModelConfig;
use ndarray::ArrayD;
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};

#[derive(Debug, Clone, Copy, Default)]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    #[cfg(feature = "cuda")]
    Cuda,
}

pub struct OrtBackend {
    session: Session,
    input_name: String,
    output_name: String,
}

impl OrtBackend {
    pub fn load_model(config: &ModelConfig) -> anyhow::Result<Self> {
        #[cfg(feature = "cuda")]
        let provider = ExecutionProvider::Cuda;
        #[cfg(not(feature = "cuda"))]
        let provider = ExecutionProvider::Cpu;

        Self::load_model_with_provider(config, provider)
    }

    /// Load model with specified execution provider
    pub fn load_model_with_provider(
        config: &ModelConfig,
        provider: ExecutionProvider,
    ) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        #[allow(unused_mut)]
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.intra_threads)?;

        match provider {
            #[cfg(feature = "cuda")]
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder.commit_from_file(&config.path)?;

        tracing::info!(
            path = %config.path,
            input = %config.input_name,
            output = %config.output_name,
            "Model loaded"
        );
        Ok(Self {
            session,
            input_name: config.input_name.clone(),
            output_name: config.output_name.clone(),
        })
    }
}

impl SegmentationBackend for OrtBackend {
    fn infer(&mut self, input: &ArrayD<f32>) -> anyhow::Result<ArrayD<f32>> {
        let outputs = self.session.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(input.view())?
        ])?;

        let probabilities = outputs[self.output_name.as_str()].try_extract_array::<f32>()?;

        Ok(probabilities.into_owned())
    }
}
