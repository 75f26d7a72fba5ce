//! ONNX Runtime session construction.
//!
//! Both model capabilities build their sessions here from an explicit
//! [`InferenceConfig`], so execution settings travel with the object that
//! uses them instead of living in process-wide state.

use crate::{config::InferenceConfig, Result};
use log::info;
use ort::{Environment, ExecutionProvider, GraphOptimizationLevel, LoggingLevel, Session, SessionBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hardware the ONNX sessions run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionTarget {
    /// Default CPU provider
    #[default]
    Cpu,
    /// CUDA provider, falling back to CPU if it cannot be registered
    Cuda,
}

/// Create an inference session for the model at `model_path`
///
/// # Errors
///
/// Returns an error if:
/// - The ONNX Runtime environment cannot be created
/// - The model file cannot be loaded or parsed
pub fn build_session<P: AsRef<Path>>(name: &str, model_path: P, config: &InferenceConfig) -> Result<Session> {
    info!(
        "Loading {} model from {} ({:?})",
        name,
        model_path.as_ref().display(),
        config.execution
    );

    let mut environment = Environment::builder()
        .with_name(name)
        .with_log_level(LoggingLevel::Warning);

    if config.execution == ExecutionTarget::Cuda {
        environment = environment.with_execution_providers([ExecutionProvider::CUDA(Default::default())]);
    }

    let environment = environment.build()?.into_arc();

    let mut builder = SessionBuilder::new(&environment)?.with_optimization_level(GraphOptimizationLevel::Level3)?;
    if let Some(threads) = config.intra_threads {
        builder = builder.with_intra_threads(threads)?;
    }

    Ok(builder.with_model_from_file(model_path)?)
}
