//! Real-time object detection on a fixed-shape inference engine.
//!
//! Each frame is letterboxed to the engine input, run through a preallocated
//! host/device buffer set on a single stream, decoded according to the
//! configured output layout, mapped back to frame pixels and filtered with
//! non-maximum suppression. See [`Detector`] for the per-frame entry point
//! and [`init_detector`] for the ONNX Runtime backed setup.

mod utils;
pub mod common;
pub mod data;
pub mod detection_runners;
pub mod error;

use std::sync::Arc;

use anyhow::Context;

pub use crate::common::{
    Accelerator, ChannelOrder, Detection, DetectorConfig, Frame, FrameSource, HostAccelerator,
    InferenceDevice, OutputLayout, TensorSpec,
};
pub use crate::data::EngineOptions;
pub use crate::detection_runners::{
    DetectionWorker, Detector, DetectorEvent, DetectorObserver, InferenceEngine, LogObserver,
    OrtEngine,
};
pub use crate::error::{DetectError, DeviceError, FrameError, Result};

/// Detector backed by ONNX Runtime.
pub type OrtDetector = Detector<OrtEngine, HostAccelerator>;

/// Loads the model described by `config`, builds the detector and runs the
/// configured number of warm-up frames.
pub fn init_detector(config: &DetectorConfig) -> anyhow::Result<OrtDetector> {
    let mut config = config.clone();
    config.validate().context("Invalid detector configuration")?;
    config.class_names = config.resolve_class_names()?;

    log::info!(
        "Initializing ORT session with ({}) execution provider",
        config.engine.device
    );
    let engine = OrtEngine::new(&config)
        .with_context(|| format!("Failed to load model {}", config.model_path))?;

    let embedded = engine.class_names();
    if !config.class_names.is_empty()
        && !embedded.is_empty()
        && config.class_names.len() != embedded.len()
    {
        anyhow::bail!(
            "The lengths of parsed class names: {} and user-defined class names: {} do not match.",
            embedded.len(),
            config.class_names.len(),
        );
    }

    let num_dry_run = config.engine.num_dry_run;
    let mut detector = Detector::new(config, engine, Arc::new(HostAccelerator::new()))?;
    detector
        .dry_run(num_dry_run)
        .context("Warm-up inference failed")?;
    Ok(detector)
}
