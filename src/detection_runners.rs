mod buffers;
mod decoder;
mod detector;
pub mod dispatcher;
mod engine;
mod observer;
pub mod ort_detector;
mod rectify;
mod stream;
mod worker;

pub use buffers::BufferSet;
pub use decoder::Decoder;
pub use detector::Detector;
pub use engine::{InferenceEngine, TensorBindings};
pub use observer::{DetectorEvent, DetectorObserver, LogObserver};
pub use ort_detector::*;
pub use rectify::rectify;
pub use stream::ExecStream;
pub use worker::DetectionWorker;
