use thiserror::Error;

use crate::common::DevicePtr;

pub type Result<T, E = DetectError> = std::result::Result<T, E>;

/// Errors raised by an [`Accelerator`](crate::common::Accelerator).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    #[error("out of device memory: requested {requested} bytes, {available} bytes available")]
    OutOfMemory { requested: usize, available: usize },

    #[error("invalid device address {0:?}")]
    InvalidAddress(DevicePtr),

    #[error("transfer of {actual} elements does not fit region of {expected} elements")]
    TransferSize { expected: usize, actual: usize },

    #[error("stream failure: {0}")]
    Stream(String),
}

/// Frame source failures. Both are skip-this-iteration conditions.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,

    #[error("frame source exhausted")]
    Exhausted,
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("shape mismatch on tensor `{tensor}`: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        tensor: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("device allocation failed: {0}")]
    Allocation(#[source] DeviceError),

    #[error("device transfer failed: {0}")]
    Transfer(#[source] DeviceError),

    #[error("engine execution failed: {0}")]
    Execution(String),

    #[error("tensor `{0}` has no bound device address")]
    Unbound(String),

    #[error("preprocessing failed: {0}")]
    Preprocess(String),

    #[error("empty frame")]
    EmptyFrame,

    #[error("detector resources already released")]
    Released,

    #[error(transparent)]
    Ort(#[from] ort::Error),
}

impl DetectError {
    /// Construction-time and contract errors. Everything else only costs the
    /// current frame.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DetectError::ModelLoad { .. }
                | DetectError::InvalidConfig(_)
                | DetectError::ShapeMismatch { .. }
                | DetectError::Allocation(_)
                | DetectError::Released
        )
    }

    pub(crate) fn shape_mismatch(tensor: &str, expected: &[usize], actual: &[usize]) -> Self {
        DetectError::ShapeMismatch {
            tensor: tensor.to_string(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

impl From<FrameError> for DetectError {
    fn from(_: FrameError) -> Self {
        DetectError::EmptyFrame
    }
}
