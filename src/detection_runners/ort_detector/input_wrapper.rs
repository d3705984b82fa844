use ndarray::{Array, IxDyn};

use crate::error::{DetectError, Result};

/// Model input, wrapper over [`Array<f32, IxDyn>`]
#[derive(Debug, Clone, Default)]
pub struct X(pub Array<f32, IxDyn>);

impl From<Array<f32, IxDyn>> for X {
    fn from(x: Array<f32, IxDyn>) -> Self {
        Self(x)
    }
}

impl std::ops::Deref for X {
    type Target = Array<f32, IxDyn>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl X {
    pub fn from_shape_vec(shape: &[usize], xs: Vec<f32>) -> Result<Self> {
        let actual = xs.len();
        let array = Array::from_shape_vec(shape, xs).map_err(|_| {
            DetectError::shape_mismatch("input", shape, &[actual])
        })?;
        Ok(Self(array))
    }

    /// Contiguous element view in logical order.
    pub fn as_flat(&self) -> Result<&[f32]> {
        self.0
            .as_slice()
            .ok_or_else(|| DetectError::Preprocess("input tensor is not contiguous".to_string()))
    }
}
