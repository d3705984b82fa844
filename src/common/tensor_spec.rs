use serde::{Deserialize, Serialize};

/// Bytes per element. Engines exchange 32-bit floats with the host.
pub const ELEMENT_BYTES: usize = std::mem::size_of::<f32>();

/// A named engine tensor with its fixed shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<usize>,
}

impl TensorSpec {
    pub fn new(name: &str, shape: &[usize]) -> Self {
        Self {
            name: name.to_string(),
            shape: shape.to_vec(),
        }
    }

    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn num_bytes(&self) -> usize {
        self.num_elements() * ELEMENT_BYTES
    }

    /// `(height, width)` of an NCHW image tensor.
    pub fn image_hw(&self) -> Option<(u32, u32)> {
        match self.shape.as_slice() {
            [1, 3, h, w] if *h > 0 && *w > 0 => Some((*h as u32, *w as u32)),
            _ => None,
        }
    }
}

impl std::fmt::Display for TensorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dims = self
            .shape
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("x");
        write!(f, "{}:{}", self.name, dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_length_is_four_per_element() {
        let spec = TensorSpec::new("images", &[1, 3, 640, 640]);
        assert_eq!(spec.num_elements(), 1_228_800);
        assert_eq!(spec.num_bytes(), 4_915_200);
        assert_eq!(spec.image_hw(), Some((640, 640)));
        assert_eq!(spec.to_string(), "images:1x3x640x640");
    }

    #[test]
    fn batched_input_is_not_an_image_tensor() {
        assert_eq!(TensorSpec::new("images", &[2, 3, 640, 640]).image_hw(), None);
        assert_eq!(TensorSpec::new("output0", &[1, 5, 8400]).image_hw(), None);
    }
}
