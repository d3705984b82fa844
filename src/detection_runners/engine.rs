//! The engine-runtime seam.

use std::collections::HashMap;

use crate::common::{Accelerator, DevicePtr, TensorSpec};
use crate::error::{DetectError, Result};

/// A loaded model with fixed input/output tensors that executes against
/// device addresses bound by the caller.
pub trait InferenceEngine<A: Accelerator>: Send {
    fn input_spec(&self) -> &TensorSpec;

    fn output_spec(&self) -> &TensorSpec;

    /// Associates a device address with a named tensor. Rebinding the same
    /// address is a no-op.
    fn bind_address(&mut self, tensor: &str, ptr: DevicePtr) -> Result<()>;

    /// Issues one forward pass on `stream`. Results are only guaranteed to be
    /// in the output region after the stream is synchronised.
    fn enqueue(&mut self, accel: &A, stream: &A::Stream) -> Result<()>;

    /// Class names embedded in the model, if any.
    fn class_names(&self) -> &[String] {
        &[]
    }
}

/// Name to address table shared by engine implementations.
#[derive(Debug, Default, Clone)]
pub struct TensorBindings {
    names: Vec<String>,
    addresses: HashMap<String, DevicePtr>,
}

impl TensorBindings {
    pub fn new(specs: &[&TensorSpec]) -> Self {
        Self {
            names: specs.iter().map(|s| s.name.clone()).collect(),
            addresses: HashMap::with_capacity(specs.len()),
        }
    }

    pub fn bind(&mut self, tensor: &str, ptr: DevicePtr) -> Result<()> {
        if !self.names.iter().any(|n| n == tensor) {
            return Err(DetectError::InvalidConfig(format!(
                "engine has no tensor named `{tensor}`"
            )));
        }
        match self.addresses.get_mut(tensor) {
            Some(bound) => *bound = ptr,
            None => {
                self.addresses.insert(tensor.to_string(), ptr);
            }
        }
        Ok(())
    }

    pub fn get(&self, tensor: &str) -> Result<DevicePtr> {
        self.addresses
            .get(tensor)
            .copied()
            .ok_or_else(|| DetectError::Unbound(tensor.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_and_unbound_tensors_are_errors() {
        let input = TensorSpec::new("images", &[1, 3, 2, 2]);
        let output = TensorSpec::new("output0", &[1, 5, 4]);
        let mut bindings = TensorBindings::new(&[&input, &output]);

        assert!(matches!(bindings.get("images"), Err(DetectError::Unbound(_))));
        assert!(bindings.bind("logits", DevicePtr(1)).is_err());

        bindings.bind("images", DevicePtr(7)).unwrap();
        bindings.bind("images", DevicePtr(7)).unwrap();
        assert_eq!(bindings.get("images").unwrap(), DevicePtr(7));
    }
}
