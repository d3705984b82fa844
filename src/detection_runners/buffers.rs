//! Host staging and device regions for one engine, acquired once and
//! reused for every frame.

use std::sync::Arc;

use crate::common::{Accelerator, DevicePtr, TensorSpec};
use crate::error::{DetectError, Result};

#[derive(Debug)]
struct Region {
    spec: TensorSpec,
    host: Option<Box<[f32]>>,
    device: Option<DevicePtr>,
}

impl Region {
    fn new(spec: &TensorSpec) -> Self {
        Self {
            spec: spec.clone(),
            host: None,
            device: None,
        }
    }

    fn acquire<A: Accelerator>(&mut self, accel: &A) -> Result<()> {
        let len = self.spec.num_elements();
        self.host = Some(accel.alloc_host(len).map_err(DetectError::Allocation)?);
        self.device = Some(accel.alloc_device(len).map_err(DetectError::Allocation)?);
        log::debug!("Allocated {} ({} bytes host + device)", self.spec, self.spec.num_bytes());
        Ok(())
    }

    /// Device region first, then host, each at most once.
    fn release<A: Accelerator>(&mut self, accel: &A) {
        if let Some(ptr) = self.device.take() {
            if let Err(err) = accel.free_device(ptr) {
                log::warn!("Failed to free device buffer of {}: {err}", self.spec.name);
            }
        }
        if let Some(host) = self.host.take() {
            if let Err(err) = accel.free_host(host) {
                log::warn!("Failed to free host buffer of {}: {err}", self.spec.name);
            }
        }
    }

    fn host(&self) -> Result<&[f32]> {
        self.host.as_deref().ok_or(DetectError::Released)
    }

    fn host_mut(&mut self) -> Result<&mut [f32]> {
        self.host.as_deref_mut().ok_or(DetectError::Released)
    }

    fn device(&self) -> Result<DevicePtr> {
        self.device.ok_or(DetectError::Released)
    }
}

/// One host staging buffer and one device buffer per tensor.
///
/// Acquisition order is input host, input device, output host, output
/// device; [`BufferSet::release`] frees in exactly the reverse order. A
/// failed acquisition releases whatever was already acquired before the
/// error is returned.
#[derive(Debug)]
pub struct BufferSet<A: Accelerator> {
    accel: Arc<A>,
    input: Region,
    output: Region,
}

impl<A: Accelerator> BufferSet<A> {
    pub fn allocate(accel: Arc<A>, input: &TensorSpec, output: &TensorSpec) -> Result<Self> {
        let mut set = Self {
            accel,
            input: Region::new(input),
            output: Region::new(output),
        };
        // On error `set` drops here and releases the partial acquisition.
        set.input.acquire(&*set.accel)?;
        set.output.acquire(&*set.accel)?;
        Ok(set)
    }

    pub fn accelerator(&self) -> &A {
        &self.accel
    }

    pub fn input_spec(&self) -> &TensorSpec {
        &self.input.spec
    }

    pub fn output_spec(&self) -> &TensorSpec {
        &self.output.spec
    }

    pub fn input_ptr(&self) -> Result<DevicePtr> {
        self.input.device()
    }

    pub fn output_ptr(&self) -> Result<DevicePtr> {
        self.output.device()
    }

    /// Copies a preprocessed tensor into the input staging buffer. The element
    /// count must match the input tensor exactly.
    pub fn write_input(&mut self, data: &[f32]) -> Result<()> {
        let expected = self.input.spec.num_elements();
        if data.len() != expected {
            return Err(DetectError::shape_mismatch(
                &self.input.spec.name,
                &self.input.spec.shape,
                &[data.len()],
            ));
        }
        self.input.host_mut()?.copy_from_slice(data);
        Ok(())
    }

    /// Queues the staged input for upload.
    pub fn upload(&self, stream: &A::Stream) -> Result<()> {
        self.accel
            .copy_to_device_async(self.input.host()?, self.input.device()?, stream)
            .map_err(DetectError::Transfer)
    }

    /// Queues the device output for download into the host staging buffer.
    pub fn download(&mut self, stream: &A::Stream) -> Result<()> {
        let src = self.output.device()?;
        let dst = self.output.host.as_deref_mut().ok_or(DetectError::Released)?;
        self.accel
            .copy_to_host_async(src, dst, stream)
            .map_err(DetectError::Transfer)
    }

    /// Host copy of the engine output, valid after a synchronised round-trip.
    pub fn read_output(&self) -> Result<&[f32]> {
        self.output.host()
    }

    pub fn is_released(&self) -> bool {
        self.input.host.is_none()
            && self.input.device.is_none()
            && self.output.host.is_none()
            && self.output.device.is_none()
    }

    /// Frees everything still held. Safe to call more than once.
    pub fn release(&mut self) {
        self.output.release(&*self.accel);
        self.input.release(&*self.accel);
    }
}

impl<A: Accelerator> Drop for BufferSet<A> {
    fn drop(&mut self) {
        self.release();
    }
}
