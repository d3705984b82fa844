use std::sync::Arc;

use crate::common::Accelerator;
use crate::error::{DetectError, Result};

/// Owns one execution stream and destroys it on drop.
pub struct ExecStream<A: Accelerator> {
    accel: Arc<A>,
    stream: Option<A::Stream>,
}

impl<A: Accelerator> ExecStream<A> {
    pub fn new(accel: Arc<A>) -> Result<Self> {
        let stream = accel.create_stream().map_err(DetectError::Allocation)?;
        Ok(Self {
            accel,
            stream: Some(stream),
        })
    }

    pub fn get(&self) -> Result<&A::Stream> {
        self.stream.as_ref().ok_or(DetectError::Released)
    }

    /// Blocks until all work issued on the stream is done.
    pub fn synchronize(&self) -> Result<()> {
        self.accel
            .synchronize(self.get()?)
            .map_err(DetectError::Transfer)
    }

    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = self.accel.destroy_stream(stream) {
                log::warn!("Failed to destroy execution stream: {err}");
            }
        }
    }
}

impl<A: Accelerator> Drop for ExecStream<A> {
    fn drop(&mut self) {
        self.release();
    }
}
