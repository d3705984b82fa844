//! The accelerator seam.
//!
//! An [`Accelerator`] hands out transfer-optimised host buffers, device
//! regions addressed by [`DevicePtr`], and ordered execution streams. Copies
//! and engine work are issued against a stream and only guaranteed complete
//! after [`Accelerator::synchronize`] returns.
//!
//! [`HostAccelerator`] keeps "device" regions in host memory. It backs
//! engines that manage their own accelerator internally (ONNX Runtime with
//! the TensorRT/CUDA providers) and is the test double for the buffer
//! lifecycle: every acquisition and release goes through its ledger.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::common::ELEMENT_BYTES;
use crate::error::DeviceError;

/// Opaque address of a device-resident region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DevicePtr(pub u64);

pub trait Accelerator: Send + Sync {
    type Stream: Send;

    fn create_stream(&self) -> Result<Self::Stream, DeviceError>;

    fn destroy_stream(&self, stream: Self::Stream) -> Result<(), DeviceError>;

    /// Allocates a host staging buffer of `len` f32 elements.
    fn alloc_host(&self, len: usize) -> Result<Box<[f32]>, DeviceError>;

    fn free_host(&self, buffer: Box<[f32]>) -> Result<(), DeviceError>;

    /// Allocates a device region of `len` f32 elements.
    fn alloc_device(&self, len: usize) -> Result<DevicePtr, DeviceError>;

    fn free_device(&self, ptr: DevicePtr) -> Result<(), DeviceError>;

    fn copy_to_device_async(
        &self,
        src: &[f32],
        dst: DevicePtr,
        stream: &Self::Stream,
    ) -> Result<(), DeviceError>;

    fn copy_to_host_async(
        &self,
        src: DevicePtr,
        dst: &mut [f32],
        stream: &Self::Stream,
    ) -> Result<(), DeviceError>;

    /// Blocks until every operation issued on `stream` has completed.
    fn synchronize(&self, stream: &Self::Stream) -> Result<(), DeviceError>;
}

/// Counters kept by [`HostAccelerator`]. Used as an allocation-count probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationStats {
    pub host_allocations: usize,
    pub host_frees: usize,
    pub device_allocations: usize,
    pub device_frees: usize,
    pub streams_created: usize,
    pub streams_destroyed: usize,
    pub live_device_bytes: usize,
    pub peak_device_bytes: usize,
}

impl AllocationStats {
    pub fn total_allocations(&self) -> usize {
        self.host_allocations + self.device_allocations
    }

    /// True when everything acquired has been handed back.
    pub fn is_balanced(&self) -> bool {
        self.host_allocations == self.host_frees
            && self.device_allocations == self.device_frees
            && self.streams_created == self.streams_destroyed
    }
}

/// Release events in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    HostFreed { len: usize },
    DeviceFreed { ptr: DevicePtr, len: usize },
    StreamDestroyed { id: u64 },
}

#[derive(Debug)]
pub struct HostStream {
    id: u64,
    issued: AtomicUsize,
}

impl HostStream {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Operations issued since the last synchronisation.
    pub fn pending(&self) -> usize {
        self.issued.load(Ordering::Acquire)
    }

    fn issue(&self) {
        self.issued.fetch_add(1, Ordering::AcqRel);
    }
}

#[derive(Debug, Default)]
struct HostState {
    regions: HashMap<u64, Vec<f32>>,
    stats: AllocationStats,
    releases: Vec<LedgerEvent>,
    fail_syncs: usize,
}

#[derive(Debug, Default)]
pub struct HostAccelerator {
    state: Mutex<HostState>,
    next_id: AtomicU64,
    memory_limit: Option<usize>,
}

impl HostAccelerator {
    pub fn new() -> Self {
        Default::default()
    }

    /// Device allocations beyond `bytes` live bytes fail with `OutOfMemory`.
    pub fn with_memory_limit(bytes: usize) -> Self {
        Self {
            memory_limit: Some(bytes),
            ..Default::default()
        }
    }

    pub fn stats(&self) -> AllocationStats {
        self.state.lock().stats
    }

    pub fn releases(&self) -> Vec<LedgerEvent> {
        self.state.lock().releases.clone()
    }

    /// Makes the next `n` stream synchronisations fail.
    pub fn fail_next_syncs(&self, n: usize) {
        self.state.lock().fail_syncs = n;
    }

    /// Runs `f` over the contents of a device region.
    pub fn with_device<R>(
        &self,
        ptr: DevicePtr,
        f: impl FnOnce(&[f32]) -> R,
    ) -> Result<R, DeviceError> {
        let state = self.state.lock();
        let region = state
            .regions
            .get(&ptr.0)
            .ok_or(DeviceError::InvalidAddress(ptr))?;
        Ok(f(region))
    }

    /// Overwrites a device region. `data` must cover it exactly.
    pub fn write_device(&self, ptr: DevicePtr, data: &[f32]) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        let region = state
            .regions
            .get_mut(&ptr.0)
            .ok_or(DeviceError::InvalidAddress(ptr))?;
        if region.len() != data.len() {
            return Err(DeviceError::TransferSize {
                expected: region.len(),
                actual: data.len(),
            });
        }
        region.copy_from_slice(data);
        Ok(())
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Accelerator for HostAccelerator {
    type Stream = HostStream;

    fn create_stream(&self) -> Result<HostStream, DeviceError> {
        self.state.lock().stats.streams_created += 1;
        Ok(HostStream {
            id: self.next_id(),
            issued: AtomicUsize::new(0),
        })
    }

    fn destroy_stream(&self, stream: HostStream) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        state.stats.streams_destroyed += 1;
        state.releases.push(LedgerEvent::StreamDestroyed { id: stream.id });
        Ok(())
    }

    fn alloc_host(&self, len: usize) -> Result<Box<[f32]>, DeviceError> {
        self.state.lock().stats.host_allocations += 1;
        Ok(vec![0.0f32; len].into_boxed_slice())
    }

    fn free_host(&self, buffer: Box<[f32]>) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        state.stats.host_frees += 1;
        state.releases.push(LedgerEvent::HostFreed { len: buffer.len() });
        Ok(())
    }

    fn alloc_device(&self, len: usize) -> Result<DevicePtr, DeviceError> {
        let bytes = len * ELEMENT_BYTES;
        let id = self.next_id();
        let mut state = self.state.lock();
        if let Some(limit) = self.memory_limit {
            let available = limit.saturating_sub(state.stats.live_device_bytes);
            if bytes > available {
                return Err(DeviceError::OutOfMemory {
                    requested: bytes,
                    available,
                });
            }
        }
        state.regions.insert(id, vec![0.0f32; len]);
        let stats = &mut state.stats;
        stats.device_allocations += 1;
        stats.live_device_bytes += bytes;
        stats.peak_device_bytes = stats.peak_device_bytes.max(stats.live_device_bytes);
        Ok(DevicePtr(id))
    }

    fn free_device(&self, ptr: DevicePtr) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        let region = state
            .regions
            .remove(&ptr.0)
            .ok_or(DeviceError::InvalidAddress(ptr))?;
        state.stats.device_frees += 1;
        state.stats.live_device_bytes -= region.len() * ELEMENT_BYTES;
        state.releases.push(LedgerEvent::DeviceFreed {
            ptr,
            len: region.len(),
        });
        Ok(())
    }

    fn copy_to_device_async(
        &self,
        src: &[f32],
        dst: DevicePtr,
        stream: &HostStream,
    ) -> Result<(), DeviceError> {
        self.write_device(dst, src)?;
        stream.issue();
        Ok(())
    }

    fn copy_to_host_async(
        &self,
        src: DevicePtr,
        dst: &mut [f32],
        stream: &HostStream,
    ) -> Result<(), DeviceError> {
        let state = self.state.lock();
        let region = state
            .regions
            .get(&src.0)
            .ok_or(DeviceError::InvalidAddress(src))?;
        if region.len() != dst.len() {
            return Err(DeviceError::TransferSize {
                expected: dst.len(),
                actual: region.len(),
            });
        }
        dst.copy_from_slice(region);
        stream.issue();
        Ok(())
    }

    fn synchronize(&self, stream: &HostStream) -> Result<(), DeviceError> {
        stream.issued.store(0, Ordering::Release);
        let mut state = self.state.lock();
        if state.fail_syncs > 0 {
            state.fail_syncs -= 1;
            return Err(DeviceError::Stream(format!(
                "stream {} reported a failed operation",
                stream.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_regions_round_trip_through_a_stream() {
        let accel = HostAccelerator::new();
        let stream = accel.create_stream().unwrap();
        let ptr = accel.alloc_device(4).unwrap();

        accel
            .copy_to_device_async(&[1.0, 2.0, 3.0, 4.0], ptr, &stream)
            .unwrap();
        let mut back = [0.0f32; 4];
        accel.copy_to_host_async(ptr, &mut back, &stream).unwrap();
        assert_eq!(stream.pending(), 2);
        accel.synchronize(&stream).unwrap();
        assert_eq!(stream.pending(), 0);
        assert_eq!(back, [1.0, 2.0, 3.0, 4.0]);

        accel.free_device(ptr).unwrap();
        accel.destroy_stream(stream).unwrap();
        assert!(accel.stats().is_balanced());
    }

    #[test]
    fn memory_limit_rejects_oversized_allocations() {
        let accel = HostAccelerator::with_memory_limit(64);
        let first = accel.alloc_device(8).unwrap();
        let err = accel.alloc_device(16).unwrap_err();
        assert_eq!(
            err,
            DeviceError::OutOfMemory {
                requested: 64,
                available: 32
            }
        );
        accel.free_device(first).unwrap();
        assert_eq!(accel.stats().live_device_bytes, 0);
        assert_eq!(accel.stats().peak_device_bytes, 32);
    }

    #[test]
    fn double_free_is_reported() {
        let accel = HostAccelerator::new();
        let ptr = accel.alloc_device(1).unwrap();
        accel.free_device(ptr).unwrap();
        assert_eq!(
            accel.free_device(ptr),
            Err(DeviceError::InvalidAddress(ptr))
        );
    }

    #[test]
    fn injected_sync_failures_are_consumed() {
        let accel = HostAccelerator::new();
        let stream = accel.create_stream().unwrap();
        accel.fail_next_syncs(1);
        assert!(matches!(
            accel.synchronize(&stream),
            Err(DeviceError::Stream(_))
        ));
        assert!(accel.synchronize(&stream).is_ok());
    }

    #[test]
    fn mismatched_transfers_are_rejected() {
        let accel = HostAccelerator::new();
        let stream = accel.create_stream().unwrap();
        let ptr = accel.alloc_device(3).unwrap();
        assert_eq!(
            accel.copy_to_device_async(&[0.0; 4], ptr, &stream),
            Err(DeviceError::TransferSize {
                expected: 3,
                actual: 4
            })
        );
    }
}
