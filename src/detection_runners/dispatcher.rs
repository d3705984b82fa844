//! One synchronous round-trip of a preprocessed tensor through the engine.

use crate::common::Accelerator;
use crate::detection_runners::{BufferSet, ExecStream, InferenceEngine};
use crate::error::Result;

/// Runs `tensor` through `engine` and returns a view of the raw output.
///
/// Everything is issued on `stream`; the final synchronisation is the only
/// blocking point. Device addresses are rebound on every call so the engine
/// never holds stale addresses. Any failing step aborts the frame.
pub fn run<'b, A, E>(
    engine: &mut E,
    stream: &ExecStream<A>,
    buffers: &'b mut BufferSet<A>,
    tensor: &[f32],
) -> Result<&'b [f32]>
where
    A: Accelerator,
    E: InferenceEngine<A> + ?Sized,
{
    buffers.write_input(tensor)?;

    let s = stream.get()?;
    buffers.upload(s)?;

    engine.bind_address(&buffers.input_spec().name, buffers.input_ptr()?)?;
    engine.bind_address(&buffers.output_spec().name, buffers.output_ptr()?)?;

    engine.enqueue(buffers.accelerator(), s)?;
    buffers.download(s)?;
    stream.synchronize()?;

    buffers.read_output()
}
