//! A detector running on its own thread.

use std::thread::JoinHandle;

use crate::common::{Accelerator, Detection, Frame};
use crate::data::send_channels::{detection_channels, DetectionState, SendState};
use crate::detection_runners::{Detector, InferenceEngine};
use crate::error::{DetectError, Result};

/// Owns a [`Detector`] on a dedicated thread. Frames go in through a bounded
/// channel and detection lists come back in submission order. Dropping the
/// worker closes the channel, lets the thread run the detector's cleanup and
/// joins it.
pub struct DetectionWorker {
    send: Option<SendState>,
    handle: Option<JoinHandle<usize>>,
}

impl DetectionWorker {
    pub fn spawn<E, A>(detector: Detector<E, A>) -> Result<Self>
    where
        A: Accelerator + 'static,
        E: InferenceEngine<A> + 'static,
    {
        let (send, state) = detection_channels();
        let handle = std::thread::Builder::new()
            .name("live_detect-worker".to_string())
            .spawn(move || detection_loop(detector, state))
            .map_err(|e| DetectError::Execution(format!("failed to spawn detector thread: {e}")))?;
        Ok(Self {
            send: Some(send),
            handle: Some(handle),
        })
    }

    fn state(&self) -> Result<&SendState> {
        self.send.as_ref().ok_or(DetectError::Released)
    }

    /// Queues a frame. Blocks while the queue is full, which also happens when
    /// results are left unread.
    pub fn submit(&self, frame: Option<Frame>) -> Result<()> {
        self.state()?
            .frame_tx
            .send(frame)
            .map_err(|_| DetectError::Released)
    }

    /// Next result, blocking until it is ready.
    pub fn recv(&self) -> Result<Vec<Detection>> {
        self.state()?.det_rx.recv().map_err(|_| DetectError::Released)
    }

    pub fn try_recv(&self) -> Option<Vec<Detection>> {
        self.state().ok()?.det_rx.try_recv().ok()
    }

    /// Submits `frame` and waits for its detections.
    pub fn detect(&self, frame: Option<Frame>) -> Result<Vec<Detection>> {
        self.submit(frame)?;
        self.recv()
    }

    /// Closes the queue and waits for the thread. Returns the number of frames
    /// the worker processed.
    pub fn join(mut self) -> usize {
        self.shutdown()
    }

    fn shutdown(&mut self) -> usize {
        drop(self.send.take());
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(n)) => n,
            Some(Err(_)) => {
                log::error!("Detector thread panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn detection_loop<E, A>(mut detector: Detector<E, A>, state: DetectionState) -> usize
where
    A: Accelerator,
    E: InferenceEngine<A>,
{
    let mut processed = 0;
    for frame in state.frame_rx.iter() {
        let detections = detector.infer(frame.as_ref());
        processed += 1;
        if state.det_tx.send(detections).is_err() {
            log::debug!("Result receiver dropped, stopping detector thread");
            break;
        }
    }
    detector.cleanup();
    processed
}
