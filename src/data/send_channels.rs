use crate::common::{Detection, Frame};

/// Capacity of the frame and result queues of a worker. A full queue blocks
/// its producer instead of buffering stale frames or unread results.
pub const FRAME_QUEUE: usize = 2;

/// Worker-side ends.
#[derive(Debug)]
pub struct DetectionState {
    pub frame_rx: crossbeam_channel::Receiver<Option<Frame>>,
    pub det_tx: crossbeam_channel::Sender<Vec<Detection>>,
}

/// Caller-side ends.
#[derive(Debug)]
pub struct SendState {
    pub frame_tx: crossbeam_channel::Sender<Option<Frame>>,
    pub det_rx: crossbeam_channel::Receiver<Vec<Detection>>,
}

pub fn detection_channels() -> (SendState, DetectionState) {
    let (frame_tx, frame_rx) = crossbeam_channel::bounded(FRAME_QUEUE);
    let (det_tx, det_rx) = crossbeam_channel::bounded(FRAME_QUEUE);
    (
        SendState { frame_tx, det_rx },
        DetectionState { frame_rx, det_tx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_queues_are_bounded() {
        let (send, state) = detection_channels();
        assert_eq!(send.frame_tx.capacity(), Some(FRAME_QUEUE));
        assert_eq!(state.det_tx.capacity(), Some(FRAME_QUEUE));

        for _ in 0..FRAME_QUEUE {
            state.det_tx.try_send(vec![]).unwrap();
        }
        assert!(state.det_tx.try_send(vec![]).unwrap_err().is_full());
        assert!(send.det_rx.recv().unwrap().is_empty());
        state.det_tx.try_send(vec![]).unwrap();
    }
}
