use std::time::Duration;

use crate::data::Phase;
use crate::error::DetectError;

/// Something a detector reports while it works.
#[derive(Debug)]
pub enum DetectorEvent<'a> {
    PhaseStarted(Phase),
    PhaseFinished(Phase, Duration),
    /// The frame was absent or empty and nothing was run.
    FrameSkipped,
    /// The frame was aborted; the detector is ready for the next one.
    FrameFailed(&'a DetectError),
    FrameDone { detections: usize, elapsed: Duration },
    Released,
}

/// Receives detector events. Injected per detector; there is no global
/// verbosity switch.
pub trait DetectorObserver: Send {
    fn on_event(&mut self, event: DetectorEvent<'_>);
}

/// Forwards events to the `log` facade. Phase timings are only logged when
/// `verbose` is set.
#[derive(Debug, Default, Clone)]
pub struct LogObserver {
    pub verbose: bool,
}

impl LogObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl DetectorObserver for LogObserver {
    fn on_event(&mut self, event: DetectorEvent<'_>) {
        match event {
            DetectorEvent::PhaseStarted(phase) => log::trace!("{phase} started"),
            DetectorEvent::PhaseFinished(phase, t) => {
                if self.verbose {
                    log::debug!("{phase}: {t:.2?}");
                }
            }
            DetectorEvent::FrameSkipped => log::debug!("Skipping empty frame"),
            DetectorEvent::FrameFailed(err) => log::warn!("Frame dropped: {err}"),
            DetectorEvent::FrameDone { detections, elapsed } => {
                if self.verbose {
                    log::info!("{detections} detection(s) in {elapsed:.2?}");
                }
            }
            DetectorEvent::Released => log::debug!("Detector resources released"),
        }
    }
}
