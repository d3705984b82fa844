#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use live_detect::common::{DevicePtr, HostStream};
use live_detect::detection_runners::TensorBindings;
use live_detect::{
    DetectError, DetectorConfig, DetectorEvent, DetectorObserver, Frame, HostAccelerator,
    InferenceEngine, OutputLayout, Result, TensorSpec,
};

/// Shared view into a [`SyntheticEngine`] that stays usable after the engine
/// has been moved into a detector.
#[derive(Debug, Default)]
pub struct EngineProbe {
    pub enqueues: AtomicUsize,
    pub fail_next: AtomicUsize,
    pub dropped: AtomicBool,
    pub last_input_mean: Mutex<f32>,
}

impl EngineProbe {
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn enqueues(&self) -> usize {
        self.enqueues.load(Ordering::SeqCst)
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

/// Engine that answers every forward pass with a canned output tensor,
/// cycling through `responses` call by call.
pub struct SyntheticEngine {
    input: TensorSpec,
    output: TensorSpec,
    bindings: TensorBindings,
    responses: Vec<Vec<f32>>,
    probe: Arc<EngineProbe>,
}

impl SyntheticEngine {
    pub fn new(input_hw: (usize, usize), output_shape: &[usize], responses: Vec<Vec<f32>>) -> Self {
        let input = TensorSpec::new("images", &[1, 3, input_hw.0, input_hw.1]);
        let output = TensorSpec::new("output0", output_shape);
        for r in &responses {
            assert_eq!(r.len(), output.num_elements());
        }
        Self {
            bindings: TensorBindings::new(&[&input, &output]),
            input,
            output,
            responses,
            probe: Arc::new(EngineProbe::default()),
        }
    }

    pub fn probe(&self) -> Arc<EngineProbe> {
        self.probe.clone()
    }
}

impl InferenceEngine<HostAccelerator> for SyntheticEngine {
    fn input_spec(&self) -> &TensorSpec {
        &self.input
    }

    fn output_spec(&self) -> &TensorSpec {
        &self.output
    }

    fn bind_address(&mut self, tensor: &str, ptr: DevicePtr) -> Result<()> {
        self.bindings.bind(tensor, ptr)
    }

    fn enqueue(&mut self, accel: &HostAccelerator, _stream: &HostStream) -> Result<()> {
        let n = self.probe.enqueues.fetch_add(1, Ordering::SeqCst);
        let pending_failures = self.probe.fail_next.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.probe.fail_next.store(pending_failures - 1, Ordering::SeqCst);
            return Err(DetectError::Execution("injected engine failure".to_string()));
        }

        let input = self.bindings.get(&self.input.name)?;
        let mean = accel
            .with_device(input, |x| x.iter().sum::<f32>() / x.len() as f32)
            .map_err(DetectError::Transfer)?;
        *self.probe.last_input_mean.lock().unwrap() = mean;

        let output = self.bindings.get(&self.output.name)?;
        let response = &self.responses[n % self.responses.len()];
        accel.write_device(output, response).map_err(DetectError::Transfer)
    }
}

impl Drop for SyntheticEngine {
    fn drop(&mut self) {
        self.probe.dropped.store(true, Ordering::SeqCst);
    }
}

/// Channel-major `[1, 5, N]` output from `[cx, cy, w, h, conf]` rows.
pub fn center_transposed(rows: &[[f32; 5]]) -> Vec<f32> {
    (0..5)
        .flat_map(|c| rows.iter().map(move |r| r[c]))
        .collect()
}

/// One confident object at original `[100, 100, 300, 300]` of a 1280x720
/// frame letterboxed into 640x640, a weaker duplicate of it, and one row
/// below the default confidence threshold.
pub fn hd_response() -> Vec<f32> {
    center_transposed(&[
        [100.0, 240.0, 100.0, 100.0, 0.9],
        [102.0, 241.0, 100.0, 100.0, 0.6],
        [300.0, 300.0, 50.0, 50.0, 0.2],
    ])
}

pub fn hd_engine() -> SyntheticEngine {
    SyntheticEngine::new((640, 640), &[1, 5, 3], vec![hd_response()])
}

pub fn config() -> DetectorConfig {
    DetectorConfig::new()
        .with_model("synthetic")
        .with_confidence_threshold(0.5)
        .with_iou_threshold(0.45)
        .with_output_layout(OutputLayout::CenterTransposed)
        .with_input_tensor("images", &[1, 3, 640, 640])
        .with_output_tensor("output0", &[1, 5, 3])
}

/// A 1280x720 BGR frame with a filled box where the synthetic object is.
pub fn hd_frame() -> Frame {
    let mut image = RgbImage::from_pixel(1280, 720, Rgb([40, 40, 40]));
    draw_filled_rect_mut(&mut image, Rect::at(100, 100).of_size(200, 200), Rgb([0, 0, 255]));
    let (w, h) = image.dimensions();
    Frame::from_bgr(w, h, image.into_raw()).unwrap()
}

/// Collects event names.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RecordingObserver {
    pub fn names(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl DetectorObserver for RecordingObserver {
    fn on_event(&mut self, event: DetectorEvent<'_>) {
        let name = match event {
            DetectorEvent::PhaseStarted(p) => format!("start:{p}"),
            DetectorEvent::PhaseFinished(p, _) => format!("end:{p}"),
            DetectorEvent::FrameSkipped => "skipped".to_string(),
            DetectorEvent::FrameFailed(_) => "failed".to_string(),
            DetectorEvent::FrameDone { detections, .. } => format!("done:{detections}"),
            DetectorEvent::Released => "released".to_string(),
        };
        self.events.lock().unwrap().push(name);
    }
}
