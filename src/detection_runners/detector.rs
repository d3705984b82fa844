use std::sync::Arc;
use std::time::Instant;

use image::{Rgb, RgbImage};

use crate::common::{Accelerator, ChannelOrder, DetectorConfig, Detection, Frame};
use crate::data::{Phase, TimeCalc};
use crate::detection_runners::{
    dispatcher, letterbox, nms, nms_by_class, rectify, to_nchw, BufferSet, Decoder,
    DetectorEvent, DetectorObserver, ExecStream, InferenceEngine, LogObserver,
};
use crate::error::{DetectError, Result};

/// Everything acquired at construction. Field order is release order.
struct Resources<E, A: Accelerator> {
    buffers: BufferSet<A>,
    stream: ExecStream<A>,
    engine: E,
}

/// Per-frame object detector.
///
/// Owns an engine, one execution stream and one buffer set, all acquired in
/// [`Detector::new`] and reused for every frame. Frames are processed one at
/// a time through `&mut self`.
pub struct Detector<E, A>
where
    A: Accelerator,
    E: InferenceEngine<A>,
{
    config: DetectorConfig,
    decoder: Decoder,
    input_size: (u32, u32),
    class_names: Vec<String>,
    observer: Box<dyn DetectorObserver>,
    timings: TimeCalc,
    resources: Option<Resources<E, A>>,
}

impl<E, A> Detector<E, A>
where
    A: Accelerator,
    E: InferenceEngine<A>,
{
    /// Validates `config` against the engine and acquires the stream and
    /// buffers. Any failure here is fatal; whatever was acquired is released
    /// before returning.
    pub fn new(config: DetectorConfig, engine: E, accel: Arc<A>) -> Result<Self> {
        config.validate()?;

        let input = engine.input_spec().clone();
        let output = engine.output_spec().clone();
        let (h, w) = input
            .image_hw()
            .ok_or_else(|| DetectError::shape_mismatch(&input.name, &[1, 3, 0, 0], &input.shape))?;
        let decoder = Decoder::new(config.output_layout, config.confidence_threshold, &output)?;

        let class_names = if config.class_names.is_empty() {
            engine.class_names().to_vec()
        } else {
            config.class_names.clone()
        };

        let stream = ExecStream::new(accel.clone())?;
        let buffers = BufferSet::allocate(accel, &input, &output)?;

        log::info!(
            "Detector ready: {input} -> {output} | layout {:?} | conf >= {} | iou {}",
            config.output_layout,
            config.confidence_threshold,
            config.iou_threshold,
        );

        Ok(Self {
            observer: Box::new(LogObserver::new(config.verbose)),
            config,
            decoder,
            input_size: (w, h),
            class_names,
            timings: TimeCalc::default(),
            resources: Some(Resources {
                buffers,
                stream,
                engine,
            }),
        })
    }

    pub fn with_observer(mut self, observer: Box<dyn DetectorObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// `(width, height)` the engine expects.
    pub fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn class_name(&self, class_id: u32) -> Option<&str> {
        self.class_names.get(class_id as usize).map(String::as_str)
    }

    pub fn timings(&self) -> &TimeCalc {
        &self.timings
    }

    pub fn engine(&self) -> Option<&E> {
        self.resources.as_ref().map(|r| &r.engine)
    }

    pub fn is_released(&self) -> bool {
        self.resources.is_none()
    }

    /// Detects objects in `frame`. Never fails: a missing or empty frame and
    /// any per-frame error yield an empty list and are reported to the
    /// observer.
    pub fn infer(&mut self, frame: Option<&Frame>) -> Vec<Detection> {
        match self.try_infer(frame) {
            Ok(detections) => detections,
            Err(DetectError::EmptyFrame) => {
                self.observer.on_event(DetectorEvent::FrameSkipped);
                vec![]
            }
            Err(err) => {
                self.observer.on_event(DetectorEvent::FrameFailed(&err));
                vec![]
            }
        }
    }

    /// Like [`Detector::infer`] but hands the per-frame error to the caller.
    /// A missing or empty frame is `Err(DetectError::EmptyFrame)`.
    pub fn try_infer(&mut self, frame: Option<&Frame>) -> Result<Vec<Detection>> {
        let frame = frame
            .filter(|f| !f.is_empty())
            .ok_or(DetectError::EmptyFrame)?;
        let Self {
            config,
            decoder,
            input_size: (w, h),
            observer,
            timings,
            resources,
            ..
        } = self;
        let res = resources.as_mut().ok_or(DetectError::Released)?;
        let start = Instant::now();

        let t = begin(observer.as_mut(), Phase::Preprocess);
        let (padded, params) = letterbox(&frame.image, *w, *h, config.pad_value)?;
        let x = to_nchw(&padded, frame.order)?;
        end(observer.as_mut(), timings, Phase::Preprocess, t);

        let t = begin(observer.as_mut(), Phase::Inference);
        let raw = dispatcher::run(&mut res.engine, &res.stream, &mut res.buffers, x.as_flat()?)?;
        end(observer.as_mut(), timings, Phase::Inference, t);

        let t = begin(observer.as_mut(), Phase::Postprocess);
        let mut detections: Vec<Detection> = decoder
            .decode(raw)?
            .iter()
            .filter_map(|c| rectify(c, &params, config.min_box_size))
            .collect();
        if config.class_aware_nms {
            nms_by_class(&mut detections, config.iou_threshold);
        } else {
            nms(&mut detections, config.iou_threshold);
        }
        end(observer.as_mut(), timings, Phase::Postprocess, t);

        timings.finish_frame();
        observer.on_event(DetectorEvent::FrameDone {
            detections: detections.len(),
            elapsed: start.elapsed(),
        });
        Ok(detections)
    }

    /// Pushes `n` blank frames through the pipeline and resets the timings.
    pub fn dry_run(&mut self, n: usize) -> Result<()> {
        let (w, h) = self.input_size;
        let pad = self.config.pad_value;
        let frame = Frame::new(RgbImage::from_pixel(w, h, Rgb([pad; 3])), ChannelOrder::Rgb);
        for _ in 0..n {
            self.try_infer(Some(&frame))?;
        }
        self.timings.clear();
        Ok(())
    }

    /// Releases buffers, then the stream, then the engine. Safe to call more
    /// than once; later calls do nothing. Release failures are logged.
    pub fn cleanup(&mut self) {
        if let Some(resources) = self.resources.take() {
            let Resources {
                mut buffers,
                mut stream,
                engine,
            } = resources;
            buffers.release();
            stream.release();
            drop(engine);
            self.observer.on_event(DetectorEvent::Released);
        }
    }
}

impl<E, A> Drop for Detector<E, A>
where
    A: Accelerator,
    E: InferenceEngine<A>,
{
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn begin(observer: &mut dyn DetectorObserver, phase: Phase) -> Instant {
    observer.on_event(DetectorEvent::PhaseStarted(phase));
    Instant::now()
}

fn end(observer: &mut dyn DetectorObserver, timings: &mut TimeCalc, phase: Phase, t: Instant) {
    let elapsed = t.elapsed();
    timings.add(phase, elapsed);
    observer.on_event(DetectorEvent::PhaseFinished(phase, elapsed));
}
