use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;

use live_detect::common::ImageFileSource;
use live_detect::data::{Metrics, Phase};
use live_detect::{init_detector, DetectorConfig, FrameError, FrameSource, InferenceDevice};

/// Runs the detector over a stream of image files and logs what it finds.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Detector configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Model file, overrides the configuration
    #[arg(long, value_name = "FILE")]
    model: Option<String>,

    /// Execution provider: cpu, cuda[:id] or tensorrt[:id]
    #[arg(long, value_name = "DEVICE")]
    device: Option<String>,

    /// Log per-phase timings
    #[arg(long, short)]
    verbose: bool,

    /// Stop after this many frames (0 means no limit)
    #[arg(long, default_value = "0", value_name = "COUNT")]
    max_frames: usize,

    /// Replay the images until --max-frames is reached
    #[arg(long = "loop")]
    looping: bool,

    /// Frames to process, in order
    #[arg(value_name = "IMAGES", required = true)]
    images: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let mut config = match &args.config {
        Some(path) => DetectorConfig::from_json_file(path)?,
        None => DetectorConfig::default(),
    };
    if let Some(model) = &args.model {
        config.model_path = model.clone();
    }
    if let Some(device) = &args.device {
        config.engine.device = InferenceDevice::parse(device).with_context(|| {
            format!(
                "Unknown device `{device}`, expected one of {:?}",
                InferenceDevice::all_inference_devices()
            )
        })?;
    }
    config.verbose |= args.verbose;

    let mut detector = init_detector(&config)?;
    let mut source = ImageFileSource::new(args.images).with_looping(args.looping);
    let mut metrics = Metrics::new();
    let mut frames = 0usize;

    loop {
        if args.max_frames > 0 && frames >= args.max_frames {
            break;
        }
        let t = Instant::now();
        let frame = match source.get_frame() {
            Ok(frame) => frame,
            Err(FrameError::Empty) => continue,
            Err(FrameError::Exhausted) => break,
        };
        metrics.add_acquisition_time(t.elapsed());

        let t = Instant::now();
        let detections = detector.infer(Some(&frame));
        metrics.add_inference_time(t.elapsed());
        frames += 1;

        for d in &detections {
            let name = detector.class_name(d.class_id).unwrap_or("?");
            log::info!("frame {frames}: {name} {d}");
        }
        log::info!("frame {frames}: {} detection(s) | {}", detections.len(), metrics.compute());
    }

    let timings = detector.timings();
    log::info!(
        "{frames} frame(s) | preprocess {:.2?} | inference {:.2?} | postprocess {:.2?} (avg)",
        timings.avg_of(Phase::Preprocess),
        timings.avg_of(Phase::Inference),
        timings.avg_of(Phase::Postprocess),
    );
    detector.cleanup();
    Ok(())
}
