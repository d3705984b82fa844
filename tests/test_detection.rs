extern crate live_detect;

use std::path::Path;
use std::time::Instant;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use live_detect::{init_detector, DetectorConfig, EngineOptions, Frame, InferenceDevice};

/////////////////////
// Testing variables
// LIVE_DETECT_MODEL    ONNX export of the detector (required)
// LIVE_DETECT_ORT_LIB  libonnxruntime to load (optional)
// LIVE_DETECT_IMAGE    image to run on (optional, defaults to a blank frame)
// LIVE_DETECT_DEVICE   cpu | cuda[:id] | tensorrt[:id] (optional)
/////////////////////

#[test]
#[ignore = "needs an ONNX model, run with LIVE_DETECT_MODEL=... cargo test -- --ignored"]
fn detection() {
    let loop_count: u32 = 10;
    let Ok(model_path) = std::env::var("LIVE_DETECT_MODEL") else {
        eprintln!("LIVE_DETECT_MODEL not set, skipping");
        return;
    };
    let device = std::env::var("LIVE_DETECT_DEVICE")
        .ok()
        .and_then(|d| InferenceDevice::parse(&d))
        .unwrap_or_default();
    let ort_lib_path = std::env::var("LIVE_DETECT_ORT_LIB").unwrap_or_default();

    let config = DetectorConfig::new()
        .with_model(&model_path)
        .with_confidence_threshold(0.3)
        .with_engine(
            EngineOptions::new()
                .with_device(device)
                .with_ort_lib_path(&ort_lib_path)
                .with_dry_run(1),
        );
    let mut detector = init_detector(&config).unwrap();

    let mut img = match std::env::var("LIVE_DETECT_IMAGE") {
        Ok(path) => image::open(Path::new(&path)).unwrap().to_rgb8(),
        Err(_) => RgbImage::from_pixel(1280, 720, Rgb([114, 114, 114])),
    };
    let frame = Frame::from(img.clone());

    let mut detections = vec![];
    for i in 0..loop_count {
        let now = Instant::now();
        detections = detector.try_infer(Some(&frame)).unwrap();
        println!("Run {i}: {} detection(s) in {:?}", detections.len(), now.elapsed());
    }

    let (w, h) = img.dimensions();
    for d in &detections {
        assert!(d.bbox.x1 >= 0 && d.bbox.y1 >= 0);
        assert!(d.bbox.x2 < w as i32 && d.bbox.y2 < h as i32);
        assert!(d.bbox.x1 < d.bbox.x2 && d.bbox.y1 < d.bbox.y2);
        assert!(d.score >= 0.3);
        let rect = Rect::at(d.bbox.x1, d.bbox.y1)
            .of_size(d.bbox.width() as u32, d.bbox.height() as u32);
        draw_hollow_rect_mut(&mut img, rect, Rgb([255, 0, 0]));
    }
    img.save(std::env::temp_dir().join("live_detect_detection.png")).unwrap();

    detector.cleanup();
}
