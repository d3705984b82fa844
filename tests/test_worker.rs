extern crate live_detect;

mod common;

use std::sync::Arc;

use live_detect::{DetectionWorker, Detector, HostAccelerator};

use common::*;

#[test]
fn worker_returns_results_in_submission_order() {
    // Each forward pass reports the object a little further to the right.
    let responses: Vec<Vec<f32>> = (0..4)
        .map(|i| center_transposed(&[[100.0 + 100.0 * i as f32, 240.0, 100.0, 100.0, 0.9]]))
        .collect();
    let engine = SyntheticEngine::new((640, 640), &[1, 5, 1], responses);
    let probe = engine.probe();
    let accel = Arc::new(HostAccelerator::new());
    let config = config().with_output_tensor("output0", &[1, 5, 1]);
    let detector = Detector::new(config, engine, accel.clone()).unwrap();

    let worker = DetectionWorker::spawn(detector).unwrap();
    let frames = [Some(hd_frame()), None, Some(hd_frame()), Some(hd_frame())];
    let mut results = Vec::new();
    for frame in frames {
        worker.submit(frame).unwrap();
        results.push(worker.recv().unwrap());
    }

    let x1s: Vec<Option<i32>> = results
        .iter()
        .map(|r| r.first().map(|d| d.bbox.x1))
        .collect();
    assert_eq!(x1s, vec![Some(100), None, Some(300), Some(500)]);

    assert_eq!(worker.join(), 4);
    assert_eq!(probe.enqueues(), 3);
    assert!(probe.is_dropped());
    assert!(accel.stats().is_balanced());
}

#[test]
fn dropping_the_worker_cleans_up() {
    let accel = Arc::new(HostAccelerator::new());
    let engine = hd_engine();
    let probe = engine.probe();
    {
        let detector = Detector::new(config(), engine, accel.clone()).unwrap();
        let worker = DetectionWorker::spawn(detector).unwrap();
        assert_eq!(worker.detect(Some(hd_frame())).unwrap().len(), 1);
    }
    assert!(probe.is_dropped());
    assert!(accel.stats().is_balanced());
}
