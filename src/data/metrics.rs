use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Samples kept per rolling window.
pub const WINDOW: usize = 100;

/// Throughput and latency figures at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub fps: f64,
    pub acquisition: Duration,
    pub inference: Duration,
    pub latency: Duration,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FPS: {:.1} | acquisition: {:.2?} | inference: {:.2?} | latency: {:.2?}",
            self.fps, self.acquisition, self.inference, self.latency
        )
    }
}

/// Stream-level statistics: FPS since start plus rolling averages of frame
/// acquisition and inference time.
#[derive(Debug, Clone)]
pub struct Metrics {
    start: Instant,
    frame_count: usize,
    acquisition: VecDeque<Duration>,
    inference: VecDeque<Duration>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            frame_count: 0,
            acquisition: VecDeque::with_capacity(WINDOW + 1),
            inference: VecDeque::with_capacity(WINDOW + 1),
        }
    }

    pub fn add_acquisition_time(&mut self, t: Duration) {
        push_windowed(&mut self.acquisition, t);
    }

    pub fn add_inference_time(&mut self, t: Duration) {
        push_windowed(&mut self.inference, t);
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Counts one displayed frame and returns the current figures.
    pub fn compute(&mut self) -> MetricsSnapshot {
        self.compute_at(Instant::now())
    }

    pub fn compute_at(&mut self, now: Instant) -> MetricsSnapshot {
        self.frame_count += 1;
        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        let fps = if elapsed > 0.0 {
            self.frame_count as f64 / elapsed
        } else {
            0.0
        };
        let acquisition = mean(&self.acquisition);
        let inference = mean(&self.inference);
        MetricsSnapshot {
            fps,
            acquisition,
            inference,
            latency: acquisition + inference,
        }
    }
}

fn push_windowed(window: &mut VecDeque<Duration>, t: Duration) {
    window.push_back(t);
    if window.len() > WINDOW {
        window.pop_front();
    }
}

fn mean(window: &VecDeque<Duration>) -> Duration {
    if window.is_empty() {
        return Duration::ZERO;
    }
    window.iter().sum::<Duration>() / window.len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_metrics_report_zero() {
        let start = Instant::now();
        let mut m = Metrics::starting_at(start);
        let snap = m.compute_at(start);
        assert_eq!(snap, MetricsSnapshot::default());
        assert_eq!(m.frame_count(), 1);
    }

    #[test]
    fn window_keeps_the_latest_hundred_samples() {
        let start = Instant::now();
        let mut m = Metrics::starting_at(start);
        for _ in 0..50 {
            m.add_inference_time(Duration::from_millis(100));
        }
        for _ in 0..WINDOW {
            m.add_inference_time(Duration::from_millis(10));
        }
        m.add_acquisition_time(Duration::from_millis(4));
        let snap = m.compute_at(start + Duration::from_secs(1));
        assert_eq!(snap.inference, Duration::from_millis(10));
        assert_eq!(snap.latency, Duration::from_millis(14));
    }

    #[test]
    fn fps_counts_frames_since_start() {
        let start = Instant::now();
        let mut m = Metrics::starting_at(start);
        let mut snap = MetricsSnapshot::default();
        for _ in 0..30 {
            snap = m.compute_at(start + Duration::from_secs(2));
        }
        assert!((snap.fps - 15.0).abs() < 1e-9);
    }
}
