use std::time::Duration;

/// Stages of one frame through the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Preprocess,
    Inference,
    Postprocess,
}

impl Phase {
    pub const COUNT: usize = 3;

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Preprocess => "preprocess",
            Phase::Inference => "inference",
            Phase::Postprocess => "postprocess",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Accumulated time per pipeline phase.
#[derive(Debug, Default, Clone)]
pub struct TimeCalc {
    n: usize,
    duration: [Duration; Phase::COUNT],
}

#[allow(dead_code)]
impl TimeCalc {
    pub fn total(&self) -> Duration {
        self.duration.iter().sum::<Duration>()
    }

    /// Number of frames that completed every phase.
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn avg(&self) -> Duration {
        match self.n {
            0 => Duration::ZERO,
            n => self.total() / n as u32,
        }
    }

    pub fn avg_of(&self, phase: Phase) -> Duration {
        match self.n {
            0 => Duration::ZERO,
            n => self.duration[phase as usize] / n as u32,
        }
    }

    pub fn total_of(&self, phase: Phase) -> Duration {
        self.duration[phase as usize]
    }

    pub fn add(&mut self, phase: Phase, x: Duration) {
        self.duration[phase as usize] += x;
    }

    pub fn finish_frame(&mut self) {
        self.n += 1;
    }

    pub fn clear(&mut self) {
        *self = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_over_completed_frames() {
        let mut t = TimeCalc::default();
        assert_eq!(t.avg(), Duration::ZERO);
        for _ in 0..4 {
            t.add(Phase::Preprocess, Duration::from_millis(2));
            t.add(Phase::Inference, Duration::from_millis(8));
            t.finish_frame();
        }
        assert_eq!(t.n(), 4);
        assert_eq!(t.avg_of(Phase::Inference), Duration::from_millis(8));
        assert_eq!(t.avg(), Duration::from_millis(10));
        assert_eq!(t.total_of(Phase::Postprocess), Duration::ZERO);
        t.clear();
        assert_eq!(t.n(), 0);
    }
}
