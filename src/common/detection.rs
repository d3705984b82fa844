use serde::{Deserialize, Serialize};

use crate::common::{BBox, PixelBox};

/// A decoded model output row, still in letterboxed model space.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub bbox: BBox,
    pub confidence: f32,
    pub class_id: u32,
}

impl Candidate {
    pub fn new(bbox: BBox, confidence: f32, class_id: u32) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }
}

/// Final pipeline output in original-frame pixel coordinates.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: PixelBox,
    pub score: f32,
    pub class_id: u32,
}

impl Detection {
    pub fn new(bbox: PixelBox, score: f32, class_id: u32) -> Self {
        Self {
            bbox,
            score,
            class_id,
        }
    }

    /// Sets the box from `(x1, y1, x2, y2)`.
    pub fn with_x1y1_x2y2(mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        self.bbox = PixelBox::new(x1, y1, x2, y2);
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn with_class_id(mut self, class_id: u32) -> Self {
        self.class_id = class_id;
        self
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        self.bbox.iou(&other.bbox)
    }
}

impl std::fmt::Display for Detection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "class {} [{}, {}, {}, {}] {:.2}",
            self.class_id, self.bbox.x1, self.bbox.y1, self.bbox.x2, self.bbox.y2, self.score
        )
    }
}
