//! Raw engine output to confidence-filtered candidates.

use ndarray::{s, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::common::{BBox, Candidate, OutputLayout, TensorSpec};
use crate::error::{DetectError, Result};

/// Column holding the confidence (or the first class score).
const CONF: usize = 4;

#[derive(Debug, Clone)]
pub struct Decoder {
    layout: OutputLayout,
    confidence_threshold: f32,
    tensor: String,
    rows: usize,
}

impl Decoder {
    /// Fails with `ShapeMismatch` when `output` cannot hold `layout`.
    pub fn new(layout: OutputLayout, confidence_threshold: f32, output: &TensorSpec) -> Result<Self> {
        let rows = layout.candidate_count(&output.name, &output.shape)?;
        Ok(Self {
            layout,
            confidence_threshold,
            tensor: output.name.clone(),
            rows,
        })
    }

    pub fn layout(&self) -> OutputLayout {
        self.layout
    }

    /// Candidate rows per frame before filtering.
    pub fn capacity(&self) -> usize {
        self.rows
    }

    /// Decodes one raw output. Rows below the confidence threshold are masked
    /// out before any box is built; the survivors keep their row order.
    pub fn decode(&self, raw: &[f32]) -> Result<Vec<Candidate>> {
        let width = self.layout.row_width();
        let view = if self.layout.is_transposed() {
            ArrayView2::from_shape((width, self.rows), raw).map(|v| v.reversed_axes())
        } else {
            ArrayView2::from_shape((self.rows, width), raw)
        }
        .map_err(|_| DetectError::shape_mismatch(&self.tensor, &[self.rows * width], &[raw.len()]))?;

        // (confidence, class) per row; the class only matters for multi-class output
        let scored = match self.layout {
            OutputLayout::CornerRows | OutputLayout::CenterTransposed => {
                view.column(CONF).mapv(|conf| (conf, 0u32))
            }
            OutputLayout::CenterTransposedClasses { .. } => {
                view.slice(s![.., CONF..]).map_axis(Axis(1), arg_max)
            }
        };
        let keep: Vec<usize> = scored
            .iter()
            .enumerate()
            .filter(|&(_, &(conf, _))| conf >= self.confidence_threshold)
            .map(|(i, _)| i)
            .collect();
        if keep.is_empty() {
            return Ok(vec![]);
        }

        let candidates = keep
            .par_iter()
            .filter_map(|&i| {
                let (confidence, class_id) = scored[i];
                self.candidate(view.row(i), confidence, class_id)
            })
            .collect();
        Ok(candidates)
    }

    fn candidate(&self, row: ArrayView1<f32>, confidence: f32, class_id: u32) -> Option<Candidate> {
        let (bbox, class_id) = match self.layout {
            OutputLayout::CornerRows => {
                let class = row[5];
                if !class.is_finite() || class < 0.0 {
                    return None;
                }
                let bbox = BBox::default().with_x1y1_x2y2(row[0], row[1], row[2], row[3]);
                (bbox, class.round() as u32)
            }
            OutputLayout::CenterTransposed | OutputLayout::CenterTransposedClasses { .. } => {
                (BBox::default().with_cxcy_wh(row[0], row[1], row[2], row[3]), class_id)
            }
        };
        if !bbox.is_finite() {
            return None;
        }
        // unnormalised exports may score above 1
        Some(Candidate::new(bbox, confidence.min(1.0), class_id))
    }
}

/// Highest class score and its index. NaN scores are skipped and the first of
/// equal scores wins. A row of NaNs scores `-inf`, which no threshold keeps.
fn arg_max(scores: ArrayView1<f32>) -> (f32, u32) {
    scores
        .iter()
        .enumerate()
        .fold((f32::NEG_INFINITY, 0), |(best, class), (i, &score)| {
            if score > best {
                (score, i as u32)
            } else {
                (best, class)
            }
        })
}
