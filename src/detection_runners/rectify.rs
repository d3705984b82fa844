//! Letterboxed candidates back to original-frame pixels.

use crate::common::{Candidate, Detection, PixelBox};
use crate::detection_runners::LetterboxParams;

/// Maps `candidate` into the frame described by `params`.
///
/// Pads are subtracted and the scale divided out, then each coordinate is
/// clamped to `[0, dim - 1]` and rounded. Boxes that end up with
/// `x1 >= x2`, `y1 >= y2`, or a side shorter than `min_box_size` are
/// rejected.
pub fn rectify(candidate: &Candidate, params: &LetterboxParams, min_box_size: f32) -> Option<Detection> {
    let b = &candidate.bbox;
    let (x1, y1) = params.to_original(b.x1, b.y1);
    let (x2, y2) = params.to_original(b.x2, b.y2);

    let max_x = params.orig_width.saturating_sub(1) as f32;
    let max_y = params.orig_height.saturating_sub(1) as f32;
    let px = |v: f32, max: f32| v.clamp(0.0, max).round() as i32;
    let bbox = PixelBox::new(px(x1, max_x), px(y1, max_y), px(x2, max_x), px(y2, max_y));

    if bbox.x1 >= bbox.x2 || bbox.y1 >= bbox.y2 {
        return None;
    }
    if (bbox.width() as f32) < min_box_size || (bbox.height() as f32) < min_box_size {
        return None;
    }
    Some(Detection::new(bbox, candidate.confidence, candidate.class_id))
}
