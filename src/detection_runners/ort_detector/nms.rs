use crate::common::Detection;

pub trait Nms {
    fn iou(&self, other: &Self) -> f32;
    fn confidence(&self) -> f32;
    fn class_id(&self) -> u32;
}

impl Nms for Detection {
    /// Intersection over union on inclusive pixel areas.
    fn iou(&self, other: &Self) -> f32 {
        self.bbox.iou(&other.bbox)
    }

    fn confidence(&self) -> f32 {
        self.score
    }

    fn class_id(&self) -> u32 {
        self.class_id
    }
}

/// Greedy NMS. Boxes are ordered by descending confidence (ties keep their
/// input order) and a box is dropped when its IoU with an already kept box
/// exceeds `iou_threshold`. A threshold `<= 0` disables suppression.
pub fn nms<T: Nms>(boxes: &mut Vec<T>, iou_threshold: f32) {
    suppress(boxes, iou_threshold, |_, _| true);
}

/// Like [`nms`], but boxes of different classes never suppress each other.
pub fn nms_by_class<T: Nms>(boxes: &mut Vec<T>, iou_threshold: f32) {
    suppress(boxes, iou_threshold, |a, b| a.class_id() == b.class_id());
}

fn suppress<T: Nms>(boxes: &mut Vec<T>, iou_threshold: f32, competes: impl Fn(&T, &T) -> bool) {
    if boxes.len() <= 1 || iou_threshold <= 0.0 {
        return;
    }
    boxes.sort_by(|b1, b2| {
        b2.confidence()
            .partial_cmp(&b1.confidence())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut current_index = 0;
    for index in 0..boxes.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let (kept, candidate) = (&boxes[prev_index], &boxes[index]);
            if competes(kept, candidate) && kept.iou(candidate) > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            boxes.swap(current_index, index);
            current_index += 1;
        }
    }
    boxes.truncate(current_index);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(b: [i32; 4], score: f32, class_id: u32) -> Detection {
        Detection::new(b.into(), score, class_id)
    }

    #[test]
    fn identical_boxes_keep_the_higher_score() {
        let mut boxes = vec![det([0, 0, 10, 10], 0.6, 0), det([0, 0, 10, 10], 0.9, 0)];
        nms(&mut boxes, 0.5);
        assert_eq!(boxes, vec![det([0, 0, 10, 10], 0.9, 0)]);
    }

    #[test]
    fn disjoint_boxes_survive_in_score_order() {
        let mut boxes = vec![
            det([0, 0, 10, 10], 0.5, 0),
            det([50, 50, 60, 60], 0.8, 0),
            det([100, 100, 110, 110], 0.7, 0),
        ];
        nms(&mut boxes, 0.45);
        let scores: Vec<f32> = boxes.iter().map(|d| d.score).collect();
        assert_eq!(scores, vec![0.8, 0.7, 0.5]);
    }

    #[test]
    fn iou_equal_to_threshold_is_kept() {
        // Inclusive areas 100 and 100, intersection 50 -> IoU 1/3.
        let a = det([0, 0, 9, 9], 0.9, 0);
        let b = det([5, 0, 14, 9], 0.8, 0);
        let iou = a.iou(&b);
        let mut boxes = vec![a, b];
        nms(&mut boxes, iou);
        assert_eq!(boxes.len(), 2);
        nms(&mut boxes, iou - 1e-3);
        assert_eq!(boxes.len(), 1);
    }

    #[test]
    fn ties_keep_input_order() {
        let mut boxes = vec![det([0, 0, 10, 10], 0.7, 1), det([0, 0, 10, 10], 0.7, 2)];
        nms(&mut boxes, 0.5);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].class_id, 1);
    }

    #[test]
    fn non_positive_threshold_passes_through() {
        let input = vec![det([0, 0, 10, 10], 0.2, 0), det([0, 0, 10, 10], 0.9, 0)];
        let mut boxes = input.clone();
        nms(&mut boxes, 0.0);
        assert_eq!(boxes, input);
    }

    #[test]
    fn applying_twice_changes_nothing() {
        let mut boxes = vec![
            det([0, 0, 100, 100], 0.9, 0),
            det([10, 10, 110, 110], 0.8, 0),
            det([200, 200, 260, 260], 0.85, 0),
            det([205, 205, 262, 258], 0.3, 0),
        ];
        nms(&mut boxes, 0.5);
        let once = boxes.clone();
        nms(&mut boxes, 0.5);
        assert_eq!(boxes, once);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn class_aware_variant_keeps_overlapping_classes() {
        let mut boxes = vec![det([0, 0, 10, 10], 0.9, 0), det([0, 0, 10, 10], 0.8, 1)];
        nms_by_class(&mut boxes, 0.5);
        assert_eq!(boxes.len(), 2);
        nms(&mut boxes, 0.5);
        assert_eq!(boxes.len(), 1);
    }
}
