use serde::{Deserialize, Serialize};

use crate::error::{DetectError, Result};

/// How the engine lays out its detection output. This is a property of the
/// model export and must be configured, never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputLayout {
    /// `[N, 6]` rows of `[x1, y1, x2, y2, confidence, class_id]` (NMS-free exports).
    CornerRows,
    /// `[5, N]` channels of `[xc, yc, w, h, confidence]`, single implicit class.
    CenterTransposed,
    /// `[4 + nc, N]` channels of `[xc, yc, w, h, score_0 .. score_nc-1]`.
    CenterTransposedClasses { num_classes: usize },
}

impl OutputLayout {
    /// Values describing one candidate.
    pub fn row_width(&self) -> usize {
        match self {
            OutputLayout::CornerRows => 6,
            OutputLayout::CenterTransposed => 5,
            OutputLayout::CenterTransposedClasses { num_classes } => 4 + num_classes,
        }
    }

    pub fn is_transposed(&self) -> bool {
        !matches!(self, OutputLayout::CornerRows)
    }

    pub fn num_classes(&self) -> Option<usize> {
        match self {
            OutputLayout::CornerRows => None,
            OutputLayout::CenterTransposed => Some(1),
            OutputLayout::CenterTransposedClasses { num_classes } => Some(*num_classes),
        }
    }

    /// Checks an engine output shape against the layout and returns the
    /// number of candidate rows it holds. A leading batch dimension of 1 is
    /// accepted.
    pub fn candidate_count(&self, tensor: &str, shape: &[usize]) -> Result<usize> {
        if let OutputLayout::CenterTransposedClasses { num_classes: 0 } = self {
            return Err(DetectError::InvalidConfig(
                "center_transposed_classes needs at least one class".to_string(),
            ));
        }
        let dims = match shape {
            [1, rest @ ..] if rest.len() == 2 => rest,
            dims if dims.len() == 2 => dims,
            _ => return Err(self.mismatch(tensor, shape)),
        };
        let (rows, width) = if self.is_transposed() {
            (dims[1], dims[0])
        } else {
            (dims[0], dims[1])
        };
        if width != self.row_width() {
            return Err(self.mismatch(tensor, shape));
        }
        Ok(rows)
    }

    fn mismatch(&self, tensor: &str, shape: &[usize]) -> DetectError {
        let expected = if self.is_transposed() {
            vec![1, self.row_width(), 0]
        } else {
            vec![1, 0, self.row_width()]
        };
        DetectError::shape_mismatch(tensor, &expected, shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_rows_take_rows_from_the_middle_dim() {
        let layout = OutputLayout::CornerRows;
        assert_eq!(layout.candidate_count("out", &[1, 300, 6]).unwrap(), 300);
        assert_eq!(layout.candidate_count("out", &[300, 6]).unwrap(), 300);
        assert!(layout.candidate_count("out", &[1, 6, 300]).is_err());
    }

    #[test]
    fn transposed_layouts_take_rows_from_the_last_dim() {
        assert_eq!(
            OutputLayout::CenterTransposed
                .candidate_count("out", &[1, 5, 8400])
                .unwrap(),
            8400
        );
        let multi = OutputLayout::CenterTransposedClasses { num_classes: 80 };
        assert_eq!(multi.candidate_count("out", &[1, 84, 8400]).unwrap(), 8400);
        assert!(matches!(
            multi.candidate_count("out", &[1, 5, 8400]),
            Err(DetectError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn batch_beyond_one_is_rejected() {
        assert!(OutputLayout::CenterTransposed
            .candidate_count("out", &[2, 5, 10])
            .is_err());
    }

    #[test]
    fn zero_classes_is_a_config_error() {
        let layout = OutputLayout::CenterTransposedClasses { num_classes: 0 };
        assert!(matches!(
            layout.candidate_count("out", &[1, 4, 10]),
            Err(DetectError::InvalidConfig(_))
        ));
    }

    #[test]
    fn serde_is_tagged_by_kind() {
        let layout: OutputLayout =
            serde_json::from_str(r#"{"kind":"center_transposed_classes","num_classes":3}"#)
                .unwrap();
        assert_eq!(layout, OutputLayout::CenterTransposedClasses { num_classes: 3 });
        let json = serde_json::to_string(&OutputLayout::CenterTransposed).unwrap();
        assert_eq!(json, r#"{"kind":"center_transposed"}"#);
    }
}
