/// One bounding box for the class of interest, in frame pixel coordinates.
///
/// Produced fresh by every detector run and never mutated afterwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    /// In `[0, 1]`.
    pub confidence: f64,
}

impl Detection {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, confidence: f64) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
        }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    /// Confidence as a whole percentage, e.g. `0.874` → `"87%"`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.0}%", self.confidence * 100.0)
    }
}

/// Comma-joined confidence percentages: `"91%, 47%"`.
pub fn confidence_summary(detections: &[Detection]) -> String {
    detections
        .iter()
        .map(Detection::confidence_percent)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::rounds_down(0.874, "87%")]
    #[case::rounds_up(0.456, "46%")]
    #[case::full(1.0, "100%")]
    #[case::zero(0.0, "0%")]
    fn test_confidence_percent(#[case] confidence: f64, #[case] expected: &str) {
        let det = Detection::new(0, 0, 10, 10, confidence);
        assert_eq!(det.confidence_percent(), expected);
    }

    #[test]
    fn test_confidence_summary_joins_in_order() {
        let dets = [
            Detection::new(0, 0, 10, 10, 0.91),
            Detection::new(20, 20, 40, 60, 0.47),
        ];
        assert_eq!(confidence_summary(&dets), "91%, 47%");
    }

    #[test]
    fn test_confidence_summary_empty() {
        assert_eq!(confidence_summary(&[]), "");
    }

    #[test]
    fn test_inverted_box_has_zero_extent() {
        let det = Detection::new(50, 50, 10, 10, 0.5);
        assert_eq!(det.width(), 0);
        assert_eq!(det.height(), 0);
    }
}
