//! Scored face boxes and their suppression.
//!
//! `FaceBox` is the unit both decode and suppress work with; `nms` holds the
//! greedy and blending suppressors.

pub(crate) mod nms;

/// Number of floats a box occupies in the flat boundary layout.
pub const FLAT_STRIDE: usize = 5;

/// Detection in absolute input-pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    /// Left edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Right edge.
    pub x2: f32,
    /// Bottom edge.
    pub y2: f32,
    /// Face confidence.
    pub score: f32,
}

impl FaceBox {
    /// Creates a box from its corners and score.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    /// Horizontal extent, `x2 - x1`; negative for inverted boxes.
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Vertical extent, `y2 - y1`; negative for inverted boxes.
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Area of the box; degenerate boxes have area 0.
    pub fn area(&self) -> f32 {
        let w = self.width();
        let h = self.height();
        if w > 0.0 && h > 0.0 {
            w * h
        } else {
            0.0
        }
    }

    /// Intersection-over-union with `other`.
    ///
    /// Returns 0 for disjoint boxes and for pairs whose union is empty.
    pub fn iou(&self, other: &FaceBox) -> f32 {
        let iw = self.x2.min(other.x2) - self.x1.max(other.x1);
        let ih = self.y2.min(other.y2) - self.y1.max(other.y1);
        let inter = if iw > 0.0 && ih > 0.0 { iw * ih } else { 0.0 };
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            (inter / union).min(1.0)
        } else {
            0.0
        }
    }

    /// Returns `[x1, y1, x2, y2, score]`.
    pub fn to_array(&self) -> [f32; FLAT_STRIDE] {
        [self.x1, self.y1, self.x2, self.y2, self.score]
    }
}

/// Flattens boxes into `5 * boxes.len()` floats, `(x1, y1, x2, y2, score)` each.
pub fn flatten(boxes: &[FaceBox]) -> Vec<f32> {
    let mut out = Vec::with_capacity(boxes.len() * FLAT_STRIDE);
    for face in boxes {
        out.extend_from_slice(&face.to_array());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{flatten, FaceBox};

    #[test]
    fn iou_of_shifted_squares() {
        let a = FaceBox::new(0.0, 0.0, 10.0, 10.0, 0.9);
        let b = FaceBox::new(1.0, 1.0, 11.0, 11.0, 0.6);
        let expected = 81.0 / 119.0;
        assert!((a.iou(&b) - expected).abs() < 1e-6);
        assert_eq!(a.iou(&b), b.iou(&a));
    }

    #[test]
    fn iou_with_self_is_one() {
        let a = FaceBox::new(3.5, -2.0, 17.25, 40.0, 0.8);
        assert_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn degenerate_boxes_have_zero_area_and_iou() {
        let line = FaceBox::new(5.0, 0.0, 5.0, 10.0, 0.9);
        let inverted = FaceBox::new(10.0, 10.0, 0.0, 0.0, 0.9);
        assert_eq!(line.area(), 0.0);
        assert_eq!(inverted.area(), 0.0);
        assert_eq!(line.iou(&line), 0.0);
        assert_eq!(line.iou(&inverted), 0.0);
    }

    #[test]
    fn extents_are_signed_differences() {
        let b = FaceBox::new(2.0, 3.0, 7.0, 11.0, 0.9);
        assert_eq!(b.width(), 5.0);
        assert_eq!(b.height(), 8.0);
        let inverted = FaceBox::new(10.0, 10.0, 4.0, 6.0, 0.9);
        assert_eq!(inverted.width(), -6.0);
        assert_eq!(inverted.height(), -4.0);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = FaceBox::new(0.0, 0.0, 10.0, 10.0, 0.9);
        let b = FaceBox::new(10.0, 0.0, 20.0, 10.0, 0.9);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn flatten_interleaves_fields() {
        let boxes = [
            FaceBox::new(1.0, 2.0, 3.0, 4.0, 0.5),
            FaceBox::new(5.0, 6.0, 7.0, 8.0, 0.75),
        ];
        assert_eq!(
            flatten(&boxes),
            vec![1.0, 2.0, 3.0, 4.0, 0.5, 5.0, 6.0, 7.0, 8.0, 0.75]
        );
        assert!(flatten(&[]).is_empty());
    }
}
