//! Builder for assembling ground-truth targets object by object.

use crate::matcher::Target;
use crate::matcher::box_ops::BBox;
use ndarray::Array2;

/// Builder for creating a [`Target`] from boxes in various formats.
///
/// Boxes are stored in normalized CXCYWH form, which is what the matcher expects.
#[derive(Debug, Clone, Default)]
pub struct TargetBuilder {
    labels: Vec<usize>,
    boxes: Vec<[f32; 4]>,
}

impl TargetBuilder {
    /// Create a new target builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object with a CXCYWH box (center_x, center_y, width, height).
    pub fn cxcywh(mut self, label: usize, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.labels.push(label);
        self.boxes.push([cx, cy, w, h]);
        self
    }

    /// Add an object with an XYXY box (x1, y1, x2, y2).
    pub fn xyxy(self, label: usize, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let [cx, cy, w, h] = BBox::new(x1, y1, x2, y2).to_cxcywh();
        self.cxcywh(label, cx, cy, w, h)
    }

    /// Add an object with a TLWH box (left, top, width, height).
    pub fn tlwh(self, label: usize, l: f32, t: f32, w: f32, h: f32) -> Self {
        self.cxcywh(label, l + w / 2.0, t + h / 2.0, w, h)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Build the final `Target`.
    pub fn build(self) -> Target {
        let boxes = if self.boxes.is_empty() {
            Array2::zeros((0, 4))
        } else {
            Array2::from(self.boxes)
        };
        Target {
            labels: self.labels,
            boxes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_target_builder() {
        let target = TargetBuilder::new()
            .cxcywh(2, 0.5, 0.5, 0.2, 0.2)
            .xyxy(0, 0.1, 0.2, 0.3, 0.6)
            .tlwh(1, 0.6, 0.6, 0.2, 0.1)
            .build();

        assert_eq!(target.labels, vec![2, 0, 1]);
        assert_eq!(target.boxes.dim(), (3, 4));

        let expected: [[f32; 4]; 3] = [
            [0.5, 0.5, 0.2, 0.2],
            [0.2, 0.4, 0.2, 0.4],
            [0.7, 0.65, 0.2, 0.1],
        ];
        for (row, want) in target.boxes.outer_iter().zip(expected) {
            for (got, want) in row.iter().zip(want) {
                assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_empty_builder() {
        let builder = TargetBuilder::new();
        assert!(builder.is_empty());
        let target = builder.build();
        assert!(target.is_empty());
        assert_eq!(target.boxes.dim(), (0, 4));
    }
}
