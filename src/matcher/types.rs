//! Inputs and outputs of the matcher.

use crate::error::{MatchError, Result};
use ndarray::{Array2, Array3, ArrayView2, CowArray, Ix2};
use serde::{Deserialize, Serialize};

/// Batched model outputs.
///
/// `pred_logits` holds unnormalized class scores of shape
/// `[batch_size, num_queries, num_classes]`, `pred_boxes` holds normalized
/// CXCYWH boxes of shape `[batch_size, num_queries, 4]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub pred_logits: Array3<f32>,
    pub pred_boxes: Array3<f32>,
}

impl Predictions {
    /// Wrap logits and boxes, checking that their shapes agree.
    pub fn new(pred_logits: Array3<f32>, pred_boxes: Array3<f32>) -> Result<Self> {
        let predictions = Self {
            pred_logits,
            pred_boxes,
        };
        predictions.validate()?;
        Ok(predictions)
    }

    /// Build from flat row-major buffers.
    pub fn from_vec(
        batch_size: usize,
        num_queries: usize,
        num_classes: usize,
        logits: Vec<f32>,
        boxes: Vec<f32>,
    ) -> Result<Self> {
        let logits_len = logits.len();
        let pred_logits = Array3::from_shape_vec((batch_size, num_queries, num_classes), logits)
            .map_err(|_| MatchError::ShapeMismatch {
                what: "pred_logits buffer",
                expected: vec![batch_size * num_queries * num_classes],
                got: vec![logits_len],
            })?;
        let boxes_len = boxes.len();
        let pred_boxes = Array3::from_shape_vec((batch_size, num_queries, 4), boxes).map_err(|_| {
            MatchError::ShapeMismatch {
                what: "pred_boxes buffer",
                expected: vec![batch_size * num_queries * 4],
                got: vec![boxes_len],
            }
        })?;
        Self::new(pred_logits, pred_boxes)
    }

    pub fn batch_size(&self) -> usize {
        self.pred_logits.dim().0
    }

    pub fn num_queries(&self) -> usize {
        self.pred_logits.dim().1
    }

    pub fn num_classes(&self) -> usize {
        self.pred_logits.dim().2
    }

    /// Check that logits and boxes agree on batch and query dimensions and that
    /// every box has four coordinates.
    pub fn validate(&self) -> Result<()> {
        let (bs, nq, _) = self.pred_logits.dim();
        let boxes_dim = self.pred_boxes.dim();
        if boxes_dim != (bs, nq, 4) {
            return Err(MatchError::ShapeMismatch {
                what: "pred_boxes",
                expected: vec![bs, nq, 4],
                got: vec![boxes_dim.0, boxes_dim.1, boxes_dim.2],
            });
        }
        Ok(())
    }

    /// Logits flattened to `[batch_size * num_queries, num_classes]`.
    pub(crate) fn flat_logits(&self) -> Result<CowArray<'_, f32, Ix2>> {
        flatten_batch(&self.pred_logits, "pred_logits")
    }

    /// Boxes flattened to `[batch_size * num_queries, 4]`.
    pub(crate) fn flat_boxes(&self) -> Result<CowArray<'_, f32, Ix2>> {
        flatten_batch(&self.pred_boxes, "pred_boxes")
    }
}

// Borrows for standard layouts, copies otherwise.
fn flatten_batch<'a>(a: &'a Array3<f32>, what: &'static str) -> Result<CowArray<'a, f32, Ix2>> {
    let (bs, nq, last) = a.dim();
    a.to_shape((bs * nq, last))
        .map_err(|_| MatchError::ShapeMismatch {
            what,
            expected: vec![bs * nq, last],
            got: vec![bs, nq, last],
        })
}

/// Ground truth for one batch element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Class label per object, each in `[0, num_classes)`.
    pub labels: Vec<usize>,
    /// Normalized CXCYWH boxes, shape `[num_objects, 4]`.
    pub boxes: Array2<f32>,
}

impl Target {
    pub fn new(labels: Vec<usize>, boxes: Array2<f32>) -> Result<Self> {
        let target = Self { labels, boxes };
        target.validate_shape(0)?;
        Ok(target)
    }

    /// A batch element without any objects.
    pub fn empty() -> Self {
        Self {
            labels: Vec::new(),
            boxes: Array2::zeros((0, 4)),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub(crate) fn validate_shape(&self, batch: usize) -> Result<()> {
        if self.boxes.ncols() != 4 {
            return Err(MatchError::ShapeMismatch {
                what: "target boxes",
                expected: vec![self.labels.len(), 4],
                got: vec![self.boxes.nrows(), self.boxes.ncols()],
            });
        }
        if self.labels.len() != self.boxes.nrows() {
            return Err(MatchError::TargetCountMismatch {
                batch,
                labels: self.labels.len(),
                boxes: self.boxes.nrows(),
            });
        }
        Ok(())
    }

    pub(crate) fn validate_labels(&self, batch: usize, num_classes: usize) -> Result<()> {
        match self.labels.iter().find(|&&label| label >= num_classes) {
            Some(&label) => Err(MatchError::LabelOutOfRange {
                batch,
                label: label as i64,
                num_classes,
            }),
            None => Ok(()),
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::empty()
    }
}

/// Optimal pairing for one batch element.
///
/// `pred_indices[k]` is matched with `target_indices[k]`. Both have length
/// `min(num_queries, num_targets)` and `pred_indices` is sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchIndices {
    pub pred_indices: Vec<usize>,
    pub target_indices: Vec<usize>,
}

impl MatchIndices {
    pub fn new(pred_indices: Vec<usize>, target_indices: Vec<usize>) -> Self {
        debug_assert_eq!(pred_indices.len(), target_indices.len());
        Self {
            pred_indices,
            target_indices,
        }
    }

    pub fn len(&self) -> usize {
        self.pred_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pred_indices.is_empty()
    }

    /// Iterate over `(prediction, target)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pred_indices
            .iter()
            .copied()
            .zip(self.target_indices.iter().copied())
    }

    /// Total cost of the pairing under `cost`.
    pub fn total_cost(&self, cost: ArrayView2<'_, f32>) -> f64 {
        self.pairs().map(|(i, j)| cost[[i, j]] as f64).sum()
    }
}
