//! Burn tensor bridge for the matcher.
//!
//! Model heads built with Burn produce device tensors that may carry autodiff
//! state. Matching is a discrete step outside the gradient graph, so the tensors
//! are copied into host `ndarray` buffers with `into_data` before any cost is
//! computed.
//!
//! # Example
//!
//! ```ignore
//! use hungarian_matcher_rs::{BurnOutputs, HungarianMatcher, targets_from_burn};
//!
//! let outputs = BurnOutputs { pred_logits, pred_boxes };
//! let targets = targets_from_burn(burn_targets)?;
//! let indices = HungarianMatcher::default().match_outputs(outputs, &targets)?;
//! ```

use super::IntoPredictions;
use crate::error::{MatchError, Result};
use crate::matcher::{Predictions, Target};
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use ndarray::{Array2, Array3};

/// Detector head outputs as Burn tensors.
#[derive(Debug, Clone)]
pub struct BurnOutputs<B: Backend> {
    /// `[batch_size, num_queries, num_classes]` classification logits.
    pub pred_logits: Tensor<B, 3>,
    /// `[batch_size, num_queries, 4]` CXCYWH boxes.
    pub pred_boxes: Tensor<B, 3>,
}

/// Ground truth for one batch element as Burn tensors.
#[derive(Debug, Clone)]
pub struct BurnTarget<B: Backend> {
    /// `[num_objects]` class labels.
    pub labels: Tensor<B, 1, Int>,
    /// `[num_objects, 4]` CXCYWH boxes.
    pub boxes: Tensor<B, 2>,
}

fn float_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .into_vec::<f32>()
        .map_err(|err| MatchError::TensorData(format!("{err:?}")))
}

fn shape_error(what: &'static str, dims: &[usize], len: usize) -> MatchError {
    MatchError::ShapeMismatch {
        what,
        expected: dims.to_vec(),
        got: vec![len],
    }
}

impl<B: Backend> IntoPredictions for BurnOutputs<B> {
    fn into_predictions(self) -> Result<Predictions> {
        let logits_dims = self.pred_logits.dims();
        let boxes_dims = self.pred_boxes.dims();

        let logits = float_values(self.pred_logits)?;
        let logits_len = logits.len();
        let pred_logits = Array3::from_shape_vec(logits_dims, logits)
            .map_err(|_| shape_error("pred_logits data", &logits_dims, logits_len))?;

        let boxes = float_values(self.pred_boxes)?;
        let boxes_len = boxes.len();
        let pred_boxes = Array3::from_shape_vec(boxes_dims, boxes)
            .map_err(|_| shape_error("pred_boxes data", &boxes_dims, boxes_len))?;

        Predictions::new(pred_logits, pred_boxes)
    }
}

impl<B: Backend> BurnTarget<B> {
    /// Copy into a host [`Target`]; `batch` is used in error reports.
    pub fn into_target(self, batch: usize) -> Result<Target> {
        let raw = self
            .labels
            .into_data()
            .convert::<i64>()
            .into_vec::<i64>()
            .map_err(|err| MatchError::TensorData(format!("{err:?}")))?;
        let labels = raw
            .into_iter()
            .map(|label| usize::try_from(label).map_err(|_| MatchError::NegativeLabel { batch, label }))
            .collect::<Result<Vec<_>>>()?;

        let boxes_dims = self.boxes.dims();
        let values = float_values(self.boxes)?;
        let values_len = values.len();
        let boxes = Array2::from_shape_vec(boxes_dims, values)
            .map_err(|_| shape_error("target boxes data", &boxes_dims, values_len))?;

        let target = Target { labels, boxes };
        target.validate_shape(batch)?;
        Ok(target)
    }
}

/// Copy a batch of Burn targets to the host.
pub fn targets_from_burn<B: Backend>(targets: Vec<BurnTarget<B>>) -> Result<Vec<Target>> {
    targets
        .into_iter()
        .enumerate()
        .map(|(batch, target)| target.into_target(batch))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::HungarianMatcher;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type B = NdArray;

    #[test]
    fn test_burn_outputs_into_predictions() {
        let device = Default::default();
        let logits = Tensor::<B, 3>::from_data(
            TensorData::new(vec![0.0f32, 2.0, 3.0, 0.0, 0.0, 0.0], [1, 3, 2]),
            &device,
        );
        let boxes = Tensor::<B, 3>::from_data(
            TensorData::new(
                vec![
                    0.1f32, 0.1, 0.2, 0.2, //
                    0.5, 0.5, 0.2, 0.2, //
                    0.8, 0.8, 0.1, 0.1,
                ],
                [1, 3, 4],
            ),
            &device,
        );
        let outputs = BurnOutputs {
            pred_logits: logits,
            pred_boxes: boxes,
        };

        let target = BurnTarget {
            labels: Tensor::<B, 1, Int>::from_data(TensorData::new(vec![0i64], [1]), &device),
            boxes: Tensor::<B, 2>::from_data(
                TensorData::new(vec![0.5f32, 0.5, 0.2, 0.2], [1, 4]),
                &device,
            ),
        };
        let targets = targets_from_burn(vec![target]).unwrap();

        let indices = HungarianMatcher::default()
            .match_outputs(outputs, &targets)
            .unwrap();
        assert_eq!(indices[0].pred_indices, vec![1]);
        assert_eq!(indices[0].target_indices, vec![0]);
    }

    #[test]
    fn test_negative_label_rejected() {
        let device = Default::default();
        let target = BurnTarget::<B> {
            labels: Tensor::<B, 1, Int>::from_data(TensorData::new(vec![-1i64], [1]), &device),
            boxes: Tensor::<B, 2>::from_data(
                TensorData::new(vec![0.5f32, 0.5, 0.2, 0.2], [1, 4]),
                &device,
            ),
        };
        let err = target.into_target(3).unwrap_err();
        assert_eq!(err, MatchError::NegativeLabel { batch: 3, label: -1 });
    }
}
