//! Matching cost between predictions and ground-truth objects.

use crate::error::{MatchError, Result};
use crate::matcher::box_ops::{box_cxcywh_to_xyxy, generalized_box_iou};
use ndarray::{Array2, ArrayView2, Axis, s};

/// Row-wise softmax over the class axis.
pub fn softmax(logits: ArrayView2<'_, f32>) -> Array2<f32> {
    let mut probs = logits.to_owned();
    for mut row in probs.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &x| m.max(x));
        row.mapv_inplace(|x| (x - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|x| x / sum);
    }
    probs
}

/// Classification cost: `-prob[label]` for every (prediction, target) pair.
///
/// Uses the raw probability rather than its log; the constant 1 of `1 - prob`
/// does not change the matching and is left out.
pub fn class_cost(probs: ArrayView2<'_, f32>, labels: &[usize]) -> Array2<f32> {
    let mut cost = Array2::zeros((probs.nrows(), labels.len()));
    for (j, &label) in labels.iter().enumerate() {
        cost.column_mut(j).assign(&probs.column(label).mapv(|p| -p));
    }
    cost
}

/// Pairwise L1 distance between CXCYWH boxes.
pub fn l1_cost(pred_boxes: ArrayView2<'_, f32>, tgt_boxes: ArrayView2<'_, f32>) -> Array2<f32> {
    let mut dists = Array2::zeros((pred_boxes.nrows(), tgt_boxes.nrows()));
    for (i, p) in pred_boxes.outer_iter().enumerate() {
        for (j, t) in tgt_boxes.outer_iter().enumerate() {
            dists[[i, j]] = p.iter().zip(t.iter()).map(|(a, b)| (a - b).abs()).sum();
        }
    }
    dists
}

/// Negated generalized IoU between CXCYWH boxes.
pub fn giou_cost(pred_boxes: ArrayView2<'_, f32>, tgt_boxes: ArrayView2<'_, f32>) -> Array2<f32> {
    let pred_xyxy = box_cxcywh_to_xyxy(pred_boxes);
    let tgt_xyxy = box_cxcywh_to_xyxy(tgt_boxes);
    -generalized_box_iou(pred_xyxy.view(), tgt_xyxy.view())
}

/// Relative weights of the three cost terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostWeights {
    pub class: f32,
    pub bbox: f32,
    pub giou: f32,
}

/// Builds the weighted matching cost over a whole batch.
#[derive(Debug, Clone, Copy)]
pub struct CostAssembler {
    weights: CostWeights,
}

impl CostAssembler {
    pub fn new(weights: CostWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> CostWeights {
        self.weights
    }

    /// Cost between every prediction row and every concatenated target.
    ///
    /// `pred_logits` is `[B * P, C]`, `pred_boxes` is `[B * P, 4]`, and targets of all
    /// batch elements are concatenated in batch order. Returns `[B * P, T]`.
    pub fn assemble(
        &self,
        pred_logits: ArrayView2<'_, f32>,
        pred_boxes: ArrayView2<'_, f32>,
        tgt_labels: &[usize],
        tgt_boxes: ArrayView2<'_, f32>,
    ) -> Result<Array2<f32>> {
        let num_preds = pred_logits.nrows();
        if pred_boxes.dim() != (num_preds, 4) {
            return Err(shape_mismatch("pred_boxes", (num_preds, 4), pred_boxes.dim()));
        }
        if tgt_boxes.dim() != (tgt_labels.len(), 4) {
            return Err(shape_mismatch(
                "tgt_boxes",
                (tgt_labels.len(), 4),
                tgt_boxes.dim(),
            ));
        }

        let num_classes = pred_logits.ncols();
        if let Some((index, &label)) = tgt_labels
            .iter()
            .enumerate()
            .find(|&(_, &l)| l >= num_classes)
        {
            return Err(MatchError::ConcatLabelOutOfRange {
                index,
                label,
                num_classes,
            });
        }

        let out_prob = softmax(pred_logits);
        let cost_class = class_cost(out_prob.view(), tgt_labels);
        let cost_bbox = l1_cost(pred_boxes, tgt_boxes);
        let cost_giou = giou_cost(pred_boxes, tgt_boxes);

        let CostWeights { class, bbox, giou } = self.weights;
        Ok(cost_bbox * bbox + cost_class * class + cost_giou * giou)
    }
}

/// Split a `[B * P, T]` cost into one `P x G_b` block per batch element.
///
/// Column blocks follow `sizes`; entries pairing a batch element's predictions with
/// another element's targets are dropped.
pub fn split_by_batch(
    cost: ArrayView2<'_, f32>,
    num_queries: usize,
    sizes: &[usize],
) -> Result<Vec<Array2<f32>>> {
    let expected = (num_queries * sizes.len(), sizes.iter().sum::<usize>());
    if cost.dim() != expected {
        return Err(shape_mismatch("batch cost", expected, cost.dim()));
    }

    if num_queries == 0 {
        return Ok(sizes.iter().map(|&size| Array2::zeros((0, size))).collect());
    }

    let mut offset = 0;
    Ok(sizes
        .iter()
        .zip(cost.axis_chunks_iter(Axis(0), num_queries))
        .map(|(&size, rows)| {
            let block = rows.slice(s![.., offset..offset + size]).to_owned();
            offset += size;
            block
        })
        .collect())
}

fn shape_mismatch(what: &'static str, expected: (usize, usize), got: (usize, usize)) -> MatchError {
    MatchError::ShapeMismatch {
        what,
        expected: vec![expected.0, expected.1],
        got: vec![got.0, got.1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let logits: Array2<f32> = array![[1.0, 2.0, 3.0], [1000.0, 1000.0, -1000.0]];
        let probs = softmax(logits.view());
        for row in probs.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(probs[[1, 0]], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(probs[[1, 2]], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_class_cost_is_negative_probability() {
        let probs: Array2<f32> = array![[0.25, 0.75], [0.9, 0.1]];
        let cost = class_cost(probs.view(), &[1, 0, 1]);
        let expected: Array2<f32> = array![[-0.75, -0.25, -0.75], [-0.1, -0.9, -0.1]];
        assert_eq!(cost, expected);
    }

    #[test]
    fn test_l1_cost() {
        let a: Array2<f32> = array![[0.5, 0.5, 0.2, 0.2]];
        let b: Array2<f32> = array![[0.5, 0.5, 0.2, 0.2], [0.6, 0.4, 0.1, 0.3]];
        let cost = l1_cost(a.view(), b.view());
        assert_eq!(cost.dim(), (1, 2));
        assert_abs_diff_eq!(cost[[0, 0]], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(cost[[0, 1]], 0.4, epsilon = 1e-6);
    }

    #[test]
    fn test_giou_cost_of_same_box() {
        let a: Array2<f32> = array![[0.5, 0.5, 0.2, 0.2]];
        let cost = giou_cost(a.view(), a.view());
        assert_abs_diff_eq!(cost[[0, 0]], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_weighted_combination() {
        let logits: Array2<f32> = array![[0.0, 3f32.ln()]];
        let pred: Array2<f32> = array![[0.5, 0.5, 0.2, 0.2]];
        let tgt: Array2<f32> = array![[0.6, 0.5, 0.2, 0.2]];

        let weights = CostWeights {
            class: 2.0,
            bbox: 5.0,
            giou: 3.0,
        };
        let cost = CostAssembler::new(weights)
            .assemble(logits.view(), pred.view(), &[1], tgt.view())
            .unwrap();

        // Boxes [0.4, 0.6] and [0.5, 0.7] on x: IoU 1/3, enclosing 0.3 x 0.2.
        let giou = 1.0 / 3.0 - (0.06 - 0.06) / 0.06;
        let expected = 5.0 * 0.1 + 2.0 * -0.75 + 3.0 * -giou;
        assert_abs_diff_eq!(cost[[0, 0]], expected, epsilon = 1e-5);
    }

    #[test]
    fn test_class_only_weights() {
        let logits: Array2<f32> = array![[0.0, 3f32.ln()], [3f32.ln(), 0.0]];
        let pred: Array2<f32> = array![[0.1, 0.1, 0.1, 0.1], [0.9, 0.9, 0.1, 0.1]];
        let tgt: Array2<f32> = array![[0.5, 0.5, 0.2, 0.2], [0.2, 0.8, 0.3, 0.1]];

        let weights = CostWeights {
            class: 1.0,
            bbox: 0.0,
            giou: 0.0,
        };
        let cost = CostAssembler::new(weights)
            .assemble(logits.view(), pred.view(), &[0, 1], tgt.view())
            .unwrap();

        let probs = softmax(logits.view());
        assert_abs_diff_eq!(cost[[0, 0]], -0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(cost[[0, 1]], -0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(cost[[1, 0]], -0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(cost[[1, 1]], -0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(cost[[1, 1]], -probs[[1, 1]], epsilon = 1e-7);
    }

    #[test]
    fn test_assemble_rejects_bad_label() {
        let logits: Array2<f32> = array![[0.0, 0.0]];
        let boxes: Array2<f32> = array![[0.5, 0.5, 0.2, 0.2]];
        let weights = CostWeights {
            class: 1.0,
            bbox: 1.0,
            giou: 1.0,
        };
        let err = CostAssembler::new(weights)
            .assemble(logits.view(), boxes.view(), &[2], boxes.view())
            .unwrap_err();
        assert_eq!(
            err,
            MatchError::ConcatLabelOutOfRange {
                index: 0,
                label: 2,
                num_classes: 2
            }
        );
    }

    fn assembler() -> CostAssembler {
        CostAssembler::new(CostWeights {
            class: 1.0,
            bbox: 1.0,
            giou: 1.0,
        })
    }

    #[test]
    fn test_assemble_reports_concatenated_label_index() {
        let logits: Array2<f32> = array![[0.0, 0.0, 0.0]];
        let pred: Array2<f32> = array![[0.5, 0.5, 0.2, 0.2]];
        let tgt = Array2::from_elem((3, 4), 0.5);
        let err = assembler()
            .assemble(logits.view(), pred.view(), &[0, 2, 7], tgt.view())
            .unwrap_err();
        assert_eq!(
            err,
            MatchError::ConcatLabelOutOfRange {
                index: 2,
                label: 7,
                num_classes: 3
            }
        );
    }

    #[test]
    fn test_assemble_rejects_pred_row_mismatch() {
        let logits = Array2::<f32>::zeros((3, 2));
        let pred = Array2::from_elem((2, 4), 0.5);
        let tgt: Array2<f32> = array![[0.5, 0.5, 0.2, 0.2]];
        let err = assembler()
            .assemble(logits.view(), pred.view(), &[0], tgt.view())
            .unwrap_err();
        assert_eq!(
            err,
            MatchError::ShapeMismatch {
                what: "pred_boxes",
                expected: vec![3, 4],
                got: vec![2, 4]
            }
        );
    }

    #[test]
    fn test_assemble_rejects_narrow_boxes() {
        let logits = Array2::<f32>::zeros((2, 2));
        let pred = Array2::from_elem((2, 4), 0.5);
        let tgt: Array2<f32> = array![[0.5, 0.5, 0.2]];
        let err = assembler()
            .assemble(logits.view(), pred.view(), &[0], tgt.view())
            .unwrap_err();
        assert_eq!(
            err,
            MatchError::ShapeMismatch {
                what: "tgt_boxes",
                expected: vec![1, 4],
                got: vec![1, 3]
            }
        );

        let wide_pred = Array2::from_elem((2, 5), 0.5);
        let tgt: Array2<f32> = array![[0.5, 0.5, 0.2, 0.2]];
        let err = assembler()
            .assemble(logits.view(), wide_pred.view(), &[0], tgt.view())
            .unwrap_err();
        assert!(matches!(err, MatchError::ShapeMismatch { what: "pred_boxes", .. }));
    }

    #[test]
    fn test_assemble_rejects_label_box_count_mismatch() {
        let logits = Array2::<f32>::zeros((1, 2));
        let pred = Array2::from_elem((1, 4), 0.5);
        let tgt = Array2::from_elem((2, 4), 0.5);
        let err = assembler()
            .assemble(logits.view(), pred.view(), &[0], tgt.view())
            .unwrap_err();
        assert!(matches!(err, MatchError::ShapeMismatch { what: "tgt_boxes", .. }));
    }

    #[test]
    fn test_split_by_batch() {
        // 2 batch elements x 2 queries, targets sized [1, 2].
        let cost = Array2::from_shape_fn((4, 3), |(i, j)| (i * 10 + j) as f32);
        let blocks = split_by_batch(cost.view(), 2, &[1, 2]).unwrap();

        assert_eq!(blocks.len(), 2);
        let first: Array2<f32> = array![[0.0], [10.0]];
        let second: Array2<f32> = array![[21.0, 22.0], [31.0, 32.0]];
        assert_eq!(blocks[0], first);
        assert_eq!(blocks[1], second);
    }

    #[test]
    fn test_split_with_empty_targets() {
        let cost = Array2::from_shape_fn((4, 2), |(i, j)| (i * 10 + j) as f32);
        let blocks = split_by_batch(cost.view(), 2, &[0, 2]).unwrap();
        assert_eq!(blocks[0].dim(), (2, 0));
        assert_eq!(blocks[1].dim(), (2, 2));
        assert_eq!(blocks[1][[0, 0]], 20.0);
    }

    #[test]
    fn test_split_without_queries() {
        let cost = Array2::<f32>::zeros((0, 3));
        let blocks = split_by_batch(cost.view(), 0, &[1, 2]).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].dim(), (0, 2));
    }

    #[test]
    fn test_split_rejects_bad_shapes() {
        let cost = Array2::<f32>::zeros((4, 3));
        let err = split_by_batch(cost.view(), 3, &[1, 2]).unwrap_err();
        assert_eq!(
            err,
            MatchError::ShapeMismatch {
                what: "batch cost",
                expected: vec![6, 3],
                got: vec![4, 3]
            }
        );
        assert!(split_by_batch(cost.view(), 2, &[1, 1]).is_err());
        assert!(split_by_batch(cost.view(), 2, &[2, 2]).is_err());
    }
}
