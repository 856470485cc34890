//! HungarianMatcher: optimal one-to-one assignment of predictions to targets.

use crate::error::{MatchError, Result};
use crate::integration::IntoPredictions;
use crate::matcher::assignment::AssignmentSolver;
use crate::matcher::config::MatcherConfig;
use crate::matcher::cost::{CostAssembler, split_by_batch};
use crate::matcher::types::{MatchIndices, Predictions, Target};
use ndarray::{Array2, Axis, concatenate};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Computes a matching between predictions and ground truth.
///
/// Targets do not include the no-object class, so there are usually more
/// predictions than targets: the best predictions are matched one-to-one and
/// the rest stay unmatched.
#[derive(Debug, Clone)]
pub struct HungarianMatcher {
    config: MatcherConfig,
    assembler: CostAssembler,
    solver: AssignmentSolver,
}

impl HungarianMatcher {
    pub fn new(config: MatcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            assembler: CostAssembler::new(config.weights()),
            solver: AssignmentSolver::new(config.solver),
            config,
        })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Match every batch element.
    ///
    /// Returns one [`MatchIndices`] per batch element with
    /// `len = min(num_queries, num_targets)`.
    pub fn forward(&self, outputs: &Predictions, targets: &[Target]) -> Result<Vec<MatchIndices>> {
        let costs = self.cost_matrices(outputs, targets)?;

        #[cfg(feature = "rayon")]
        let indices = costs
            .par_iter()
            .enumerate()
            .map(|(batch, cost)| self.solve_one(batch, cost))
            .collect();

        #[cfg(not(feature = "rayon"))]
        let indices = costs
            .iter()
            .enumerate()
            .map(|(batch, cost)| self.solve_one(batch, cost))
            .collect();

        indices
    }

    /// Convert `outputs` to host-side predictions, then match.
    pub fn match_outputs<P: IntoPredictions>(
        &self,
        outputs: P,
        targets: &[Target],
    ) -> Result<Vec<MatchIndices>> {
        let predictions = outputs.into_predictions()?;
        self.forward(&predictions, targets)
    }

    /// Per-batch-element cost blocks of shape `[num_queries, num_targets_b]`.
    pub fn cost_matrices(
        &self,
        outputs: &Predictions,
        targets: &[Target],
    ) -> Result<Vec<Array2<f32>>> {
        self.validate_inputs(outputs, targets)?;

        let num_queries = outputs.num_queries();
        let sizes: Vec<usize> = targets.iter().map(Target::len).collect();
        let tgt_ids: Vec<usize> = targets
            .iter()
            .flat_map(|t| t.labels.iter().copied())
            .collect();
        let tgt_bbox = concatenate_boxes(targets)?;

        tracing::debug!(
            batch_size = outputs.batch_size(),
            num_queries,
            num_targets = tgt_ids.len(),
            "assembling matching cost"
        );

        let out_logits = outputs.flat_logits()?;
        let out_bbox = outputs.flat_boxes()?;
        let cost = self.assembler.assemble(
            out_logits.view(),
            out_bbox.view(),
            &tgt_ids,
            tgt_bbox.view(),
        )?;

        split_by_batch(cost.view(), num_queries, &sizes)
    }

    fn solve_one(&self, batch: usize, cost: &Array2<f32>) -> Result<MatchIndices> {
        let indices = self.solver.solve(cost.view())?;
        tracing::trace!(batch, num_matched = indices.len(), "solved assignment");
        Ok(indices)
    }

    fn validate_inputs(&self, outputs: &Predictions, targets: &[Target]) -> Result<()> {
        outputs.validate()?;
        if targets.len() != outputs.batch_size() {
            return Err(MatchError::BatchSizeMismatch {
                expected: outputs.batch_size(),
                got: targets.len(),
            });
        }

        let num_queries = outputs.num_queries();
        let num_classes = outputs.num_classes();
        for (batch, target) in targets.iter().enumerate() {
            target.validate_shape(batch)?;
            target.validate_labels(batch, num_classes)?;
            if target.len() > num_queries {
                tracing::warn!(
                    batch,
                    num_targets = target.len(),
                    num_queries,
                    "more targets than queries; some targets will stay unmatched"
                );
            }
        }
        Ok(())
    }
}

impl Default for HungarianMatcher {
    fn default() -> Self {
        let config = MatcherConfig::default();
        Self {
            assembler: CostAssembler::new(config.weights()),
            solver: AssignmentSolver::new(config.solver),
            config,
        }
    }
}

/// Build a matcher from configuration, rejecting invalid weights.
pub fn build_matcher(config: &MatcherConfig) -> Result<HungarianMatcher> {
    HungarianMatcher::new(config.clone())
}

fn concatenate_boxes(targets: &[Target]) -> Result<Array2<f32>> {
    if targets.is_empty() {
        return Ok(Array2::zeros((0, 4)));
    }
    let views: Vec<_> = targets.iter().map(|t| t.boxes.view()).collect();
    concatenate(Axis(0), &views).map_err(|_| MatchError::ShapeMismatch {
        what: "target boxes",
        expected: vec![4],
        got: views.iter().map(|v| v.ncols()).collect(),
    })
}
