use crate::error::{MatchError, Result};
use crate::matcher::assignment::SolverKind;
use crate::matcher::cost::CostWeights;
use serde::{Deserialize, Serialize};

/// Configuration for the HungarianMatcher.
///
/// Field aliases accept the `set_cost_*` names used by training scripts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Relative weight of the classification error in the matching cost.
    #[serde(alias = "set_cost_class")]
    pub cost_class: f32,
    /// Relative weight of the L1 error of the box coordinates.
    #[serde(alias = "set_cost_bbox")]
    pub cost_bbox: f32,
    /// Relative weight of the generalized IoU of the boxes.
    #[serde(alias = "set_cost_giou")]
    pub cost_giou: f32,
    pub solver: SolverKind,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            cost_class: 1.0,
            cost_bbox: 1.0,
            cost_giou: 1.0,
            solver: SolverKind::default(),
        }
    }
}

impl MatcherConfig {
    pub fn new(cost_class: f32, cost_bbox: f32, cost_giou: f32) -> Self {
        Self {
            cost_class,
            cost_bbox,
            cost_giou,
            ..Self::default()
        }
    }

    pub fn with_cost_class(mut self, weight: f32) -> Self {
        self.cost_class = weight;
        self
    }

    pub fn with_cost_bbox(mut self, weight: f32) -> Self {
        self.cost_bbox = weight;
        self
    }

    pub fn with_cost_giou(mut self, weight: f32) -> Self {
        self.cost_giou = weight;
        self
    }

    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    /// Weights must be finite and non-negative, and not all zero.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("cost_class", self.cost_class),
            ("cost_bbox", self.cost_bbox),
            ("cost_giou", self.cost_giou),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MatchError::InvalidWeight { name, value });
            }
        }
        if self.cost_class == 0.0 && self.cost_bbox == 0.0 && self.cost_giou == 0.0 {
            return Err(MatchError::AllCostsZero);
        }
        Ok(())
    }

    pub fn weights(&self) -> CostWeights {
        CostWeights {
            class: self.cost_class,
            bbox: self.cost_bbox,
            giou: self.cost_giou,
        }
    }
}
