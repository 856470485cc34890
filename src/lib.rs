//! Optimal bipartite matching between detector predictions and ground truth.
//!
//! For every image in a batch, [`HungarianMatcher`] builds a cost matrix between
//! all predicted objects and all ground-truth objects, combining a
//! classification term, an L1 box distance and a generalized IoU term, and then
//! solves the linear sum assignment problem exactly. The resulting index pairs
//! feed the set-based losses of DETR-style detectors.
//!
//! ```
//! use hungarian_matcher_rs::{HungarianMatcher, MatcherConfig, Predictions, TargetBuilder};
//!
//! let matcher = HungarianMatcher::new(MatcherConfig::new(1.0, 5.0, 2.0))?;
//! let outputs = Predictions::from_vec(
//!     1, 2, 2,
//!     vec![2.0, 0.0, 0.0, 2.0],
//!     vec![0.2, 0.2, 0.1, 0.1, 0.7, 0.7, 0.2, 0.2],
//! )?;
//! let targets = [TargetBuilder::new().cxcywh(1, 0.7, 0.7, 0.2, 0.2).build()];
//!
//! let indices = matcher.forward(&outputs, &targets)?;
//! assert_eq!(indices[0].pred_indices, vec![1]);
//! assert_eq!(indices[0].target_indices, vec![0]);
//! # Ok::<(), hungarian_matcher_rs::MatchError>(())
//! ```

pub mod error;
pub mod integration;
pub mod matcher;

pub use error::{MatchError, Result};
pub use integration::{IntoPredictions, TargetBuilder};
pub use matcher::{
    AssignmentSolver, BBox, CostAssembler, CostWeights, HungarianMatcher, MatchIndices,
    MatcherConfig, Predictions, SolverKind, Target, build_matcher, linear_sum_assignment,
};

#[cfg(feature = "burn-backend")]
pub use integration::{BurnOutputs, BurnTarget, targets_from_burn};
