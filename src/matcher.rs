pub mod assignment;
pub mod box_ops;
mod config;
pub mod cost;
mod hungarian;
mod types;

pub use assignment::{AssignmentSolver, SolverKind, linear_sum_assignment};
pub use box_ops::{BBox, box_cxcywh_to_xyxy, generalized_box_iou};
pub use config::MatcherConfig;
pub use cost::{CostAssembler, CostWeights};
pub use hungarian::{HungarianMatcher, build_matcher};
pub use types::{MatchIndices, Predictions, Target};
