use thiserror::Error;

/// Errors produced while configuring or running the matcher.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("all costs can't be 0: at least one of cost_class, cost_bbox, cost_giou must be non-zero")]
    AllCostsZero,

    #[error("invalid cost weight `{name}` = {value}: weights must be finite and non-negative")]
    InvalidWeight { name: &'static str, value: f32 },

    #[error("shape mismatch for {what}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("expected one target per batch element ({expected}), got {got}")]
    BatchSizeMismatch { expected: usize, got: usize },

    #[error("target {batch} has {labels} labels but {boxes} boxes")]
    TargetCountMismatch {
        batch: usize,
        labels: usize,
        boxes: usize,
    },

    #[error("label {label} in target {batch} is out of range for {num_classes} classes")]
    LabelOutOfRange {
        batch: usize,
        label: i64,
        num_classes: usize,
    },

    #[error("label {label} of concatenated target {index} is out of range for {num_classes} classes")]
    ConcatLabelOutOfRange {
        index: usize,
        label: usize,
        num_classes: usize,
    },

    #[error("label {label} in target {batch} is negative")]
    NegativeLabel { batch: usize, label: i64 },

    #[error("cost matrix contains a non-finite entry at ({row}, {col})")]
    NonFiniteCost { row: usize, col: usize },

    #[error("cost matrix is infeasible")]
    Infeasible,

    #[error("lapjv solver failed: {0}")]
    Solver(String),

    #[error("tensor data conversion failed: {0}")]
    TensorData(String),
}

pub type Result<T> = std::result::Result<T, MatchError>;
