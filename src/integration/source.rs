//! Conversion of model outputs into matcher inputs.

use crate::error::Result;
use crate::matcher::Predictions;
use ndarray::Array3;

/// Helper trait for converting a model's output format into [`Predictions`].
///
/// Implementations must hand back plain host memory: anything tied to a device
/// or to a gradient graph is copied out first.
///
/// # Example
///
/// ```ignore
/// use hungarian_matcher_rs::{IntoPredictions, Predictions, Result};
///
/// struct MyHeadOutput { /* ... */ }
///
/// impl IntoPredictions for MyHeadOutput {
///     fn into_predictions(self) -> Result<Predictions> {
///         Predictions::new(self.logits, self.boxes)
///     }
/// }
/// ```
pub trait IntoPredictions {
    /// Convert the output into validated predictions.
    fn into_predictions(self) -> Result<Predictions>;
}

impl IntoPredictions for Predictions {
    fn into_predictions(self) -> Result<Predictions> {
        self.validate()?;
        Ok(self)
    }
}

/// `(pred_logits, pred_boxes)`.
impl IntoPredictions for (Array3<f32>, Array3<f32>) {
    fn into_predictions(self) -> Result<Predictions> {
        Predictions::new(self.0, self.1)
    }
}
