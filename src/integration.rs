//! Integration module for feeding detector outputs into the matcher.
//!
//! This module provides conversion traits and builders for the matcher inputs,
//! plus an optional bridge from Burn tensors.

mod builder;
mod source;

pub use builder::TargetBuilder;
pub use source::IntoPredictions;

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnOutputs, BurnTarget, targets_from_burn};
