//! Error classification - turns raw collaborator failures into a fixed set of kinds.

mod classifier_model;
mod error_classifier;

pub use classifier_model::{ClassifiedError, ErrorKind};
pub use error_classifier::ErrorClassifier;
