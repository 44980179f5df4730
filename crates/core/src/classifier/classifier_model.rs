//! Classification result types.

use serde::{Deserialize, Serialize};

/// The fixed set of failure kinds the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Transient connectivity failure.
    Network,
    /// A bounded wait expired. Suppressed like `Network`, logged separately.
    Timeout,
    /// No authenticated identity.
    Auth,
    /// Well-formed rejection from the data layer.
    Query,
}

impl ErrorKind {
    /// Returns true for failures that are expected to heal on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Timeout)
    }
}

/// A failure after classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    /// User-displayable message.
    pub message: String,
    /// When true the failure must not reach error surfaces.
    pub suppress: bool,
}
