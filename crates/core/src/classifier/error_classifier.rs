//! Maps engine errors to [`ErrorKind`]s.

use super::classifier_model::{ClassifiedError, ErrorKind};
use crate::errors::{DataError, Error};

/// Lower-cased fragments that mark an untyped failure as a connectivity problem.
const NETWORK_MARKERS: &[&str] = &[
    "failed to fetch",
    "network request failed",
    "networkerror",
    "fetch failed",
    "load failed",
    "connection reset",
    "connection refused",
    "econnreset",
    "socket hang up",
];

/// Lower-cased fragments that mark an untyped failure as an expired deadline.
const TIMEOUT_MARKERS: &[&str] = &["timed out", "timeout"];

/// Stateless classifier. `verbose` surfaces transient failures as well, which
/// is what debug builds of a dashboard want.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier {
    verbose: bool,
}

impl ErrorClassifier {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Classifies an error. Deterministic for a given error value.
    pub fn classify(&self, error: &Error) -> ClassifiedError {
        let kind = Self::kind_of(error);
        ClassifiedError {
            kind,
            message: Self::display_message(kind, error),
            suppress: kind.is_transient() && !self.verbose,
        }
    }

    fn kind_of(error: &Error) -> ErrorKind {
        match error {
            Error::Data(DataError::Network(_)) => ErrorKind::Network,
            Error::Data(DataError::Timeout(_)) => ErrorKind::Timeout,
            Error::Data(DataError::Unauthenticated) | Error::Auth(_) => ErrorKind::Auth,
            Error::Data(DataError::Query { .. }) => ErrorKind::Query,
            Error::Data(DataError::Other(message)) | Error::Unexpected(message) => {
                Self::kind_from_message(message)
            }
            Error::Validation(_) | Error::Config(_) => ErrorKind::Query,
        }
    }

    fn kind_from_message(message: &str) -> ErrorKind {
        let lowered = message.to_lowercase();
        if TIMEOUT_MARKERS.iter().any(|m| lowered.contains(m)) {
            ErrorKind::Timeout
        } else if NETWORK_MARKERS.iter().any(|m| lowered.contains(m)) {
            ErrorKind::Network
        } else {
            ErrorKind::Query
        }
    }

    fn display_message(kind: ErrorKind, error: &Error) -> String {
        match kind {
            ErrorKind::Auth => "You need to sign in to see your balances.".to_string(),
            ErrorKind::Network => {
                "Unable to reach the server. Showing the last known balances.".to_string()
            }
            ErrorKind::Timeout => "The server took too long to respond.".to_string(),
            ErrorKind::Query => match error {
                Error::Data(DataError::Query { message, .. }) => message.clone(),
                other => other.to_string(),
            },
        }
    }
}
