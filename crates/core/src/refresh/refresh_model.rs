//! Refresh state models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::ClassifiedError;

/// Observable outcome of the refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshState {
    pub loading: bool,
    /// Last non-suppressed failure. Cleared by the next successful fetch.
    pub error: Option<ClassifiedError>,
    /// True once any fetch has succeeded.
    pub has_loaded: bool,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

impl RefreshState {
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.message.clone())
    }
}

/// Where the coordinator is in its fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshPhase {
    Idle,
    Fetching,
    /// A fetch is running and another one is queued behind it.
    FetchingAgain,
}
