//! Per-item dispatch bookkeeping shared by all tracker backends.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which tracker backend a client targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerIdentity {
    Plane,
    Azure,
}

impl fmt::Display for TrackerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plane => write!(f, "Plane"),
            Self::Azure => write!(f, "Azure DevOps"),
        }
    }
}

/// Result of submitting one work item to one tracker.
///
/// Items carry no identity before creation, so the title identifies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub title: String,
    pub success: bool,
    /// Identifier or name assigned by the tracker, when it reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchOutcome {
    pub fn created(title: impl Into<String>, remote_ref: Option<String>) -> Self {
        Self {
            title: title.into(),
            success: true,
            remote_ref,
            error: None,
        }
    }

    pub fn failed(title: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            success: false,
            remote_ref: None,
            error: Some(error.into()),
        }
    }
}

/// Ordered per-item outcomes of one batch against one tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub tracker: TrackerIdentity,
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    pub fn new(tracker: TrackerIdentity) -> Self {
        Self {
            tracker,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: DispatchOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    /// True iff every item succeeded. An empty batch counts as success.
    pub fn all_succeeded(&self) -> bool {
        self.success_count() == self.total()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}
