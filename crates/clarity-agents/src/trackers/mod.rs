//! Issue-tracker backends.
//!
//! Every backend implements [`TrackerClient::create_work_item`] for a single
//! item. The batch loop is shared: items go out strictly one at a time, in
//! input order, and a failure on one item never stops the next.

pub mod azure;
pub mod plane;

use async_trait::async_trait;
use clarity_coordination::{DispatchOutcome, DispatchReport, TrackerIdentity, WorkItem};
use thiserror::Error;
use tracing::{error, info, warn, Instrument, Span};

pub use azure::{AzureClient, RemoteWorkItem};
pub use plane::PlaneClient;

/// Characters of a tracker response body kept in diagnostics.
pub const RESPONSE_SNIPPET_CHARS: usize = 200;

/// Errors from a single tracker request.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Status {status}. Response: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed tracker response: {0}")]
    Malformed(String),

    #[error("Could not build request: {0}")]
    Payload(String),

    #[error("{0} is not configured")]
    ConfigurationMissing(&'static str),
}

impl From<reqwest::Error> for TrackerError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// First [`RESPONSE_SNIPPET_CHARS`] characters of a response body.
pub fn snippet(body: &str) -> String {
    body.chars().take(RESPONSE_SNIPPET_CHARS).collect()
}

/// A tracker backend that can create work items.
#[async_trait]
pub trait TrackerClient: Send + Sync {
    fn identity(&self) -> TrackerIdentity;

    /// Diagnostics span owned by this client instance.
    fn span(&self) -> &Span;

    /// Create one work item. On success returns the tracker's reference for
    /// it (id or name), when the tracker reported one.
    async fn create_work_item(
        &self,
        workspace: &str,
        project: &str,
        item: &WorkItem,
        iteration: Option<&str>,
    ) -> Result<Option<String>, TrackerError>;

    /// Create every item in order and report each outcome.
    ///
    /// An empty batch is a success and only logs a warning.
    async fn dispatch(
        &self,
        workspace: &str,
        project: &str,
        items: &[WorkItem],
        iteration: Option<&str>,
    ) -> DispatchReport {
        let tracker = self.identity();
        async {
            let mut report = DispatchReport::new(tracker);

            if items.is_empty() {
                warn!("No work items provided to create in {tracker}");
                return report;
            }

            for item in items {
                match self
                    .create_work_item(workspace, project, item, iteration)
                    .await
                {
                    Ok(remote_ref) => {
                        info!(
                            title = %item.title,
                            remote_ref = remote_ref.as_deref().unwrap_or("-"),
                            "Created work item"
                        );
                        report.record(DispatchOutcome::created(&item.title, remote_ref));
                    }
                    Err(e) => {
                        error!(title = %item.title, "Failed to create work item: {e}");
                        report.record(DispatchOutcome::failed(&item.title, e.to_string()));
                    }
                }
            }

            if report.all_succeeded() {
                info!(
                    created = report.success_count(),
                    "All work items successfully created in {tracker}"
                );
            } else {
                error!(
                    created = report.success_count(),
                    total = report.total(),
                    "Completed {tracker} creation with failures"
                );
            }
            report
        }
        .instrument(self.span().clone())
        .await
    }

    /// `true` iff every item was created. Per-item detail is only logged;
    /// use [`TrackerClient::dispatch`] to inspect it.
    async fn create_work_items(
        &self,
        workspace: &str,
        project: &str,
        items: &[WorkItem],
        iteration: Option<&str>,
    ) -> bool {
        self.dispatch(workspace, project, items, iteration)
            .await
            .all_succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clarity_coordination::TaskType;
    use std::sync::Mutex;
    use tracing::info_span;

    /// Fails every item whose title is listed; records call order.
    struct ScriptedTracker {
        fail_titles: Vec<String>,
        calls: Mutex<Vec<String>>,
        span: Span,
    }

    impl ScriptedTracker {
        fn new(fail_titles: &[&str]) -> Self {
            Self {
                fail_titles: fail_titles.iter().map(|t| t.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
                span: info_span!("tracker", tracker = "scripted"),
            }
        }
    }

    #[async_trait]
    impl TrackerClient for ScriptedTracker {
        fn identity(&self) -> TrackerIdentity {
            TrackerIdentity::Plane
        }

        fn span(&self) -> &Span {
            &self.span
        }

        async fn create_work_item(
            &self,
            _workspace: &str,
            _project: &str,
            item: &WorkItem,
            _iteration: Option<&str>,
        ) -> Result<Option<String>, TrackerError> {
            self.calls.lock().unwrap().push(item.title.clone());
            if self.fail_titles.contains(&item.title) {
                Err(TrackerError::Status {
                    status: 500,
                    body: "boom".into(),
                })
            } else {
                Ok(Some(format!("remote-{}", item.title)))
            }
        }
    }

    fn items(titles: &[&str]) -> Vec<WorkItem> {
        titles
            .iter()
            .map(|t| WorkItem {
                title: t.to_string(),
                description: "d".into(),
                acceptance_criteria: vec![],
                task_breakdown: vec![],
                task_type: TaskType::Task,
                component: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_empty_batch_is_success() {
        let tracker = ScriptedTracker::new(&[]);
        assert!(tracker.create_work_items("w", "p", &[], None).await);
        assert!(tracker.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_items() {
        let tracker = ScriptedTracker::new(&["b"]);
        let report = tracker
            .dispatch("w", "p", &items(&["a", "b", "c"]), None)
            .await;

        assert_eq!(*tracker.calls.lock().unwrap(), vec!["a", "b", "c"]);
        assert!(!report.all_succeeded());
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.outcomes[1].title, "b");
        assert!(report.outcomes[1].error.as_deref().unwrap().contains("500"));
        assert_eq!(report.outcomes[2].remote_ref.as_deref(), Some("remote-c"));
    }

    #[tokio::test]
    async fn test_all_success_returns_true() {
        let tracker = ScriptedTracker::new(&[]);
        assert!(tracker.create_work_items("w", "p", &items(&["a", "b"]), None).await);
    }

    #[test]
    fn test_snippet_truncates() {
        let body = "x".repeat(500);
        assert_eq!(snippet(&body).len(), RESPONSE_SNIPPET_CHARS);
        assert_eq!(snippet("short"), "short");
    }
}
