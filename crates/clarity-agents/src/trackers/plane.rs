//! Plane REST client.

use async_trait::async_trait;
use clarity_coordination::{TrackerIdentity, WorkItem};
use serde_json::Value;
use tracing::{debug, info_span, Span};

use super::{snippet, TrackerClient, TrackerError};
use crate::config::{trim_url, PlaneConfig};

/// Creates work items through `POST /api/v1/workspaces/{slug}/projects/{id}/work-items/`.
pub struct PlaneClient {
    host_url: String,
    api_token: String,
    client: reqwest::Client,
    span: Span,
}

impl PlaneClient {
    pub fn new(config: &PlaneConfig, client: reqwest::Client) -> Self {
        let host_url = trim_url(&config.host_url);
        Self {
            span: info_span!("tracker", tracker = %TrackerIdentity::Plane, host = %host_url),
            host_url,
            api_token: config.api_token.clone(),
            client,
        }
    }

    pub fn work_items_url(&self, workspace_slug: &str, project_id: &str) -> String {
        format!(
            "{}/api/v1/workspaces/{workspace_slug}/projects/{project_id}/work-items/",
            self.host_url
        )
    }
}

#[async_trait]
impl TrackerClient for PlaneClient {
    fn identity(&self) -> TrackerIdentity {
        TrackerIdentity::Plane
    }

    fn span(&self) -> &Span {
        &self.span
    }

    async fn create_work_item(
        &self,
        workspace: &str,
        project: &str,
        item: &WorkItem,
        _iteration: Option<&str>,
    ) -> Result<Option<String>, TrackerError> {
        let payload = item.to_tracker_a_payload();
        let url = self.work_items_url(workspace, project);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.as_u16() != 201 {
            return Err(TrackerError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        // Plane echoes the created item; fall back to our title if it does not.
        let name = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("name").and_then(Value::as_str).map(String::from));
        if name.is_none() {
            debug!(title = %item.title, "Plane response carried no name");
        }
        Ok(Some(name.unwrap_or_else(|| item.title.clone())))
    }
}
