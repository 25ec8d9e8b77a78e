//! Azure DevOps work-item tracking client.
//!
//! Items are created with a JSON-patch document against
//! `{host}/{organization}/{project}/_apis/wit/workitems/$Task`, authenticated
//! with HTTP Basic auth (empty user name, personal access token as password).

use async_trait::async_trait;
use clarity_coordination::{TrackerIdentity, WorkItem};
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, info_span, Instrument, Span};

use super::{snippet, TrackerClient, TrackerError};
use crate::config::{trim_url, AzureConfig};

pub const API_VERSION: &str = "7.1";
/// Work-item type every extracted item is created as.
pub const WORK_ITEM_TYPE: &str = "Task";
/// Upper bound on ids per batch `GET workitems` request.
const MAX_IDS_PER_REQUEST: usize = 200;

const LIST_FIELDS: [&str; 5] = [
    "System.Id",
    "System.Title",
    "System.State",
    "System.WorkItemType",
    "System.AssignedTo",
];

/// A work item as it exists in Azure DevOps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteWorkItem {
    pub id: u64,
    pub title: String,
    pub state: String,
    pub work_item_type: String,
    pub assigned_to: String,
}

#[derive(Debug, Deserialize)]
struct CreatedWorkItem {
    id: u64,
    #[serde(default)]
    fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WiqlResult {
    #[serde(rename = "workItems", default)]
    work_items: Vec<WorkItemRef>,
}

#[derive(Debug, Deserialize)]
struct WorkItemRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct WorkItemBatch {
    #[serde(default)]
    value: Vec<CreatedWorkItem>,
}

pub struct AzureClient {
    host_url: String,
    pat: String,
    client: reqwest::Client,
    span: Span,
}

impl AzureClient {
    pub fn new(config: &AzureConfig, client: reqwest::Client) -> Self {
        let host_url = trim_url(&config.host_url);
        Self {
            span: info_span!("tracker", tracker = %TrackerIdentity::Azure, host = %host_url),
            host_url,
            pat: config.pat.clone(),
            client,
        }
    }

    /// Build `{host}/{segments...}?api-version=7.1`, percent-encoding each
    /// path segment (project names may contain spaces).
    pub fn api_url(&self, segments: &[&str]) -> Result<Url, TrackerError> {
        let mut url = Url::parse(&self.host_url)
            .map_err(|e| TrackerError::Payload(format!("invalid host {}: {e}", self.host_url)))?;
        url.path_segments_mut()
            .map_err(|_| TrackerError::Payload(format!("host {} cannot be a base", self.host_url)))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    pub fn create_url(&self, organization: &str, project: &str) -> Result<Url, TrackerError> {
        let work_item_type = format!("${WORK_ITEM_TYPE}");
        self.api_url(&[organization, project, "_apis", "wit", "workitems", &work_item_type])
    }

    fn require_pat(&self) -> Result<(), TrackerError> {
        if self.pat.is_empty() {
            return Err(TrackerError::ConfigurationMissing("Azure DevOps personal access token"));
        }
        Ok(())
    }

    async fn read_success(response: reqwest::Response) -> Result<String, TrackerError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TrackerError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }
        Ok(body)
    }

    /// List the project's work items, newest first.
    pub async fn list_work_items(
        &self,
        organization: &str,
        project: &str,
    ) -> Result<Vec<RemoteWorkItem>, TrackerError> {
        self.require_pat()?;

        async {
            info!(project, "Querying work items");

            let wiql = format!(
                "SELECT [System.Id], [System.Title], [System.State] FROM WorkItems \
                 WHERE [System.TeamProject] = '{}' ORDER BY [System.Id] DESC",
                project.replace('\'', "''")
            );
            let url = self.api_url(&[organization, project, "_apis", "wit", "wiql"])?;
            let response = self
                .client
                .post(url)
                .basic_auth("", Some(&self.pat))
                .json(&json!({ "query": wiql }))
                .send()
                .await?;
            let body = Self::read_success(response).await?;
            let result: WiqlResult = serde_json::from_str(&body)
                .map_err(|e| TrackerError::Malformed(format!("WIQL result: {e}")))?;

            if result.work_items.is_empty() {
                info!("No work items found matching the query");
                return Ok(Vec::new());
            }

            let ids: Vec<u64> = result.work_items.iter().map(|r| r.id).collect();
            info!(count = ids.len(), "Fetching work item details");

            let mut items = Vec::with_capacity(ids.len());
            for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
                let id_list = chunk
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                let mut url = self.api_url(&[organization, "_apis", "wit", "workitems"])?;
                url.query_pairs_mut()
                    .append_pair("ids", &id_list)
                    .append_pair("fields", &LIST_FIELDS.join(","));

                let response = self
                    .client
                    .get(url)
                    .basic_auth("", Some(&self.pat))
                    .send()
                    .await?;
                let body = Self::read_success(response).await?;
                let batch: WorkItemBatch = serde_json::from_str(&body)
                    .map_err(|e| TrackerError::Malformed(format!("work item batch: {e}")))?;
                items.extend(batch.value.into_iter().map(remote_from_fields));
            }
            Ok(items)
        }
        .instrument(self.span.clone())
        .await
    }
}

fn field_str(fields: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn remote_from_fields(item: CreatedWorkItem) -> RemoteWorkItem {
    let fields = &item.fields;
    let assigned_to = fields
        .get("System.AssignedTo")
        .and_then(|v| v.get("displayName"))
        .and_then(|v| v.as_str())
        .unwrap_or("Unassigned")
        .to_string();

    RemoteWorkItem {
        id: item.id,
        title: field_str(fields, "System.Title").unwrap_or_else(|| "N/A".into()),
        state: field_str(fields, "System.State").unwrap_or_else(|| "N/A".into()),
        work_item_type: field_str(fields, "System.WorkItemType").unwrap_or_else(|| "N/A".into()),
        assigned_to,
    }
}

#[async_trait]
impl TrackerClient for AzureClient {
    fn identity(&self) -> TrackerIdentity {
        TrackerIdentity::Azure
    }

    fn span(&self) -> &Span {
        &self.span
    }

    async fn create_work_item(
        &self,
        workspace: &str,
        project: &str,
        item: &WorkItem,
        iteration: Option<&str>,
    ) -> Result<Option<String>, TrackerError> {
        self.require_pat()?;

        let patch = item.to_tracker_b_payload(project, iteration);
        let body = serde_json::to_vec(&patch).map_err(|e| TrackerError::Payload(e.to_string()))?;
        let url = self.create_url(workspace, project)?;

        let response = self
            .client
            .post(url)
            .basic_auth("", Some(&self.pat))
            .header(reqwest::header::CONTENT_TYPE, "application/json-patch+json")
            .body(body)
            .send()
            .await?;

        let body = Self::read_success(response).await?;
        let created: CreatedWorkItem = serde_json::from_str(&body).map_err(|e| {
            TrackerError::Malformed(format!("expected created work item with id: {e}"))
        })?;

        info!(
            id = created.id,
            work_item_type = WORK_ITEM_TYPE,
            remote_title = field_str(&created.fields, "System.Title").as_deref().unwrap_or("-"),
            "Azure DevOps assigned work item id"
        );
        Ok(Some(created.id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerTarget;

    fn client(pat: &str) -> AzureClient {
        AzureClient::new(
            &AzureConfig {
                host_url: "https://dev.azure.com/".into(),
                pat: pat.into(),
                target: TrackerTarget::default(),
            },
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_create_url_encodes_segments() {
        let url = client("pat").create_url("contoso", "My Project").unwrap();
        assert_eq!(url.host_str(), Some("dev.azure.com"));
        assert!(url.path().starts_with("/contoso/My%20Project/_apis/wit/workitems/"));
        assert!(url.path().ends_with("Task"));
        assert_eq!(url.query(), Some("api-version=7.1"));
    }

    #[test]
    fn test_remote_from_fields_defaults() {
        let item: CreatedWorkItem = serde_json::from_value(json!({
            "id": 42,
            "fields": {"System.Title": "Fix login", "System.AssignedTo": {"displayName": "Bob"}}
        }))
        .unwrap();
        let remote = remote_from_fields(item);
        assert_eq!(remote.id, 42);
        assert_eq!(remote.title, "Fix login");
        assert_eq!(remote.assigned_to, "Bob");
        assert_eq!(remote.state, "N/A");

        let bare: CreatedWorkItem = serde_json::from_value(json!({"id": 7})).unwrap();
        assert_eq!(remote_from_fields(bare).assigned_to, "Unassigned");
    }

    #[tokio::test]
    async fn test_missing_pat_is_configuration_error() {
        let azure = client("");
        let err = azure.list_work_items("contoso", "proj").await.unwrap_err();
        assert!(matches!(err, TrackerError::ConfigurationMissing(_)));

        let item = WorkItem {
            title: "t".into(),
            description: "d".into(),
            acceptance_criteria: vec![],
            task_breakdown: vec![],
            task_type: Default::default(),
            component: None,
        };
        let err = azure
            .create_work_item("contoso", "proj", &item, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::ConfigurationMissing(_)));
    }
}
