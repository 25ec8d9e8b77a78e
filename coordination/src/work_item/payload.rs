//! Tracker-specific payload builders.
//!
//! Both builders are pure: they borrow the [`WorkItem`], never mutate it, and
//! produce byte-identical output for identical input. All transcript-derived
//! text is HTML-escaped before it is embedded in rich-text markup.

use serde::{Deserialize, Serialize};

use super::WorkItem;

/// Separator between project and iteration label in an Azure iteration path.
pub const ITERATION_PATH_SEPARATOR: char = '\\';

pub const AZURE_TITLE_FIELD: &str = "/fields/System.Title";
pub const AZURE_DESCRIPTION_FIELD: &str = "/fields/System.Description";
pub const AZURE_ITERATION_FIELD: &str = "/fields/System.IterationPath";

/// Body for Plane's work-item creation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanePayload {
    pub name: String,
    pub description_html: String,
}

/// JSON-patch operation kind. Only `add` is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
}

/// One operation in an Azure DevOps JSON-patch document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzurePatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub value: String,
}

impl AzurePatchOperation {
    fn add(path: &str, value: String) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.to_string(),
            from: None,
            value,
        }
    }
}

impl WorkItem {
    /// Rich-text description: context paragraph, acceptance criteria as an
    /// unordered list, technical breakdown as an ordered list.
    pub fn description_html(&self) -> String {
        let mut html = String::new();

        html.push_str("<h3>Description / Context</h3>\n");
        html.push_str(&format!("<p>{}</p>\n", html_escape(&self.description)));

        html.push_str("<h3>Acceptance Criteria</h3>\n<ul>\n");
        for criterion in &self.acceptance_criteria {
            html.push_str(&format!("<li>{}</li>\n", html_escape(criterion)));
        }
        html.push_str("</ul>\n");

        html.push_str("<h3>Technical Breakdown</h3>\n<ol>\n");
        for step in &self.task_breakdown {
            html.push_str(&format!("<li>{}</li>\n", html_escape(step)));
        }
        html.push_str("</ol>\n");

        html
    }

    /// Payload for Plane (`POST .../work-items/`).
    pub fn to_tracker_a_payload(&self) -> PlanePayload {
        PlanePayload {
            name: self.title.clone(),
            description_html: self.description_html(),
        }
    }

    /// JSON-patch document for Azure DevOps work-item creation.
    ///
    /// The iteration path is `{project}\{iteration}`. With no iteration label
    /// the operation is left out and the tracker applies its project default.
    pub fn to_tracker_b_payload(
        &self,
        project: &str,
        iteration: Option<&str>,
    ) -> Vec<AzurePatchOperation> {
        let mut ops = vec![
            AzurePatchOperation::add(AZURE_TITLE_FIELD, self.title.clone()),
            AzurePatchOperation::add(AZURE_DESCRIPTION_FIELD, self.description_html()),
        ];
        if let Some(label) = iteration {
            ops.push(AzurePatchOperation::add(
                AZURE_ITERATION_FIELD,
                iteration_path(project, label),
            ));
        }
        ops
    }
}

/// Join a project and an iteration label into an iteration path.
pub fn iteration_path(project: &str, iteration: &str) -> String {
    format!("{project}{ITERATION_PATH_SEPARATOR}{iteration}")
}

/// Escape text for embedding inside HTML element content.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
