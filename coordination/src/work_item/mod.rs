//! Work-item contract extracted from meeting transcripts.
//!
//! ## Contract schema
//!
//! ```text
//! WorkItemCollection {
//!     work_items: [WorkItem {
//!         title:               String,          // <= 100 chars, imperative mood
//!         description:         String,          // WHAT + WHY
//!         acceptance_criteria: Vec<String>,     // numbered, verifiable
//!         task_breakdown:      Vec<String>,     // numbered implementation steps
//!         task_type:           Task | Fix | Chore | Docs   (default Task)
//!         component:           Option<String>,
//!     }]
//! }
//! ```
//!
//! The same schema is sent to the language model as the response format and
//! enforced on the way back by [`crate::validator::ResponseValidator`].

pub mod payload;

use std::fmt;

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use payload::{AzurePatchOperation, PatchOp, PlanePayload};

/// Maximum title length, counted in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Conventional-commit style classification of a work item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
pub enum TaskType {
    #[default]
    Task,
    Fix,
    Chore,
    Docs,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task => write!(f, "Task"),
            Self::Fix => write!(f, "Fix"),
            Self::Chore => write!(f, "Chore"),
            Self::Docs => write!(f, "Docs"),
        }
    }
}

/// A single unit of actionable work extracted from a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkItem {
    /// Use imperative mood, e.g. 'Fix: Enable dark mode toggle state' or
    /// 'Feat: Add API endpoint for user list'.
    #[schemars(length(max = 100))]
    pub title: String,
    /// A detailed explanation answering the WHAT (the problem or goal) and the
    /// WHY (the justification or business value), avoiding HOW.
    pub description: String,
    /// A numbered list of observable, verifiable conditions that must hold for
    /// the task to be considered complete.
    pub acceptance_criteria: Vec<String>,
    /// A numbered list of technical sub-tasks or implementation steps required
    /// to complete the main task.
    pub task_breakdown: Vec<String>,
    /// Conventional commit type: 'Task', 'Fix' (bug fix), 'Chore'
    /// (maintenance/build), 'Docs' (documentation update). Default: 'Task'.
    #[serde(default)]
    pub task_type: TaskType,
    /// The application area or module affected (e.g. 'API', 'Frontend:
    /// Checkout', 'Database'). Default: null.
    #[serde(default)]
    pub component: Option<String>,
}

impl WorkItem {
    /// Field-level constraints that serde cannot express.
    ///
    /// Returns a description of the first violated constraint.
    pub fn constraint_violation(&self) -> Option<String> {
        let title_chars = self.title.chars().count();
        if title_chars > MAX_TITLE_CHARS {
            return Some(format!(
                "title exceeds {MAX_TITLE_CHARS} characters ({title_chars}): {:?}",
                self.title
            ));
        }
        None
    }
}

/// Ordered, validated collection of work items.
///
/// Items are only reachable through shared references, so a collection
/// handed to persistence and dispatch is observed identically by both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkItemCollection {
    work_items: Vec<WorkItem>,
}

impl WorkItemCollection {
    /// Build a collection, enforcing per-item constraints all-or-nothing.
    ///
    /// Returns the index and description of the first offending item.
    pub fn from_items(work_items: Vec<WorkItem>) -> Result<Self, (usize, String)> {
        for (index, item) in work_items.iter().enumerate() {
            if let Some(violation) = item.constraint_violation() {
                return Err((index, violation));
            }
        }
        Ok(Self { work_items })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.work_items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WorkItem> {
        self.work_items.iter()
    }

    pub fn len(&self) -> usize {
        self.work_items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.work_items.is_empty()
    }

    /// Titles in collection order.
    pub fn titles(&self) -> Vec<&str> {
        self.work_items.iter().map(|w| w.title.as_str()).collect()
    }

    /// JSON schema of the collection, with all subschemas inlined.
    ///
    /// Local grammar-constrained decoders handle inline schemas more reliably
    /// than `$ref` indirection, so definitions are never emitted.
    pub fn json_schema() -> serde_json::Value {
        let generator = SchemaSettings::draft07()
            .with(|s| {
                s.inline_subschemas = true;
                s.meta_schema = None;
            })
            .into_generator();
        let schema = generator.into_root_schema_for::<WorkItemCollection>();
        serde_json::to_value(schema).unwrap_or_default()
    }
}

impl<'a> IntoIterator for &'a WorkItemCollection {
    type Item = &'a WorkItem;
    type IntoIter = std::slice::Iter<'a, WorkItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.work_items.iter()
    }
}

#[cfg(test)]
pub(crate) fn sample_item(title: &str) -> WorkItem {
    WorkItem {
        title: title.to_string(),
        description: format!("Context for {title}"),
        acceptance_criteria: vec!["1. It works".to_string()],
        task_breakdown: vec!["1. Do it".to_string(), "2. Test it".to_string()],
        task_type: TaskType::Task,
        component: None,
    }
}
