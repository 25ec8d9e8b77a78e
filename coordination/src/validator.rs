//! Fail-closed validation of raw language-model output.
//!
//! The model is asked for `{"work_items": [...]}`. [`ResponseValidator`]
//! accepts the whole document or nothing: a syntax error, a root that does
//! not match, or a single malformed item rejects the entire response. No
//! partially valid items are ever salvaged.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::work_item::{WorkItem, WorkItemCollection};

/// Characters of raw output included in failure diagnostics.
pub const RAW_SNIPPET_CHARS: usize = 1000;

/// Class of validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Not parseable as JSON at all (including truncated output).
    Syntax,
    /// Valid JSON whose shape does not match the collection schema.
    Schema,
    /// Shape matches but a field constraint is violated (e.g. title length).
    Constraint,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "JsonSyntaxError"),
            Self::Schema => write!(f, "SchemaMismatch"),
            Self::Constraint => write!(f, "ConstraintViolation"),
        }
    }
}

/// Why a response was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ValidationFailure {
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl ValidationFailure {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Message with line breaks removed, suitable for a single log line.
    pub fn flattened_message(&self) -> String {
        flatten(&self.message)
    }
}

/// Parses raw model text into a [`WorkItemCollection`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    /// Strictly validate `raw_text`, returning the collection or the reason
    /// it was rejected.
    pub fn validate(&self, raw_text: &str) -> Result<WorkItemCollection, ValidationFailure> {
        let root: Value = serde_json::from_str(raw_text)
            .map_err(|e| ValidationFailure::new(ValidationErrorKind::Syntax, e.to_string()))?;

        let mut root = match root {
            Value::Object(map) => map,
            other => {
                return Err(ValidationFailure::new(
                    ValidationErrorKind::Schema,
                    format!(
                        "root must be an object with a `work_items` array, got {}",
                        json_type_name(&other)
                    ),
                ))
            }
        };

        let raw_items = match root.remove("work_items") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ValidationFailure::new(
                    ValidationErrorKind::Schema,
                    format!("`work_items` must be an array, got {}", json_type_name(&other)),
                ))
            }
            None => {
                return Err(ValidationFailure::new(
                    ValidationErrorKind::Schema,
                    "missing field `work_items`",
                ))
            }
        };

        let mut items = Vec::with_capacity(raw_items.len());
        for (index, raw_item) in raw_items.into_iter().enumerate() {
            let item = WorkItem::deserialize(raw_item).map_err(|e| {
                ValidationFailure::new(ValidationErrorKind::Schema, format!("work_items[{index}]: {e}"))
            })?;
            items.push(item);
        }

        WorkItemCollection::from_items(items).map_err(|(index, violation)| {
            ValidationFailure::new(
                ValidationErrorKind::Constraint,
                format!("work_items[{index}]: {violation}"),
            )
        })
    }

    /// Validate `raw_text`, logging and returning an empty collection on any
    /// failure.
    pub fn parse(&self, raw_text: &str) -> WorkItemCollection {
        match self.validate(raw_text) {
            Ok(collection) => {
                debug!(count = collection.len(), "Response validated");
                collection
            }
            Err(failure) => {
                error!(
                    error_type = %failure.kind,
                    details = %failure.flattened_message(),
                    raw_output_snippet = %raw_snippet(raw_text),
                    "JSON parsing failed"
                );
                WorkItemCollection::empty()
            }
        }
    }
}

/// First [`RAW_SNIPPET_CHARS`] characters of `raw`, newlines escaped.
pub fn raw_snippet(raw: &str) -> String {
    let head: String = raw.chars().take(RAW_SNIPPET_CHARS).collect();
    head.replace('\n', "\\n")
}

fn flatten(message: &str) -> String {
    message.replace(['\n', '\r'], " ")
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
