//! System prompt templates for transcript extraction.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever template content changes.
//! The version is logged with every generation request so that a saved
//! work-item file can be traced back to the instructions that produced it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prompt version. Bump on any template content change.
pub const PROMPT_VERSION: &str = "1.3.0";

/// Minimal extraction template.
///
/// Asks for every follow-up action with no coverage pressure. Useful for
/// short transcripts where the aggressive templates over-split commitments.
pub const PROMPT_A: &str = r#"You are an expert Project Manager AI. Your only task is to read the meeting transcript you are given and extract every distinct action, commitment, or deliverable that needs follow-up.

Produce one work item per action.

RULES:
1. Output ONLY one JSON object with the root key "work_items" holding an array of work items. No introductory text, no markdown fences, no commentary.
2. When the transcript does not mention a value, use the schema default.

FIELDS:
- title: concise task title, imperative mood, at most 100 characters.
- description: full context, background, and the names of the people involved.
- acceptance_criteria: numbered, verifiable conditions for completion.
- task_breakdown: numbered implementation steps.
- task_type: one of "Task", "Fix", "Chore", "Docs". Default "Task".
- component: the application area affected, or null.

Example:
{
  "work_items": [
    {
      "title": "Review Q3 marketing strategy slides",
      "description": "Alice committed to reviewing the Q3 strategy slides and giving feedback on budget allocation before the end of the week.",
      "acceptance_criteria": ["1. Feedback on budget allocation is sent to the team."],
      "task_breakdown": ["1. Read the Q3 slides.", "2. Write feedback notes."],
      "task_type": "Task",
      "component": null
    }
  ]
}
"#;

/// Maximum-coverage template with a one-shot example.
///
/// This is the default template used by the CLI.
pub const PROMPT_B: &str = r#"You are an expert Agile Project Manager AI that turns unstructured meeting text into actionable, high-quality software work items. Analyze the meeting transcript and extract every distinct commitment, action, or deliverable.

--- CORE INSTRUCTIONS ---
1. GOAL: maximum extraction coverage. Read every sentence for implied or explicit actions, commitments, decisions, or follow-ups. Create one work item for each distinct action.
2. STRICT JSON OUTPUT: follow the JSON schema supplied with the request. Output ONLY one valid JSON object whose root key "work_items" is an array.
3. PROCESS: before writing JSON, identify every person and the actions tied to them. Phrases such as "we should", "I'll", "must look at" or "need to fix" each start a new work item.
4. DEFAULTS: when the transcript omits a value, use the schema default but still create the work item.

--- QUALITY RULES ---
* title: a concise, imperative, commit-style message (e.g. "Feat: Add user preference service").
* description: full context answering WHAT (the action) and WHY (the business reason or impact). Use direct, active voice. Never write "the speaker mentioned", "the transcript shows" or "it was agreed"; state the task directly.
* task_breakdown: a numbered list of technical implementation sub-tasks (e.g. "1. Update schema...", "2. Create route handler...").
* acceptance_criteria: a numbered list of testable conditions that mark the task complete from the user's perspective.
* component: the most specific module or application area mentioned (e.g. "Payment API", "React UI").

--- ONE-SHOT EXAMPLE ---
One work item object:
{
  "title": "Fix: Address timezone errors in date parsing utility",
  "description": "The date parsing logic in the core utility class produces timezone errors for users in Europe, which breaks date display in the user profile. Bob committed to fixing it so dates render consistently worldwide.",
  "task_breakdown": [
    "1. Select a standard date library to replace the current parser.",
    "2. Refactor the utility function to use the new parsing methods.",
    "3. Add unit tests covering several UTC offsets (e.g. +5, -8).",
    "4. Deploy to staging for QA."
  ],
  "acceptance_criteria": [
    "1. The date parsing utility handles UTC offsets correctly.",
    "2. Dates in the user profile match the user's local timezone setting.",
    "3. Existing date parsing unit tests pass."
  ],
  "task_type": "Fix",
  "component": "Core Utility"
}

--- FINAL CONSTRAINTS ---
* Do NOT add introductory text, closing remarks, or markdown fences.
* Do NOT omit fields. Use the schema default when a value is missing.
"#;

/// Concise template for small local models with short context windows.
pub const PROMPT_C: &str = r#"You are an expert Agile Project Manager AI specialising in software task extraction.
Read the meeting transcript and extract every distinct action, commitment, or deliverable that needs follow-up, so a developer can act on it immediately.

--- INSTRUCTIONS ---
1. Follow the JSON schema supplied with the request exactly.
2. Output ONLY one valid JSON object containing the root key "work_items" as an array of tasks. No other text and no markdown fences.
3. Fill the fields using development best practice:
    - title: a concise, imperative, commit-style message (e.g. "Fix: Update checkout button"). At most 100 characters.
    - description: full context, answering WHAT (the action) and WHY (the business reason or impact).
    - acceptance_criteria: a numbered list of testable conditions derived from the commitment.
4. When the transcript gives no value for an optional field, use the schema default (e.g. component is null when no component is mentioned).

Return JSON.
"#;

/// Error returned when a prompt selector does not name a known template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid prompt type: {0:?} (expected A, B or C)")]
pub struct InvalidPromptType(pub String);

/// Selector for one of the fixed instruction templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PromptType {
    A,
    #[default]
    B,
    C,
}

impl PromptType {
    /// All selectors, in catalog order.
    pub const ALL: [PromptType; 3] = [PromptType::A, PromptType::B, PromptType::C];
}

impl fmt::Display for PromptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
        }
    }
}

impl FromStr for PromptType {
    type Err = InvalidPromptType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            _ => Err(InvalidPromptType(s.to_string())),
        }
    }
}

/// Maps a [`PromptType`] to its instruction template.
///
/// The mapping is exhaustive over the closed enum, so lookup cannot fail once
/// a selector exists. Unknown selectors are rejected earlier, when parsing
/// user input into a [`PromptType`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptCatalog;

impl PromptCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Fixed instruction text for the given selector.
    pub fn content(&self, prompt_type: PromptType) -> &'static str {
        match prompt_type {
            PromptType::A => PROMPT_A,
            PromptType::B => PROMPT_B,
            PromptType::C => PROMPT_C,
        }
    }

    /// Parse a raw selector and return its template.
    pub fn content_for(&self, selector: &str) -> Result<&'static str, InvalidPromptType> {
        let prompt_type: PromptType = selector.parse()?;
        Ok(self.content(prompt_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_prompt_type_has_distinct_content() {
        let catalog = PromptCatalog::new();
        let a = catalog.content(PromptType::A);
        let b = catalog.content(PromptType::B);
        let c = catalog.content(PromptType::C);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_all_templates_request_work_items_root() {
        let catalog = PromptCatalog::new();
        for prompt_type in PromptType::ALL {
            assert!(
                catalog.content(prompt_type).contains("work_items"),
                "template {prompt_type} must name the work_items root key"
            );
        }
    }

    #[test]
    fn test_prompt_type_parse_case_insensitive() {
        assert_eq!("a".parse::<PromptType>().unwrap(), PromptType::A);
        assert_eq!(" B ".parse::<PromptType>().unwrap(), PromptType::B);
        assert_eq!("C".parse::<PromptType>().unwrap(), PromptType::C);
    }

    #[test]
    fn test_prompt_type_parse_rejects_unknown() {
        let err = "D".parse::<PromptType>().unwrap_err();
        assert_eq!(err, InvalidPromptType("D".to_string()));
        assert!(err.to_string().contains("Invalid prompt type"));
    }

    #[test]
    fn test_content_for_unknown_selector_fails() {
        let catalog = PromptCatalog::new();
        assert!(catalog.content_for("Z").is_err());
        assert_eq!(catalog.content_for("c").unwrap(), PROMPT_C);
    }

    #[test]
    fn test_default_prompt_is_b() {
        assert_eq!(PromptType::default(), PromptType::B);
        assert_eq!(PromptType::B.to_string(), "B");
    }
}
