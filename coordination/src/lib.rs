//! Clarity coordination library
//!
//! Deterministic, I/O-free core of the transcript-to-work-item pipeline:
//! - `prompts`: fixed instruction templates selected by [`PromptType`]
//! - `work_item`: the [`WorkItem`] contract, its JSON schema, and the
//!   tracker payload builders
//! - `validator`: fail-closed parsing of model output into a
//!   [`WorkItemCollection`]
//! - `dispatch`: per-item outcome bookkeeping shared by tracker clients
//!
//! Network and filesystem access live in the `clarity-agents` crate.

pub mod dispatch;
pub mod prompts;
pub mod validator;
pub mod work_item;

pub use dispatch::{DispatchOutcome, DispatchReport, TrackerIdentity};
pub use prompts::{InvalidPromptType, PromptCatalog, PromptType, PROMPT_VERSION};
pub use validator::{ResponseValidator, ValidationErrorKind, ValidationFailure};
pub use work_item::{
    AzurePatchOperation, PatchOp, PlanePayload, TaskType, WorkItem, WorkItemCollection,
    MAX_TITLE_CHARS,
};
