//! Clarity agents: the I/O half of the transcript-to-work-item pipeline.
//!
//! - `agents`: language-model backends behind [`agents::GenerationClient`]
//! - `trackers`: Plane and Azure DevOps behind [`trackers::TrackerClient`]
//! - `storage`: transcript input and local JSON persistence
//! - `orchestrator`: the [`orchestrator::Pipeline`] composing all of the above
//!
//! Pure logic (prompts, validation, payloads) lives in `clarity-coordination`.

pub mod agents;
pub mod config;
pub mod orchestrator;
pub mod state_machine;
pub mod storage;
pub mod trackers;
