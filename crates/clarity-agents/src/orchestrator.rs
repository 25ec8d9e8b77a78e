//! Orchestration loop: transcript → prompt → model → validation → persistence → trackers.
//!
//! Every stage is awaited in sequence. Stages that can produce nothing useful
//! (empty transcript, empty model output, zero valid items) abort the run
//! before any later stage is attempted, so a run that aborts writes no local
//! file and creates no remote items. Persistence is best-effort: a failed save
//! is logged and dispatch still proceeds.

use std::path::PathBuf;

use clarity_coordination::{
    DispatchReport, PromptCatalog, PromptType, ResponseValidator, TrackerIdentity,
    WorkItemCollection,
};
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument, Span};

use crate::agents::GenerationClient;
use crate::config::TrackerTarget;
use crate::state_machine::{IllegalTransition, PipelineState, StateMachine, TransitionRecord};
use crate::storage::WorkItemStore;
use crate::trackers::TrackerClient;

/// Why a run stopped before dispatch.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Transcript {source_id:?} is empty or could not be read")]
    InputUnavailable { source_id: String },

    #[error("Model returned no output")]
    GenerationFailure,

    #[error("No valid work items were extracted")]
    NoWorkItems,

    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
}

/// A tracker client and the workspace/project it creates items in.
pub struct TrackerBinding {
    pub client: Box<dyn TrackerClient>,
    pub target: TrackerTarget,
}

/// What happened at one tracker during a run.
#[derive(Debug, Clone)]
pub enum TrackerRun {
    Dispatched(DispatchReport),
    /// Not attempted because the target is incomplete.
    Skipped {
        tracker: TrackerIdentity,
        missing_field: &'static str,
    },
}

impl TrackerRun {
    pub fn tracker(&self) -> TrackerIdentity {
        match self {
            Self::Dispatched(report) => report.tracker,
            Self::Skipped { tracker, .. } => *tracker,
        }
    }

    pub fn succeeded(&self) -> bool {
        match self {
            Self::Dispatched(report) => report.all_succeeded(),
            Self::Skipped { .. } => false,
        }
    }
}

/// Result of a run that reached `Complete`.
#[derive(Debug)]
pub struct RunReport {
    pub items: WorkItemCollection,
    /// Where the local copy was written; `None` if saving failed.
    pub saved_to: Option<PathBuf>,
    pub trackers: Vec<TrackerRun>,
    pub transitions: Vec<TransitionRecord>,
}

impl RunReport {
    /// `true` iff every bound tracker received every item.
    pub fn succeeded(&self) -> bool {
        self.trackers.iter().all(TrackerRun::succeeded)
    }
}

/// End-to-end pipeline. Backends are injected; nothing is constructed here.
pub struct Pipeline {
    catalog: PromptCatalog,
    validator: ResponseValidator,
    generator: Box<dyn GenerationClient>,
    store: Box<dyn WorkItemStore>,
    trackers: Vec<TrackerBinding>,
    span: Span,
}

impl Pipeline {
    pub fn new(generator: Box<dyn GenerationClient>, store: Box<dyn WorkItemStore>) -> Self {
        Self {
            span: info_span!("pipeline", model = generator.model()),
            catalog: PromptCatalog::new(),
            validator: ResponseValidator::new(),
            generator,
            store,
            trackers: Vec::new(),
        }
    }

    /// Add a tracker. Trackers are dispatched to in the order they were added.
    pub fn with_tracker(mut self, client: Box<dyn TrackerClient>, target: TrackerTarget) -> Self {
        self.trackers.push(TrackerBinding { client, target });
        self
    }

    pub fn tracker_count(&self) -> usize {
        self.trackers.len()
    }

    /// Process one transcript.
    ///
    /// Aborts are logged and also returned as [`PipelineError`]. Dispatch
    /// failures do not abort the run; they are reported per tracker in the
    /// returned [`RunReport`].
    pub async fn run(
        &self,
        transcript_source_id: &str,
        prompt_type: PromptType,
        iteration: Option<&str>,
    ) -> Result<RunReport, PipelineError> {
        let run_span = info_span!(
            parent: &self.span,
            "run",
            source = transcript_source_id,
            prompt = %prompt_type
        );
        self.run_stages(transcript_source_id, prompt_type, iteration)
            .instrument(run_span)
            .await
    }

    async fn run_stages(
        &self,
        transcript_source_id: &str,
        prompt_type: PromptType,
        iteration: Option<&str>,
    ) -> Result<RunReport, PipelineError> {
        let mut sm = StateMachine::new();

        let transcript = self.store.read_transcript(transcript_source_id);
        if transcript.trim().is_empty() {
            error!("Transcript is empty or unavailable; skipping generation");
            return Err(abort(
                &mut sm,
                PipelineError::InputUnavailable {
                    source_id: transcript_source_id.to_string(),
                },
            ));
        }
        sm.advance(PipelineState::TranscriptLoaded, None)?;

        let system_prompt = self.catalog.content(prompt_type);
        sm.advance(PipelineState::PromptSelected, Some(&prompt_type.to_string()))?;

        info!(
            model = self.generator.model(),
            transcript_chars = transcript.chars().count(),
            "Generating work items"
        );
        let raw = self.generator.generate(system_prompt, &transcript).await;
        sm.advance(PipelineState::GenerationInvoked, None)?;

        if raw.trim().is_empty() {
            error!("Model returned no output; nothing to validate");
            return Err(abort(&mut sm, PipelineError::GenerationFailure));
        }

        let items = self.validator.parse(&raw);
        if items.is_empty() {
            warn!("No work items extracted; nothing to persist or dispatch");
            return Err(abort(&mut sm, PipelineError::NoWorkItems));
        }
        info!(count = items.len(), "Validated work items");
        sm.advance(PipelineState::Validated, Some(&format!("{} items", items.len())))?;

        let saved_to = self.store.save_work_items(&items);
        if saved_to.is_none() {
            warn!("Local save failed; dispatching anyway");
        }
        sm.advance(PipelineState::Persisted, None)?;

        let mut trackers = Vec::with_capacity(self.trackers.len());
        for binding in &self.trackers {
            let tracker = binding.client.identity();

            if let Some(field) = binding.target.missing_field() {
                error!(%tracker, field, "{tracker} configuration is missing {field}; skipping");
                trackers.push(TrackerRun::Skipped {
                    tracker,
                    missing_field: field,
                });
                continue;
            }

            let report = binding
                .client
                .dispatch(
                    &binding.target.workspace,
                    &binding.target.project,
                    items.items(),
                    iteration,
                )
                .await;

            if report.all_succeeded() {
                info!(%tracker, "Work items synced to {tracker}");
            } else {
                error!(
                    %tracker,
                    failed = report.total() - report.success_count(),
                    "Failed to sync some or all work items to {tracker}"
                );
            }
            trackers.push(TrackerRun::Dispatched(report));
        }
        sm.advance(PipelineState::Dispatched, None)?;
        sm.advance(PipelineState::Complete, None)?;

        info!(summary = %sm.summary(), "Run complete");

        Ok(RunReport {
            items,
            saved_to,
            trackers,
            transitions: sm.into_transitions(),
        })
    }
}

/// Move the machine to `Aborted`, recording the error as the reason.
fn abort(sm: &mut StateMachine, err: PipelineError) -> PipelineError {
    match sm.abort(&err.to_string()) {
        Ok(()) => {
            info!(summary = %sm.summary(), "Run aborted");
            err
        }
        Err(illegal) => illegal.into(),
    }
}
