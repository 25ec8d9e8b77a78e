//! Pipeline run states and the legal edges between them.
//!
//! A run is linear: it either walks every stage to `Complete` or stops at
//! `Aborted`. There are no back-edges; a failed stage is terminal for the run.
//! Every transition is recorded so the run report shows exactly where a run
//! stopped and why.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The set of pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Nothing loaded yet.
    Idle,
    /// Transcript read and non-empty.
    TranscriptLoaded,
    /// Instruction template chosen.
    PromptSelected,
    /// Language model called (the result may still be empty).
    GenerationInvoked,
    /// Response validated into a non-empty collection.
    Validated,
    /// Local persistence attempted (best-effort, never gating).
    Persisted,
    /// Every configured tracker has been offered the collection.
    Dispatched,
    /// Run finished. Terminal.
    Complete,
    /// Run stopped early. Terminal.
    Aborted,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Aborted)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::TranscriptLoaded => write!(f, "TranscriptLoaded"),
            Self::PromptSelected => write!(f, "PromptSelected"),
            Self::GenerationInvoked => write!(f, "GenerationInvoked"),
            Self::Validated => write!(f, "Validated"),
            Self::Persisted => write!(f, "Persisted"),
            Self::Dispatched => write!(f, "Dispatched"),
            Self::Complete => write!(f, "Complete"),
            Self::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Legal transitions between pipeline states.
///
/// ```text
/// Idle → TranscriptLoaded → PromptSelected → GenerationInvoked
///      → Validated → Persisted → Dispatched → Complete
/// any non-terminal state → Aborted
/// ```
fn is_legal_transition(from: PipelineState, to: PipelineState) -> bool {
    use PipelineState::*;

    if to == Aborted && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Idle, TranscriptLoaded)
            | (TranscriptLoaded, PromptSelected)
            | (PromptSelected, GenerationInvoked)
            | (GenerationInvoked, Validated)
            | (Validated, Persisted)
            | (Persisted, Dispatched)
            | (Dispatched, Complete)
    )
}

/// One step of a run, kept for the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: PipelineState,
    pub to: PipelineState,
    /// Milliseconds since the run started.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A stage tried to move the run somewhere the table does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Illegal pipeline transition: {from} → {to}")]
pub struct IllegalTransition {
    pub from: PipelineState,
    pub to: PipelineState,
}

/// The pipeline state machine.
pub struct StateMachine {
    current: PipelineState,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl StateMachine {
    /// Create a new state machine starting at `Idle`.
    pub fn new() -> Self {
        Self {
            current: PipelineState::Idle,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> PipelineState {
        self.current
    }

    /// Move to `to`, or fail if the edge is not in the table.
    pub fn advance(
        &mut self,
        to: PipelineState,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: u64::try_from(self.created_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            reason: reason.map(String::from),
        };

        tracing::debug!(from = %self.current, to = %to, "State transition");

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    /// Transition to `Aborted` from any non-terminal state.
    pub fn abort(&mut self, reason: &str) -> Result<(), IllegalTransition> {
        self.advance(PipelineState::Aborted, Some(reason))
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Consume the machine, returning its transition log.
    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }

    /// One-line history, e.g. `Idle → Aborted (3ms, 2 transitions) [...]`.
    pub fn summary(&self) -> String {
        let states: Vec<String> = self.transitions.iter().map(|t| t.to.to_string()).collect();
        let mut summary = format!(
            "{} → {} ({}ms, {} transitions)",
            PipelineState::Idle,
            self.current,
            self.created_at.elapsed().as_millis(),
            self.transitions.len(),
        );
        if !states.is_empty() {
            summary.push_str(&format!(" [{}]", states.join(" → ")));
        }
        summary
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAPPY_PATH: [PipelineState; 7] = [
        PipelineState::TranscriptLoaded,
        PipelineState::PromptSelected,
        PipelineState::GenerationInvoked,
        PipelineState::Validated,
        PipelineState::Persisted,
        PipelineState::Dispatched,
        PipelineState::Complete,
    ];

    #[test]
    fn test_initial_state() {
        let sm = StateMachine::new();
        assert_eq!(sm.current(), PipelineState::Idle);
        assert!(!sm.is_terminal());
        assert!(sm.transitions().is_empty());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut sm = StateMachine::new();
        for state in HAPPY_PATH {
            sm.advance(state, None).unwrap();
        }
        assert!(sm.is_terminal());
        assert_eq!(sm.current(), PipelineState::Complete);
        assert_eq!(sm.transitions().len(), 7);
    }

    #[test]
    fn test_abort_from_any_non_terminal_state() {
        let mut reachable = vec![PipelineState::Idle];
        reachable.extend(&HAPPY_PATH[..HAPPY_PATH.len() - 1]);

        for state in reachable {
            let mut sm = StateMachine {
                current: state,
                created_at: Instant::now(),
                transitions: Vec::new(),
            };
            assert!(sm.abort("test abort").is_ok());
            assert_eq!(sm.current(), PipelineState::Aborted);
        }
    }

    #[test]
    fn test_cannot_leave_terminal_state() {
        let mut sm = StateMachine::new();
        sm.abort("empty transcript").unwrap();
        let err = sm.advance(PipelineState::TranscriptLoaded, None).unwrap_err();
        assert_eq!(err.from, PipelineState::Aborted);
        assert!(sm.abort("again").is_err());
    }

    #[test]
    fn test_cannot_skip_generation() {
        let mut sm = StateMachine::new();
        sm.advance(PipelineState::TranscriptLoaded, None).unwrap();
        let err = sm.advance(PipelineState::Validated, None).unwrap_err();
        assert_eq!(err.to, PipelineState::Validated);
        assert_eq!(
            err.to_string(),
            "Illegal pipeline transition: TranscriptLoaded → Validated"
        );
    }

    #[test]
    fn test_no_back_edges() {
        let mut sm = StateMachine::new();
        sm.advance(PipelineState::TranscriptLoaded, None).unwrap();
        sm.advance(PipelineState::PromptSelected, None).unwrap();
        assert!(sm.advance(PipelineState::TranscriptLoaded, None).is_err());
    }

    #[test]
    fn test_transition_record_has_reason() {
        let mut sm = StateMachine::new();
        sm.abort("transcript not found").unwrap();
        let record = &sm.transitions()[0];
        assert_eq!(record.from, PipelineState::Idle);
        assert_eq!(record.to, PipelineState::Aborted);
        assert_eq!(record.reason.as_deref(), Some("transcript not found"));
    }

    #[test]
    fn test_summary() {
        let mut sm = StateMachine::new();
        sm.advance(PipelineState::TranscriptLoaded, None).unwrap();
        sm.abort("test").unwrap();
        let summary = sm.summary();
        assert!(summary.contains("Aborted"));
        assert!(summary.contains("2 transitions"));
    }
}
