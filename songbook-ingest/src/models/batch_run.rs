//! Batch run state machine
//!
//! A batch run moves through:
//! INIT → (DRAINING) → SCANNING → FINAL_DRAIN → REPORT
//!
//! DRAINING only happens when the retry queue is at or above the reprocess
//! threshold at INIT.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Batch run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchState {
    /// Connectivity probe, queue size check
    Init,
    /// Reprocess a backed-up retry queue before scanning
    Draining,
    /// Extract, deduplicate and insert from source documents
    Scanning,
    /// Reprocess whatever is left in the retry queue
    FinalDrain,
    /// Summary emitted, run finished
    Report,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchState::Init => "INIT",
            BatchState::Draining => "DRAINING",
            BatchState::Scanning => "SCANNING",
            BatchState::FinalDrain => "FINAL_DRAIN",
            BatchState::Report => "REPORT",
        };
        f.write_str(name)
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub old_state: Option<BatchState>,
    pub new_state: BatchState,
    pub transitioned_at: DateTime<Utc>,
}

/// One invocation of the orchestrator state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRun {
    pub run_id: Uuid,
    pub state: BatchState,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub transitions: Vec<StateTransition>,
}

impl BatchRun {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            state: BatchState::Init,
            started_at: now,
            ended_at: None,
            transitions: vec![StateTransition {
                old_state: None,
                new_state: BatchState::Init,
                transitioned_at: now,
            }],
        }
    }

    pub fn transition_to(&mut self, new_state: BatchState) {
        let now = Utc::now();
        tracing::info!(
            run_id = %self.run_id,
            old_state = %self.state,
            new_state = %new_state,
            "Batch state transition"
        );

        self.transitions.push(StateTransition {
            old_state: Some(self.state),
            new_state,
            transitioned_at: now,
        });
        self.state = new_state;

        if new_state == BatchState::Report {
            self.ended_at = Some(now);
        }
    }

    /// States visited so far, in order
    pub fn visited_states(&self) -> Vec<BatchState> {
        self.transitions.iter().map(|t| t.new_state).collect()
    }

    pub fn duration_ms(&self) -> i64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }
}

impl Default for BatchRun {
    fn default() -> Self {
        Self::new()
    }
}
