//! Operation model.
//!
//! An operation is one machine-bound unit of work for a job: it names the
//! machine that must perform it, a duration source, and optionally the
//! tool it needs mounted. Operations within a job are totally ordered;
//! operation *k* may not start before operation *k-1* is done.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 2

use serde::{Deserialize, Serialize};

use super::duration::TimeSource;

/// Lifecycle of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    /// Not yet started.
    Idle,
    /// Currently running on its machine.
    Processing,
    /// Finished.
    Done,
}

/// Static description of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationConfig {
    /// Unique operation identifier.
    pub id: String,
    /// Machine that must perform this operation.
    pub machine: String,
    /// Processing duration.
    pub duration: TimeSource,
    /// Tool that must be mounted. `None` = no tool requirement.
    pub tool: Option<String>,
}

impl OperationConfig {
    /// Creates an operation on a machine with a fixed duration.
    pub fn new(id: impl Into<String>, machine: impl Into<String>, duration: u64) -> Self {
        Self {
            id: id.into(),
            machine: machine.into(),
            duration: TimeSource::fixed(duration),
            tool: None,
        }
    }

    /// Replaces the duration with an arbitrary time source.
    pub fn with_duration(mut self, duration: TimeSource) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the required tool.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }
}

/// Runtime state of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationState {
    /// Operation identifier (matches the config id).
    pub id: String,
    /// Machine the operation targets.
    pub machine_id: String,
    /// Current lifecycle status.
    pub status: OperationStatus,
    /// Tick processing started, once known.
    pub start_time: Option<u64>,
    /// Tick processing ends, once known. Slides when an outage pauses it.
    pub end_time: Option<u64>,
}

impl OperationState {
    /// Initial (idle) state for a configured operation.
    pub fn idle(config: &OperationConfig) -> Self {
        Self {
            id: config.id.clone(),
            machine_id: config.machine.clone(),
            status: OperationStatus::Idle,
            start_time: None,
            end_time: None,
        }
    }

    /// Whether the operation is finished.
    pub fn is_done(&self) -> bool {
        self.status == OperationStatus::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_builder() {
        let op = OperationConfig::new("o-0", "m-1", 5)
            .with_tool("tl-2")
            .with_duration(TimeSource::fixed(8));
        assert_eq!(op.id, "o-0");
        assert_eq!(op.machine, "m-1");
        assert_eq!(op.duration.nominal(), 8);
        assert_eq!(op.tool.as_deref(), Some("tl-2"));
    }

    #[test]
    fn test_idle_state_from_config() {
        let op = OperationConfig::new("o-1", "m-0", 3);
        let state = OperationState::idle(&op);
        assert_eq!(state.status, OperationStatus::Idle);
        assert_eq!(state.machine_id, "m-0");
        assert!(state.start_time.is_none());
        assert!(!state.is_done());
    }
}
