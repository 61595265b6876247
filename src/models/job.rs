//! Job model.
//!
//! A job is an ordered tuple of operations plus a location: the id of the
//! buffer, machine-owned buffer, or transport currently holding it. The
//! location is unique at every instant — job conservation is one of the
//! engine's audited invariants.

use serde::{Deserialize, Serialize};

use super::operation::{OperationConfig, OperationState, OperationStatus};

/// Static description of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Unique job identifier.
    pub id: String,
    /// Ordered operations; index order is the processing order.
    pub operations: Vec<OperationConfig>,
}

impl JobConfig {
    /// Creates an empty job.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            operations: Vec::new(),
        }
    }

    /// Appends an operation.
    pub fn with_operation(mut self, operation: OperationConfig) -> Self {
        self.operations.push(operation);
        self
    }

    /// Total nominal processing duration across all operations.
    pub fn total_duration(&self) -> u64 {
        self.operations.iter().map(|o| o.duration.nominal()).sum()
    }
}

/// Runtime state of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    /// Job identifier.
    pub id: String,
    /// Operation states, in processing order.
    pub operations: Vec<OperationState>,
    /// Id of the buffer or transport currently holding the job.
    pub location: String,
}

impl JobState {
    /// Initial state: all operations idle, job at the given location.
    pub fn initial(config: &JobConfig, location: impl Into<String>) -> Self {
        Self {
            id: config.id.clone(),
            operations: config.operations.iter().map(OperationState::idle).collect(),
            location: location.into(),
        }
    }

    /// First operation that has not started yet.
    pub fn next_idle_operation(&self) -> Option<&OperationState> {
        self.operations
            .iter()
            .find(|o| o.status == OperationStatus::Idle)
    }

    /// First operation that is not done (idle or processing).
    pub fn next_pending_operation(&self) -> Option<&OperationState> {
        self.operations.iter().find(|o| !o.is_done())
    }

    /// The operation currently processing, if any.
    pub fn processing_operation(&self) -> Option<&OperationState> {
        self.operations
            .iter()
            .find(|o| o.status == OperationStatus::Processing)
    }

    /// Whether any operation is currently processing.
    pub fn is_running(&self) -> bool {
        self.processing_operation().is_some()
    }

    /// Whether every operation is done.
    pub fn all_operations_done(&self) -> bool {
        self.operations.iter().all(|o| o.is_done())
    }

    /// Count of operations not yet started.
    pub fn idle_operation_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|o| o.status == OperationStatus::Idle)
            .count()
    }

    /// Returns a copy with one operation state replaced (matched by id).
    pub fn with_operation(&self, operation: OperationState) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.operations.iter_mut().find(|o| o.id == operation.id) {
            *slot = operation;
        }
        next
    }

    /// Returns a copy relocated to `location`.
    pub fn at_location(&self, location: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.location = location.into();
        next
    }
}
