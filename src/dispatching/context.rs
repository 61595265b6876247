//! Evaluation context for dispatch rules.

use crate::models::{Instance, State};

/// Read-only view passed to dispatch rules.
///
/// Bundles the current state and the instance so rules can reach nominal
/// durations, remaining work, and buffer contents without owning either.
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext<'a> {
    /// Current simulation state.
    pub state: &'a State,
    /// Problem instance.
    pub instance: &'a Instance,
}

impl<'a> DispatchContext<'a> {
    /// Creates a context over a state and its instance.
    pub fn new(state: &'a State, instance: &'a Instance) -> Self {
        Self { state, instance }
    }

    /// Nominal duration of an operation, 0 when unknown.
    pub fn nominal_duration(&self, operation_id: &str) -> u64 {
        self.instance
            .operation(operation_id)
            .map(|o| o.duration.nominal())
            .unwrap_or(0)
    }

    /// Total nominal work remaining for a job (idle operations only).
    pub fn remaining_work(&self, job_id: &str) -> u64 {
        self.state
            .job(job_id)
            .map(|job| {
                job.operations
                    .iter()
                    .filter(|o| o.status == crate::models::OperationStatus::Idle)
                    .map(|o| self.nominal_duration(&o.id))
                    .sum()
            })
            .unwrap_or(0)
    }
}
