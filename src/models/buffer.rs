//! Buffer model: disciplines, roles, and head-of-queue semantics.
//!
//! Buffers hold job ids in order. The *head position* — the single
//! pickupable slot — is defined by the discipline:
//!
//! | Discipline | Head |
//! |-----------|------|
//! | FIFO | front |
//! | LIFO | back |
//! | DUMMY | slot 0 only |
//! | FLEX | any slot |
//!
//! Roles classify what a buffer means to the shop: system input/output,
//! a component-owned slot, or a compensation area.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

use super::job::JobState;

/// Pickup ordering discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferDiscipline {
    /// First in, first out: pick from the front.
    Fifo,
    /// Last in, first out: pick from the back.
    Lifo,
    /// Any slot may be picked.
    Flex,
    /// Single meaningful slot; only position 0 is pickable.
    Dummy,
}

/// What the buffer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferRole {
    /// System entry point; jobs start here.
    Input,
    /// System exit; a job here is delivered and never leaves.
    Output,
    /// Owned by a machine or transport.
    Component,
    /// Overflow / staging area.
    Compensation,
}

/// Static description of a buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Unique buffer identifier.
    pub id: String,
    /// Pickup discipline.
    pub discipline: BufferDiscipline,
    /// Maximum number of stored jobs (≥ 1).
    pub capacity: usize,
    /// Buffer role.
    pub role: BufferRole,
    /// Owning machine or transport id, if component-owned.
    pub parent: Option<String>,
}

impl BufferConfig {
    /// Creates a FIFO component buffer.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            discipline: BufferDiscipline::Fifo,
            capacity: 1,
            role: BufferRole::Component,
            parent: None,
        }
    }

    /// Sets the discipline.
    pub fn with_discipline(mut self, discipline: BufferDiscipline) -> Self {
        self.discipline = discipline;
        self
    }

    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the role.
    pub fn with_role(mut self, role: BufferRole) -> Self {
        self.role = role;
        self
    }

    /// Sets the owning component.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// Runtime contents of a buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferState {
    /// Buffer identifier (matches the config id).
    pub id: String,
    /// Stored job ids, insertion-ordered.
    pub store: Vec<String>,
}

impl BufferState {
    /// Creates an empty buffer.
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            store: Vec::new(),
        }
    }

    /// Whether the buffer holds the given job.
    pub fn contains(&self, job_id: &str) -> bool {
        self.store.iter().any(|j| j == job_id)
    }

    /// The job at the head position under the given discipline.
    ///
    /// For FLEX there is no single head; the front is reported so callers
    /// that only need *a* pickable job get a deterministic answer.
    pub fn head(&self, discipline: BufferDiscipline) -> Option<&str> {
        match discipline {
            BufferDiscipline::Fifo | BufferDiscipline::Dummy | BufferDiscipline::Flex => {
                self.store.first().map(String::as_str)
            }
            BufferDiscipline::Lifo => self.store.last().map(String::as_str),
        }
    }

    /// Whether the given job may be picked right now.
    pub fn can_pick(&self, discipline: BufferDiscipline, job_id: &str) -> bool {
        match discipline {
            BufferDiscipline::Flex => self.contains(job_id),
            _ => self.head(discipline) == Some(job_id),
        }
    }

    /// Whether the buffer is at capacity.
    pub fn is_full(&self, capacity: usize) -> bool {
        self.store.len() >= capacity
    }
}

/// Puts a job into a buffer, relocating the job there.
///
/// Fails with [`SimError::InvalidTransition`] when the buffer is full.
pub fn put_in_buffer(
    buffer: &BufferState,
    config: &BufferConfig,
    job: &JobState,
) -> SimResult<(BufferState, JobState)> {
    if buffer.is_full(config.capacity) {
        return Err(SimError::invalid_transition(
            &buffer.id,
            format!("buffer full (capacity {})", config.capacity),
        ));
    }
    let mut next = buffer.clone();
    next.store.push(job.id.clone());
    Ok((next, job.at_location(&buffer.id)))
}

/// Removes a job from a buffer.
///
/// Fails with [`SimError::InvalidValue`] when the job is not stored here.
pub fn remove_from_buffer(buffer: &BufferState, job_id: &str) -> SimResult<BufferState> {
    if !buffer.contains(job_id) {
        return Err(SimError::invalid_value(
            job_id,
            format!("job not in buffer '{}'", buffer.id),
        ));
    }
    let mut next = buffer.clone();
    next.store.retain(|j| j != job_id);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobConfig;

    fn job(id: &str) -> JobState {
        JobState::initial(&JobConfig::new(id), "b-x")
    }

    fn loaded(ids: &[&str]) -> BufferState {
        BufferState {
            id: "b-0".into(),
            store: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_fifo_head_is_front() {
        let b = loaded(&["j-0", "j-1", "j-2"]);
        assert_eq!(b.head(BufferDiscipline::Fifo), Some("j-0"));
        assert!(b.can_pick(BufferDiscipline::Fifo, "j-0"));
        assert!(!b.can_pick(BufferDiscipline::Fifo, "j-1"));
    }

    #[test]
    fn test_lifo_head_is_back() {
        let b = loaded(&["j-0", "j-1", "j-2"]);
        assert_eq!(b.head(BufferDiscipline::Lifo), Some("j-2"));
        assert!(b.can_pick(BufferDiscipline::Lifo, "j-2"));
        assert!(!b.can_pick(BufferDiscipline::Lifo, "j-0"));
    }

    #[test]
    fn test_flex_picks_anywhere() {
        let b = loaded(&["j-0", "j-1", "j-2"]);
        assert!(b.can_pick(BufferDiscipline::Flex, "j-1"));
        assert!(!b.can_pick(BufferDiscipline::Flex, "j-9"));
    }

    #[test]
    fn test_dummy_position_zero_only() {
        let b = loaded(&["j-0", "j-1"]);
        assert!(b.can_pick(BufferDiscipline::Dummy, "j-0"));
        assert!(!b.can_pick(BufferDiscipline::Dummy, "j-1"));
    }

    #[test]
    fn test_put_respects_capacity() {
        let config = BufferConfig::new("b-0").with_capacity(1);
        let empty = BufferState::empty("b-0");
        let (one, moved) = put_in_buffer(&empty, &config, &job("j-0")).unwrap();
        assert_eq!(moved.location, "b-0");
        assert!(put_in_buffer(&one, &config, &job("j-1")).is_err());
    }

    #[test]
    fn test_remove_preserves_order() {
        let b = loaded(&["j-0", "j-1", "j-2"]);
        let next = remove_from_buffer(&b, "j-1").unwrap();
        assert_eq!(next.store, vec!["j-0".to_string(), "j-2".to_string()]);
        assert!(remove_from_buffer(&next, "j-9").is_err());
    }

    #[test]
    fn test_empty_head() {
        let b = BufferState::empty("b-0");
        assert_eq!(b.head(BufferDiscipline::Fifo), None);
        assert_eq!(b.head(BufferDiscipline::Lifo), None);
    }
}
