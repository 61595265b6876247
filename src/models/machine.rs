//! Machine model.
//!
//! A machine owns three buffers — a pre-buffer feeding it, an internal
//! single-slot buffer holding the job in work, and a post-buffer collecting
//! finished jobs — plus a setup-time table keyed by tool pairs and any
//! number of outage schedules.
//!
//! Phase cycle: `Idle → Setup → Working → Idle`, with outages able to
//! interrupt any phase. When the required tool is already mounted the
//! setup phase is skipped and the machine goes straight to `Working`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::buffer::{BufferConfig, BufferDiscipline, BufferState};
use super::duration::TimeSource;
use super::outage::OutageConfig;
use super::time::Occupied;

/// Machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachinePhase {
    /// Free for a new operation.
    Idle,
    /// Changing tools before processing.
    Setup,
    /// Processing an operation.
    Working,
    /// Out of service.
    Outage,
}

/// Static description of a machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Unique machine identifier.
    pub id: String,
    /// Setup durations keyed by `(from_tool, to_tool)`.
    pub setup_times: HashMap<(String, String), TimeSource>,
    /// Tool mounted before the first operation, if any.
    pub initial_tool: Option<String>,
    /// Outage schedules; all apply, serialized in arrival order.
    pub outages: Vec<OutageConfig>,
    /// Queue feeding the machine.
    pub prebuffer: BufferConfig,
    /// Single slot holding the job in work.
    pub buffer: BufferConfig,
    /// Queue of finished jobs awaiting pickup.
    pub postbuffer: BufferConfig,
}

impl MachineConfig {
    /// Creates a machine with FIFO pre/post buffers derived from its id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            setup_times: HashMap::new(),
            initial_tool: None,
            outages: Vec::new(),
            prebuffer: BufferConfig::new(format!("{id}-pre"))
                .with_capacity(16)
                .with_parent(&id),
            buffer: BufferConfig::new(format!("{id}-buf"))
                .with_discipline(BufferDiscipline::Dummy)
                .with_capacity(1)
                .with_parent(&id),
            postbuffer: BufferConfig::new(format!("{id}-post"))
                .with_capacity(16)
                .with_parent(&id),
            id,
        }
    }

    /// Adds a setup-time entry for a tool change.
    pub fn with_setup_time(
        mut self,
        from_tool: impl Into<String>,
        to_tool: impl Into<String>,
        duration: impl Into<TimeSource>,
    ) -> Self {
        self.setup_times
            .insert((from_tool.into(), to_tool.into()), duration.into());
        self
    }

    /// Sets the initially mounted tool.
    pub fn with_initial_tool(mut self, tool: impl Into<String>) -> Self {
        self.initial_tool = Some(tool.into());
        self
    }

    /// Adds an outage schedule.
    pub fn with_outage(mut self, outage: OutageConfig) -> Self {
        self.outages.push(outage);
        self
    }

    /// Sets the pre-buffer capacity.
    pub fn with_prebuffer_capacity(mut self, capacity: usize) -> Self {
        self.prebuffer.capacity = capacity;
        self
    }

    /// Sets the post-buffer capacity.
    pub fn with_postbuffer_capacity(mut self, capacity: usize) -> Self {
        self.postbuffer.capacity = capacity;
        self
    }

    /// Sets the pre-buffer discipline.
    pub fn with_prebuffer_discipline(mut self, discipline: BufferDiscipline) -> Self {
        self.prebuffer.discipline = discipline;
        self
    }

    /// Sets the post-buffer discipline.
    pub fn with_postbuffer_discipline(mut self, discipline: BufferDiscipline) -> Self {
        self.postbuffer.discipline = discipline;
        self
    }

    /// Setup duration for mounting `to_tool` while `from_tool` is mounted.
    ///
    /// A bare machine (`from_tool = None`), an operation without a tool, or
    /// an unchanged tool all cost zero. Anything else must be present in
    /// the table; `None` from this method means the table is incomplete.
    pub fn setup_duration(
        &self,
        from_tool: Option<&str>,
        to_tool: Option<&str>,
    ) -> Option<TimeSource> {
        match (from_tool, to_tool) {
            (_, None) | (None, _) => Some(TimeSource::fixed(0)),
            (Some(a), Some(b)) if a == b => Some(TimeSource::fixed(0)),
            (Some(a), Some(b)) => self.setup_times.get(&(a.to_string(), b.to_string())).cloned(),
        }
    }
}

/// Work interrupted by an outage, to be resumed on exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PausedWork {
    /// Phase the machine was in when the outage hit.
    pub phase: MachinePhase,
    /// Ticks of work left when the outage hit.
    pub remaining: u64,
}

/// Runtime state of a machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineState {
    /// Machine identifier (matches the config id).
    pub id: String,
    /// Current phase.
    pub phase: MachinePhase,
    /// Operation currently claimed, if any.
    pub current_operation: Option<String>,
    /// Currently mounted tool.
    pub current_tool: Option<String>,
    /// When the current phase ends.
    pub occupied_till: Occupied,
    /// Queue feeding the machine.
    pub prebuffer: BufferState,
    /// Single slot holding the job in work.
    pub buffer: BufferState,
    /// Queue of finished jobs awaiting pickup.
    pub postbuffer: BufferState,
    /// Interrupted work carried across an outage.
    pub paused: Option<PausedWork>,
}

impl MachineState {
    /// Initial idle state for a configured machine.
    pub fn initial(config: &MachineConfig) -> Self {
        Self {
            id: config.id.clone(),
            phase: MachinePhase::Idle,
            current_operation: None,
            current_tool: config.initial_tool.clone(),
            occupied_till: Occupied::free(),
            prebuffer: BufferState::empty(&config.prebuffer.id),
            buffer: BufferState::empty(&config.buffer.id),
            postbuffer: BufferState::empty(&config.postbuffer.id),
            paused: None,
        }
    }

    /// One of this machine's buffer states, by id.
    pub fn buffer_by_id(&self, buffer_id: &str) -> Option<&BufferState> {
        [&self.prebuffer, &self.buffer, &self.postbuffer]
            .into_iter()
            .find(|b| b.id == buffer_id)
    }

    /// Whether the machine holds the given buffer.
    pub fn owns_buffer(&self, buffer_id: &str) -> bool {
        self.buffer_by_id(buffer_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::buffer::BufferRole;

    #[test]
    fn test_derived_buffer_ids() {
        let config = MachineConfig::new("m-0");
        assert_eq!(config.prebuffer.id, "m-0-pre");
        assert_eq!(config.buffer.id, "m-0-buf");
        assert_eq!(config.buffer.capacity, 1);
        assert_eq!(config.postbuffer.id, "m-0-post");
        assert_eq!(config.prebuffer.parent.as_deref(), Some("m-0"));
        assert_eq!(config.prebuffer.role, BufferRole::Component);
    }

    #[test]
    fn test_setup_duration_lookup() {
        let config = MachineConfig::new("m-0").with_setup_time("tl-0", "tl-1", 2u64);

        assert_eq!(
            config.setup_duration(Some("tl-0"), Some("tl-1")),
            Some(TimeSource::fixed(2))
        );
        // same tool, bare machine, tool-less operation: all free
        assert_eq!(
            config.setup_duration(Some("tl-1"), Some("tl-1")),
            Some(TimeSource::fixed(0))
        );
        assert_eq!(
            config.setup_duration(None, Some("tl-1")),
            Some(TimeSource::fixed(0))
        );
        assert_eq!(config.setup_duration(Some("tl-0"), None), Some(TimeSource::fixed(0)));
        // missing table entry
        assert_eq!(config.setup_duration(Some("tl-1"), Some("tl-0")), None);
    }

    #[test]
    fn test_initial_state() {
        let config = MachineConfig::new("m-1").with_initial_tool("tl-0");
        let state = MachineState::initial(&config);
        assert_eq!(state.phase, MachinePhase::Idle);
        assert_eq!(state.current_tool.as_deref(), Some("tl-0"));
        assert!(state.current_operation.is_none());
        assert!(state.owns_buffer("m-1-pre"));
        assert!(state.owns_buffer("m-1-post"));
        assert!(!state.owns_buffer("m-0-pre"));
    }
}
