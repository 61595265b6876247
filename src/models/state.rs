//! The simulation state value and its query/update helpers.
//!
//! A [`State`] is an immutable snapshot: machines, transports, jobs,
//! standalone buffers, the clock, and the pre-sampled pending outages.
//! All cross-references are ids; the `with_*` helpers produce a new state
//! with one component replaced, never mutating in place. History records
//! chain snapshots for rendering and replay and are never consulted by the
//! engine for correctness.

use serde::{Deserialize, Serialize};

use super::buffer::BufferState;
use super::instance::Instance;
use super::job::JobState;
use super::machine::MachineState;
use super::outage::PendingOutage;
use super::transition::ComponentTransition;
use super::transport::TransportState;

/// One immutable snapshot of the whole shop floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Simulation clock, in ticks. Never decreases.
    pub time: u64,
    /// Machine states.
    pub machines: Vec<MachineState>,
    /// Transport states.
    pub transports: Vec<TransportState>,
    /// Job states.
    pub jobs: Vec<JobState>,
    /// Standalone buffer states (machine buffers live on their machines).
    pub buffers: Vec<BufferState>,
    /// Pre-sampled upcoming outages, one per (component, schedule).
    pub pending_outages: Vec<PendingOutage>,
}

impl State {
    /// Builds the initial state for an instance: machines and transports
    /// idle, every job stored in the Input-role buffer in declaration
    /// order. Pending outages start empty; the engine samples them.
    pub fn initial(instance: &Instance) -> Self {
        let input_id = instance
            .input_buffer()
            .map(|b| b.id.clone())
            .unwrap_or_else(|| super::instance::INPUT_BUFFER_ID.to_string());

        let mut buffers: Vec<BufferState> = instance
            .buffers
            .iter()
            .map(|b| BufferState::empty(&b.id))
            .collect();
        if let Some(input) = buffers.iter_mut().find(|b| b.id == input_id) {
            input.store = instance.jobs.iter().map(|j| j.id.clone()).collect();
        }

        Self {
            time: 0,
            machines: instance.machines.iter().map(MachineState::initial).collect(),
            transports: instance
                .transports
                .iter()
                .map(TransportState::initial)
                .collect(),
            jobs: instance
                .jobs
                .iter()
                .map(|j| JobState::initial(j, &input_id))
                .collect(),
            buffers,
            pending_outages: Vec::new(),
        }
    }

    /// Machine state by id.
    pub fn machine(&self, id: &str) -> Option<&MachineState> {
        self.machines.iter().find(|m| m.id == id)
    }

    /// Transport state by id.
    pub fn transport(&self, id: &str) -> Option<&TransportState> {
        self.transports.iter().find(|t| t.id == id)
    }

    /// Job state by id.
    pub fn job(&self, id: &str) -> Option<&JobState> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Buffer state by id, searching standalone and machine-owned buffers.
    pub fn buffer(&self, id: &str) -> Option<&BufferState> {
        self.buffers
            .iter()
            .find(|b| b.id == id)
            .or_else(|| self.machines.iter().find_map(|m| m.buffer_by_id(id)))
    }

    /// Every buffer state: standalone and machine-owned.
    pub fn all_buffers(&self) -> impl Iterator<Item = &BufferState> {
        self.buffers.iter().chain(self.machines.iter().flat_map(|m| {
            [&m.prebuffer, &m.buffer, &m.postbuffer].into_iter()
        }))
    }

    /// New state with one machine replaced (matched by id).
    pub fn with_machine(&self, machine: MachineState) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.machines.iter_mut().find(|m| m.id == machine.id) {
            *slot = machine;
        }
        next
    }

    /// New state with one transport replaced (matched by id).
    pub fn with_transport(&self, transport: TransportState) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.transports.iter_mut().find(|t| t.id == transport.id) {
            *slot = transport;
        }
        next
    }

    /// New state with one job replaced (matched by id).
    pub fn with_job(&self, job: JobState) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.jobs.iter_mut().find(|j| j.id == job.id) {
            *slot = job;
        }
        next
    }

    /// New state with one buffer replaced, wherever it lives.
    ///
    /// Standalone buffers are replaced directly; machine-owned buffers are
    /// routed to the owning machine's matching slot.
    pub fn with_buffer(&self, buffer: BufferState) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.buffers.iter_mut().find(|b| b.id == buffer.id) {
            *slot = buffer;
            return next;
        }
        for machine in next.machines.iter_mut() {
            if machine.prebuffer.id == buffer.id {
                machine.prebuffer = buffer;
                return next;
            }
            if machine.buffer.id == buffer.id {
                machine.buffer = buffer;
                return next;
            }
            if machine.postbuffer.id == buffer.id {
                machine.postbuffer = buffer;
                return next;
            }
        }
        next
    }

    /// New state at a later clock value.
    pub fn at_time(&self, time: u64) -> Self {
        let mut next = self.clone();
        next.time = time;
        next
    }

    /// Whether every job sits in an Output-role buffer.
    pub fn is_done(&self, instance: &Instance) -> bool {
        self.jobs
            .iter()
            .all(|j| instance.is_output_buffer(&j.location))
    }
}

/// One entry of the append-only simulation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Clock value after the step.
    pub time: u64,
    /// Every transition applied during the step, in application order.
    pub transitions: Vec<ComponentTransition>,
    /// The agent-chosen transition, if the step carried one.
    pub chosen: Option<ComponentTransition>,
    /// Human-readable step summary.
    pub message: String,
    /// Snapshot after the step.
    pub state: State,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::buffer::{BufferConfig, BufferRole};
    use crate::models::instance::INPUT_BUFFER_ID;
    use crate::models::job::JobConfig;
    use crate::models::machine::MachineConfig;
    use crate::models::operation::OperationConfig;

    fn instance() -> Instance {
        Instance::new()
            .with_machine(MachineConfig::new("m-0"))
            .with_job(JobConfig::new("j-0").with_operation(OperationConfig::new("o-0", "m-0", 3)))
            .with_job(JobConfig::new("j-1").with_operation(OperationConfig::new("o-1", "m-0", 2)))
            .with_default_buffers()
    }

    #[test]
    fn test_initial_places_jobs_in_input() {
        let state = State::initial(&instance());
        let input = state.buffer(INPUT_BUFFER_ID).unwrap();
        assert_eq!(input.store, vec!["j-0".to_string(), "j-1".to_string()]);
        for job in &state.jobs {
            assert_eq!(job.location, INPUT_BUFFER_ID);
        }
        assert_eq!(state.time, 0);
    }

    #[test]
    fn test_buffer_lookup_reaches_machine_buffers() {
        let state = State::initial(&instance());
        assert!(state.buffer("m-0-pre").is_some());
        assert!(state.buffer(INPUT_BUFFER_ID).is_some());
        assert!(state.buffer("b-none").is_none());
    }

    #[test]
    fn test_with_buffer_routes_to_machine() {
        let state = State::initial(&instance());
        let mut pre = state.buffer("m-0-pre").unwrap().clone();
        pre.store.push("j-0".into());
        let next = state.with_buffer(pre);
        assert_eq!(next.machine("m-0").unwrap().prebuffer.store, vec!["j-0"]);
        // original untouched
        assert!(state.machine("m-0").unwrap().prebuffer.store.is_empty());
    }

    #[test]
    fn test_is_done_requires_output_location() {
        let inst = instance();
        let mut state = State::initial(&inst);
        assert!(!state.is_done(&inst));
        let out_id = inst.output_buffer().unwrap().id.clone();
        for job in state.jobs.iter_mut() {
            job.location = out_id.clone();
        }
        assert!(state.is_done(&inst));
    }

    #[test]
    fn test_declared_output_role_counts() {
        let inst = Instance::new()
            .with_buffer(
                BufferConfig::new("ship-dock")
                    .with_role(BufferRole::Output)
                    .with_capacity(4),
            )
            .with_job(JobConfig::new("j-0"))
            .with_default_buffers();
        let mut state = State::initial(&inst);
        state.jobs[0].location = "ship-dock".into();
        assert!(state.is_done(&inst));
    }
}
