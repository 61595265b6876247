//! Instance model: the validated problem description the core consumes.
//!
//! An instance bundles machines, transports, jobs, standalone buffers, and
//! a travel-time matrix keyed by location pairs. The instance DSL and its
//! compiler live outside the core; this type is their output.
//!
//! # Reserved locations
//!
//! `in-buf` and `out-buf` (with aliases `input`, `input-buffer`, `output`,
//! `output-buffer`) name the system-default input/output buffers. When an
//! instance declares no Input- or Output-role buffer of its own,
//! [`Instance::with_default_buffers`] materializes them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::buffer::{BufferConfig, BufferDiscipline, BufferRole};
use super::duration::TimeSource;
use super::job::JobConfig;
use super::machine::MachineConfig;
use super::operation::OperationConfig;
use super::transport::TransportConfig;

/// Reserved id of the system-default input buffer.
pub const INPUT_BUFFER_ID: &str = "in-buf";
/// Reserved id of the system-default output buffer.
pub const OUTPUT_BUFFER_ID: &str = "out-buf";

/// A complete, validated problem instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Machines on the shop floor.
    pub machines: Vec<MachineConfig>,
    /// Transport units. Empty = jobs teleport between locations.
    pub transports: Vec<TransportConfig>,
    /// Jobs with their ordered operations.
    pub jobs: Vec<JobConfig>,
    /// Standalone buffers (input, output, compensation areas).
    pub buffers: Vec<BufferConfig>,
    /// Travel durations keyed by `(from_location, to_location)`.
    pub travel_times: HashMap<(String, String), TimeSource>,
}

impl Instance {
    /// Creates an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a machine.
    pub fn with_machine(mut self, machine: MachineConfig) -> Self {
        self.machines.push(machine);
        self
    }

    /// Adds a transport unit.
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transports.push(transport);
        self
    }

    /// Adds a job.
    pub fn with_job(mut self, job: JobConfig) -> Self {
        self.jobs.push(job);
        self
    }

    /// Adds a standalone buffer.
    pub fn with_buffer(mut self, buffer: BufferConfig) -> Self {
        self.buffers.push(buffer);
        self
    }

    /// Adds a one-way travel-time entry.
    pub fn with_travel_time(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        duration: impl Into<TimeSource>,
    ) -> Self {
        self.travel_times
            .insert((from.into(), to.into()), duration.into());
        self
    }

    /// Adds a symmetric travel-time entry.
    pub fn with_travel_between(
        mut self,
        a: impl Into<String>,
        b: impl Into<String>,
        duration: impl Into<TimeSource>,
    ) -> Self {
        let (a, b, d) = (a.into(), b.into(), duration.into());
        self.travel_times.insert((a.clone(), b.clone()), d.clone());
        self.travel_times.insert((b, a), d);
        self
    }

    /// Materializes the reserved default buffers when none are declared.
    ///
    /// Capacities default to the job count so the input can hold the whole
    /// release and the output never rejects a delivery.
    pub fn with_default_buffers(mut self) -> Self {
        let capacity = self.jobs.len().max(1);
        if self.input_buffer().is_none() {
            self.buffers.push(
                BufferConfig::new(INPUT_BUFFER_ID)
                    .with_role(BufferRole::Input)
                    .with_discipline(BufferDiscipline::Flex)
                    .with_capacity(capacity),
            );
        }
        if self.output_buffer().is_none() {
            self.buffers.push(
                BufferConfig::new(OUTPUT_BUFFER_ID)
                    .with_role(BufferRole::Output)
                    .with_discipline(BufferDiscipline::Flex)
                    .with_capacity(capacity),
            );
        }
        self
    }

    /// Machine config by id.
    pub fn machine(&self, id: &str) -> Option<&MachineConfig> {
        self.machines.iter().find(|m| m.id == id)
    }

    /// Transport config by id.
    pub fn transport(&self, id: &str) -> Option<&TransportConfig> {
        self.transports.iter().find(|t| t.id == id)
    }

    /// Job config by id.
    pub fn job(&self, id: &str) -> Option<&JobConfig> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Operation config by id, searched across all jobs.
    pub fn operation(&self, id: &str) -> Option<&OperationConfig> {
        self.jobs
            .iter()
            .flat_map(|j| j.operations.iter())
            .find(|o| o.id == id)
    }

    /// Every buffer config in the instance: standalone and machine-owned.
    pub fn all_buffers(&self) -> impl Iterator<Item = &BufferConfig> {
        self.buffers.iter().chain(self.machines.iter().flat_map(|m| {
            [&m.prebuffer, &m.buffer, &m.postbuffer].into_iter()
        }))
    }

    /// Buffer config by id, searched across standalone and machine-owned.
    pub fn buffer(&self, id: &str) -> Option<&BufferConfig> {
        self.all_buffers().find(|b| b.id == id)
    }

    /// The first Input-role buffer.
    pub fn input_buffer(&self) -> Option<&BufferConfig> {
        self.buffers.iter().find(|b| b.role == BufferRole::Input)
    }

    /// The first Output-role buffer.
    pub fn output_buffer(&self) -> Option<&BufferConfig> {
        self.buffers.iter().find(|b| b.role == BufferRole::Output)
    }

    /// Whether the given buffer id has the Output role.
    pub fn is_output_buffer(&self, buffer_id: &str) -> bool {
        self.buffer(buffer_id)
            .map(|b| b.role == BufferRole::Output)
            .unwrap_or(false)
    }

    /// Resolves reserved aliases to canonical buffer ids.
    ///
    /// `input` / `input-buffer` / `in-buf` resolve to the Input-role
    /// buffer; `output` / `output-buffer` / `out-buf` to the Output-role
    /// buffer. Any other name passes through unchanged.
    pub fn canonical_location(&self, name: &str) -> String {
        match name {
            "in-buf" | "input" | "input-buffer" => self
                .input_buffer()
                .map(|b| b.id.clone())
                .unwrap_or_else(|| name.to_string()),
            "out-buf" | "output" | "output-buffer" => self
                .output_buffer()
                .map(|b| b.id.clone())
                .unwrap_or_else(|| name.to_string()),
            other => other.to_string(),
        }
    }

    /// The location a transport must drive to for a job sitting in the
    /// given buffer: the owning machine if the buffer has a parent,
    /// otherwise the buffer itself.
    pub fn pickup_location(&self, buffer_id: &str) -> String {
        self.buffer(buffer_id)
            .and_then(|b| b.parent.clone())
            .unwrap_or_else(|| buffer_id.to_string())
    }

    /// Travel duration between two locations.
    ///
    /// Identical locations travel for free; aliases are resolved before
    /// lookup. `None` means the matrix has no entry for the pair.
    pub fn travel_duration(&self, from: &str, to: &str) -> Option<TimeSource> {
        let from = self.canonical_location(from);
        let to = self.canonical_location(to);
        if from == to {
            return Some(TimeSource::fixed(0));
        }
        self.travel_times.get(&(from, to)).cloned()
    }

    /// Total number of operations across all jobs.
    pub fn total_operations(&self) -> usize {
        self.jobs.iter().map(|j| j.operations.len()).sum()
    }

    /// Whether the instance runs without transports (teleport mode).
    pub fn is_teleport(&self) -> bool {
        self.transports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::operation::OperationConfig;

    fn small_instance() -> Instance {
        Instance::new()
            .with_machine(MachineConfig::new("m-0"))
            .with_job(JobConfig::new("j-0").with_operation(OperationConfig::new("o-0", "m-0", 3)))
            .with_default_buffers()
    }

    #[test]
    fn test_default_buffers_materialized() {
        let instance = small_instance();
        assert_eq!(instance.input_buffer().unwrap().id, INPUT_BUFFER_ID);
        assert_eq!(instance.output_buffer().unwrap().id, OUTPUT_BUFFER_ID);
        assert_eq!(instance.input_buffer().unwrap().capacity, 1);
    }

    #[test]
    fn test_default_buffers_respect_declared_roles() {
        let instance = Instance::new()
            .with_buffer(
                BufferConfig::new("arrivals")
                    .with_role(BufferRole::Input)
                    .with_capacity(5),
            )
            .with_default_buffers();
        assert_eq!(instance.input_buffer().unwrap().id, "arrivals");
        // output still defaulted
        assert_eq!(instance.output_buffer().unwrap().id, OUTPUT_BUFFER_ID);
    }

    #[test]
    fn test_alias_resolution() {
        let instance = small_instance();
        assert_eq!(instance.canonical_location("input"), INPUT_BUFFER_ID);
        assert_eq!(instance.canonical_location("input-buffer"), INPUT_BUFFER_ID);
        assert_eq!(instance.canonical_location("output"), OUTPUT_BUFFER_ID);
        assert_eq!(instance.canonical_location("m-0"), "m-0");
    }

    #[test]
    fn test_buffer_lookup_spans_machines() {
        let instance = small_instance();
        assert!(instance.buffer("m-0-pre").is_some());
        assert!(instance.buffer("m-0-post").is_some());
        assert!(instance.buffer(INPUT_BUFFER_ID).is_some());
        assert!(instance.buffer("b-nope").is_none());
    }

    #[test]
    fn test_pickup_location_uses_parent() {
        let instance = small_instance();
        assert_eq!(instance.pickup_location("m-0-post"), "m-0");
        assert_eq!(instance.pickup_location(INPUT_BUFFER_ID), INPUT_BUFFER_ID);
    }

    #[test]
    fn test_travel_duration() {
        let instance = small_instance().with_travel_between("in-buf", "m-0", 4u64);
        assert_eq!(
            instance.travel_duration("in-buf", "m-0"),
            Some(TimeSource::fixed(4))
        );
        assert_eq!(
            instance.travel_duration("m-0", "in-buf"),
            Some(TimeSource::fixed(4))
        );
        assert_eq!(
            instance.travel_duration("m-0", "m-0"),
            Some(TimeSource::fixed(0))
        );
        assert_eq!(instance.travel_duration("m-0", "m-9"), None);
    }

    #[test]
    fn test_operation_lookup() {
        let instance = small_instance();
        assert_eq!(instance.operation("o-0").unwrap().machine, "m-0");
        assert!(instance.operation("o-9").is_none());
        assert_eq!(instance.total_operations(), 1);
    }

    #[test]
    fn test_teleport_mode() {
        assert!(small_instance().is_teleport());
        let with_agv = small_instance().with_transport(TransportConfig::new("t-0", "in-buf"));
        assert!(!with_agv.is_teleport());
    }
}
