//! Simulation domain models.
//!
//! Immutable value types for everything the simulator touches: time and
//! occupation, duration sources, operations, jobs, machines, transports,
//! buffers, outages, the problem [`Instance`], the runtime [`State`], and
//! the [`ComponentTransition`] vocabulary that advances it.
//!
//! All cross-references between components are ids resolved through
//! lookups; no type stores a pointer into another. Every state change is
//! expressed as a copy with one component replaced.

mod buffer;
mod duration;
mod instance;
mod job;
mod machine;
mod operation;
mod outage;
mod state;
mod time;
mod transition;
mod transport;

pub use buffer::{
    put_in_buffer, remove_from_buffer, BufferConfig, BufferDiscipline, BufferRole, BufferState,
};
pub use duration::TimeSource;
pub use instance::{Instance, INPUT_BUFFER_ID, OUTPUT_BUFFER_ID};
pub use job::{JobConfig, JobState};
pub use machine::{MachineConfig, MachinePhase, MachineState, PausedWork};
pub use operation::{OperationConfig, OperationState, OperationStatus};
pub use outage::{OutageConfig, OutageKind, PendingOutage};
pub use state::{HistoryRecord, State};
pub use time::{Occupied, TimeDependency};
pub use transition::{ComponentTransition, TransitionTarget};
pub use transport::{TransportConfig, TransportPhase, TransportState};
