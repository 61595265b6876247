//! Transport (AGV) model.
//!
//! A transport moves jobs between locations. Phase cycle:
//! `Idle → Pickup → Working → Idle` — the pickup leg drives to the job,
//! the working leg carries it to its destination. Outages only start from
//! `Idle`; a schedule that comes due mid-leg fires at the next return to
//! idle.

use serde::{Deserialize, Serialize};

use super::outage::OutageConfig;
use super::time::Occupied;

/// Transport phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportPhase {
    /// Free for a new haul.
    Idle,
    /// Driving empty to the job's location.
    Pickup,
    /// Carrying the job to its destination.
    Working,
    /// Out of service.
    Outage,
}

/// Static description of a transport unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Unique transport identifier.
    pub id: String,
    /// Starting location (machine or buffer id).
    pub location: String,
    /// Outage schedules; all apply, serialized in arrival order.
    pub outages: Vec<OutageConfig>,
}

impl TransportConfig {
    /// Creates a transport starting at the given location.
    pub fn new(id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            outages: Vec::new(),
        }
    }

    /// Adds an outage schedule.
    pub fn with_outage(mut self, outage: OutageConfig) -> Self {
        self.outages.push(outage);
        self
    }
}

/// Runtime state of a transport unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportState {
    /// Transport identifier (matches the config id).
    pub id: String,
    /// Current phase.
    pub phase: TransportPhase,
    /// Current location (machine or buffer id); updated on leg completion.
    pub location: String,
    /// Job this transport is committed to or carrying.
    pub transport_job: Option<String>,
    /// When the current leg ends, or the dependency it waits on.
    pub occupied_till: Occupied,
}

impl TransportState {
    /// Initial idle state for a configured transport.
    pub fn initial(config: &TransportConfig) -> Self {
        Self {
            id: config.id.clone(),
            phase: TransportPhase::Idle,
            location: config.location.clone(),
            transport_job: None,
            occupied_till: Occupied::free(),
        }
    }

    /// Whether the transport can take on a new haul.
    pub fn is_free(&self) -> bool {
        self.phase == TransportPhase::Idle
            && self.transport_job.is_none()
            && self.occupied_till.waiting().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::machine::MachinePhase;
    use crate::models::time::TimeDependency;
    use crate::models::transition::ComponentTransition;

    #[test]
    fn test_initial_state() {
        let config = TransportConfig::new("t-0", "in-buf");
        let state = TransportState::initial(&config);
        assert_eq!(state.phase, TransportPhase::Idle);
        assert_eq!(state.location, "in-buf");
        assert!(state.is_free());
    }

    #[test]
    fn test_committed_transport_is_not_free() {
        let mut state = TransportState::initial(&TransportConfig::new("t-0", "in-buf"));
        state.transport_job = Some("j-0".into());
        assert!(!state.is_free());
    }

    #[test]
    fn test_waiting_transport_is_not_free() {
        let mut state = TransportState::initial(&TransportConfig::new("t-0", "in-buf"));
        state.occupied_till = Occupied::Waiting(TimeDependency {
            blocking_job: "j-1".into(),
            buffer_id: "b-0".into(),
            deferred: Box::new(ComponentTransition::machine(
                "m-0",
                MachinePhase::Setup,
                None,
            )),
        });
        assert!(!state.is_free());
    }
}
