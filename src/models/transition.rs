//! Component transitions: the vocabulary of state change.
//!
//! A [`ComponentTransition`] is the only way the simulation state advances.
//! It names a component, the phase it should enter, and optionally the job
//! the change concerns. Handlers dispatch on the pair (current phase,
//! target phase); anything outside the component's phase diagram is
//! rejected by the validators.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::machine::MachinePhase;
use super::transport::TransportPhase;

/// The phase a transition drives its component into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionTarget {
    /// A machine phase change.
    Machine(MachinePhase),
    /// A transport phase change.
    Transport(TransportPhase),
}

/// A single requested phase change for one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentTransition {
    /// Component this transition addresses.
    pub component_id: String,
    /// Target phase.
    pub target: TransitionTarget,
    /// Job the transition moves or claims, if any.
    pub job_id: Option<String>,
}

impl ComponentTransition {
    /// Creates a machine transition.
    pub fn machine(
        component_id: impl Into<String>,
        phase: MachinePhase,
        job_id: Option<String>,
    ) -> Self {
        Self {
            component_id: component_id.into(),
            target: TransitionTarget::Machine(phase),
            job_id,
        }
    }

    /// Creates a transport transition.
    pub fn transport(
        component_id: impl Into<String>,
        phase: TransportPhase,
        job_id: Option<String>,
    ) -> Self {
        Self {
            component_id: component_id.into(),
            target: TransitionTarget::Transport(phase),
            job_id,
        }
    }

    /// Whether this transition enters an outage phase.
    pub fn is_outage_entry(&self) -> bool {
        matches!(
            self.target,
            TransitionTarget::Machine(MachinePhase::Outage)
                | TransitionTarget::Transport(TransportPhase::Outage)
        )
    }

    /// Whether this transition addresses a machine.
    pub fn is_machine(&self) -> bool {
        matches!(self.target, TransitionTarget::Machine(_))
    }

    /// Whether this transition addresses a transport.
    pub fn is_transport(&self) -> bool {
        matches!(self.target, TransitionTarget::Transport(_))
    }
}

impl fmt::Display for ComponentTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.target {
            TransitionTarget::Machine(p) => format!("{p:?}"),
            TransitionTarget::Transport(p) => format!("{p:?}"),
        };
        match &self.job_id {
            Some(job) => write!(f, "{} -> {} ({})", self.component_id, phase, job),
            None => write!(f, "{} -> {}", self.component_id, phase),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_transition() {
        let t = ComponentTransition::machine("m-0", MachinePhase::Setup, Some("j-0".into()));
        assert!(t.is_machine());
        assert!(!t.is_transport());
        assert!(!t.is_outage_entry());
        assert_eq!(t.to_string(), "m-0 -> Setup (j-0)");
    }

    #[test]
    fn test_outage_entry_detection() {
        let m = ComponentTransition::machine("m-1", MachinePhase::Outage, None);
        let t = ComponentTransition::transport("t-1", TransportPhase::Outage, None);
        let w = ComponentTransition::transport("t-1", TransportPhase::Working, None);
        assert!(m.is_outage_entry());
        assert!(t.is_outage_entry());
        assert!(!w.is_outage_entry());
    }

    #[test]
    fn test_display_without_job() {
        let t = ComponentTransition::transport("t-0", TransportPhase::Idle, None);
        assert_eq!(t.to_string(), "t-0 -> Idle");
    }
}
