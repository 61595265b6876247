//! Occupation model: concrete deadlines and time dependencies.
//!
//! A component's `occupied_till` field is an [`Occupied`] value: either a
//! concrete tick at which the component's current activity ends, or a
//! [`TimeDependency`] parking the component until a named blocking job
//! stops blocking a named buffer. The dependency carries the transition to
//! fire once it resolves, so a deferred pickup needs no re-planning.

use serde::{Deserialize, Serialize};

use super::transition::ComponentTransition;

/// A deferred transition waiting on a blocking job at a buffer.
///
/// Created when a transport requests a job that is in a buffer but not at
/// its head position. Resolution conditions (checked every tick):
///
/// - **R1** — the blocking job is no longer at the head of the buffer;
/// - **R2** — another transport is carrying the blocking job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeDependency {
    /// Job currently occupying the head position.
    pub blocking_job: String,
    /// Buffer whose ordering blocks the pickup.
    pub buffer_id: String,
    /// Transition to apply once the dependency resolves.
    pub deferred: Box<ComponentTransition>,
}

/// What a component is occupied by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Occupied {
    /// Busy until the given tick (inclusive start, exclusive continuation).
    Until(u64),
    /// Parked on a time dependency; no concrete deadline exists.
    Waiting(TimeDependency),
}

impl Occupied {
    /// A component that is free right away.
    pub fn free() -> Self {
        Self::Until(0)
    }

    /// The concrete deadline, if one exists.
    pub fn until(&self) -> Option<u64> {
        match self {
            Self::Until(t) => Some(*t),
            Self::Waiting(_) => None,
        }
    }

    /// The pending dependency, if one exists.
    pub fn waiting(&self) -> Option<&TimeDependency> {
        match self {
            Self::Until(_) => None,
            Self::Waiting(dep) => Some(dep),
        }
    }

    /// Whether the occupation has run out at `now`.
    ///
    /// A waiting component is never due by clock; it is released by the
    /// dependency resolver instead.
    pub fn is_due(&self, now: u64) -> bool {
        match self {
            Self::Until(t) => *t <= now,
            Self::Waiting(_) => false,
        }
    }
}

impl Default for Occupied {
    fn default() -> Self {
        Self::free()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::machine::MachinePhase;

    #[test]
    fn test_until_due() {
        let occ = Occupied::Until(10);
        assert!(!occ.is_due(9));
        assert!(occ.is_due(10));
        assert!(occ.is_due(11));
        assert_eq!(occ.until(), Some(10));
        assert!(occ.waiting().is_none());
    }

    #[test]
    fn test_waiting_never_due() {
        let dep = TimeDependency {
            blocking_job: "j-0".into(),
            buffer_id: "b-0".into(),
            deferred: Box::new(ComponentTransition::machine(
                "m-0",
                MachinePhase::Setup,
                Some("j-1".into()),
            )),
        };
        let occ = Occupied::Waiting(dep);
        assert!(!occ.is_due(u64::MAX));
        assert!(occ.until().is_none());
        assert_eq!(occ.waiting().unwrap().blocking_job, "j-0");
    }

    #[test]
    fn test_default_is_free() {
        assert!(Occupied::default().is_due(0));
    }
}
