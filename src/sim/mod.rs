//! The simulation engine.
//!
//! Pure building blocks — transition [`handlers`], [`validate`]
//! preconditions and invariant audits, [`possible`]-transition
//! generation, [`timing`] (next-event computation and the time-dependency
//! resolver), makespan [`bounds`] — composed by [`Simulation`], which owns
//! the state, the seeded RNG, and the append-only history.
//!
//! # Determinism
//!
//! Given the same instance, [`SimConfig`], seed, and chosen-transition
//! sequence, two runs produce identical histories. All stochastic
//! durations are drawn from one RNG in a fixed advancement order.

pub mod bounds;
pub mod handlers;
pub mod possible;
mod step;
pub mod timing;
pub mod validate;

pub use step::{Simulation, StepReport};

use serde::{Deserialize, Serialize};

/// Engine and truncation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Invalid actions tolerated before truncation.
    pub truncation_joker: u32,
    /// Whether invalid actions ever truncate the episode.
    pub truncation_active: bool,
    /// Truncate once `now > lower_bound * max_time_fct`.
    pub max_time_fct: f64,
    /// Truncate once actions exceed `total_operations * max_action_fct`.
    pub max_action_fct: f64,
    /// Allow committing a transport to a job not yet at a pickable head.
    pub allow_early_transport: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            truncation_joker: 3,
            truncation_active: true,
            max_time_fct: 2.0,
            max_action_fct: 4.0,
            allow_early_transport: false,
        }
    }
}

impl SimConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the invalid-action allowance.
    pub fn with_truncation_joker(mut self, joker: u32) -> Self {
        self.truncation_joker = joker;
        self
    }

    /// Enables or disables truncation on invalid actions.
    pub fn with_truncation_active(mut self, active: bool) -> Self {
        self.truncation_active = active;
        self
    }

    /// Sets the time-factor truncation horizon.
    pub fn with_max_time_fct(mut self, factor: f64) -> Self {
        self.max_time_fct = factor;
        self
    }

    /// Sets the action-count truncation factor.
    pub fn with_max_action_fct(mut self, factor: f64) -> Self {
        self.max_action_fct = factor;
        self
    }

    /// Allows or forbids early transport commitments.
    pub fn with_early_transport(mut self, allow: bool) -> Self {
        self.allow_early_transport = allow;
        self
    }
}
