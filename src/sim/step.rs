//! The simulation engine.
//!
//! [`Simulation`] owns the current state, the instance, a seeded RNG, and
//! the append-only history. One [`Simulation::step`] is the smallest unit
//! of progress:
//!
//! 1. pick the next event time (or now, when something immediate waits),
//! 2. advance the clock,
//! 3. fire resolved time dependencies,
//! 4. fire due outage entries,
//! 5. fire due completions (machines before transports),
//! 6. teleport jobs on transport-less instances,
//! 7. apply at most one agent-chosen start,
//! 8. audit invariants and append a history record.
//!
//! Two runs with the same instance, seed, and chosen-transition sequence
//! produce identical histories.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, trace, warn};

use crate::error::{SimError, SimResult};
use crate::models::{
    ComponentTransition, HistoryRecord, Instance, MachinePhase, PendingOutage, State,
    TransportPhase,
};
use crate::validation::validate_instance;

use super::{handlers, possible, timing, validate, SimConfig};

/// Outcome of one engine step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Clock value after the step.
    pub time: u64,
    /// Transitions applied, in application order.
    pub applied: Vec<ComponentTransition>,
    /// The chosen transition and the reason it was discarded, if it failed
    /// validation.
    pub rejected: Option<(ComponentTransition, String)>,
    /// No transition can ever fire again: the run is stuck.
    pub deadlocked: bool,
}

/// Deterministic, event-driven job-shop simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    instance: Instance,
    config: SimConfig,
    seed: u64,
    rng: SmallRng,
    state: State,
    history: Vec<HistoryRecord>,
}

impl Simulation {
    /// Builds a simulation over a validated instance.
    ///
    /// Default input/output buffers are materialized when missing, the
    /// instance is validated, and the initial outage occurrences are
    /// pre-sampled from the seed.
    pub fn new(instance: Instance, config: SimConfig, seed: u64) -> SimResult<Self> {
        let instance = instance.with_default_buffers();
        if let Err(errors) = validate_instance(&instance) {
            let summary = errors
                .iter()
                .map(|e| e.message.clone())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SimError::invalid_value("instance", summary));
        }
        let mut sim = Self {
            state: State::initial(&instance),
            rng: SmallRng::seed_from_u64(seed),
            instance,
            config,
            seed,
            history: Vec::new(),
        };
        sim.state.pending_outages = sim.sample_initial_outages();
        Ok(sim)
    }

    /// Restores the initial state, reseeds the RNG, and clears history.
    pub fn reset(&mut self) {
        self.rng = SmallRng::seed_from_u64(self.seed);
        self.state = State::initial(&self.instance);
        self.state.pending_outages = self.sample_initial_outages();
        self.history.clear();
    }

    fn sample_initial_outages(&mut self) -> Vec<PendingOutage> {
        let mut pending = Vec::new();
        for machine in &self.instance.machines {
            for (idx, schedule) in machine.outages.iter().enumerate() {
                pending.push(PendingOutage::sample(
                    &machine.id,
                    idx,
                    schedule,
                    0,
                    &mut self.rng,
                ));
            }
        }
        for transport in &self.instance.transports {
            for (idx, schedule) in transport.outages.iter().enumerate() {
                pending.push(PendingOutage::sample(
                    &transport.id,
                    idx,
                    schedule,
                    0,
                    &mut self.rng,
                ));
            }
        }
        pending
    }

    /// Current state snapshot.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// The instance this simulation runs.
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Engine configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Seed the RNG was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Append-only history of every step taken.
    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    /// Whether every job has reached an Output-role buffer.
    pub fn is_done(&self) -> bool {
        self.state.is_done(&self.instance)
    }

    /// The agent-facing candidate transitions for the current tick.
    pub fn possible_transitions(&self) -> Vec<ComponentTransition> {
        possible::possible_transitions(
            &self.state,
            &self.instance,
            self.config.allow_early_transport,
        )
    }

    /// Executes one internal step, optionally applying one agent-chosen
    /// start transition.
    ///
    /// An invalid chosen transition is discarded (reported in the result),
    /// never applied; forced transitions that fail validation are dropped
    /// with a warning. An [`SimError::InconsistentState`] from the final
    /// audit aborts the run.
    pub fn step(&mut self, chosen: Option<ComponentTransition>) -> SimResult<StepReport> {
        let old_time = self.state.time;
        let resolved = timing::resolved_dependencies(&self.state, &self.instance);
        let teleports_ready = self.instance.is_teleport()
            && !possible::teleportable_jobs(&self.state, &self.instance).is_empty();
        let immediate = chosen.is_some() || !resolved.is_empty() || teleports_ready;

        let t_next = if immediate {
            old_time
        } else {
            match timing::next_event_time(&self.state) {
                Some(t) => t,
                None => {
                    if self.possible_transitions().is_empty() {
                        warn!(time = old_time, "no transitions remain: deadlock");
                        return Ok(StepReport {
                            time: old_time,
                            applied: Vec::new(),
                            rejected: None,
                            deadlocked: true,
                        });
                    }
                    // decisions exist but nothing is due: creep one tick
                    old_time + 1
                }
            }
        };

        let mut state = self.state.at_time(t_next);
        let mut applied: Vec<ComponentTransition> = Vec::new();

        // resolved time dependencies fire their deferred transitions first
        for (transport_id, deferred) in resolved {
            state = handlers::release_dependency(&state, &transport_id)?;
            match validate::is_transition_valid(&state, &self.instance, &deferred) {
                Ok(()) => {
                    state = handlers::apply_transition(&state, &self.instance, &deferred, &mut self.rng)?;
                    applied.push(deferred);
                }
                Err(err) => {
                    warn!(transport = %transport_id, error = %err, "deferred transition discarded");
                }
            }
        }

        // outage entries preempt completions
        for pending in timing::due_outages(&state) {
            state = handlers::begin_outage(&state, &self.instance, &pending, &mut self.rng)?;
            let entry = if state.machine(&pending.component_id).is_some() {
                ComponentTransition::machine(&pending.component_id, MachinePhase::Outage, None)
            } else {
                ComponentTransition::transport(&pending.component_id, TransportPhase::Outage, None)
            };
            applied.push(entry);
        }

        // due completions, machines before transports
        for transition in timing::timed_transitions(&state) {
            match validate::is_transition_valid(&state, &self.instance, &transition) {
                Ok(()) => {
                    state =
                        handlers::apply_transition(&state, &self.instance, &transition, &mut self.rng)?;
                    applied.push(transition);
                }
                Err(err) => {
                    warn!(transition = %transition, error = %err, "timed transition discarded");
                }
            }
        }

        // transport-less instances move jobs instantly
        if self.instance.is_teleport() {
            let (next, moved) = handlers::apply_teleport_moves(&state, &self.instance)?;
            if moved > 0 {
                trace!(moved, time = t_next, "teleported jobs");
            }
            state = next;
        }

        // at most one agent-chosen start
        let mut rejected = None;
        if let Some(transition) = chosen.clone() {
            match validate::is_transition_valid(&state, &self.instance, &transition) {
                Ok(()) => {
                    state =
                        handlers::apply_transition(&state, &self.instance, &transition, &mut self.rng)?;
                    applied.push(transition);
                }
                Err(err) => {
                    warn!(transition = %transition, error = %err, "chosen transition rejected");
                    rejected = Some((transition, err.to_string()));
                }
            }
        }

        validate::audit_state(&state, &self.instance)?;
        if state.time < old_time {
            return Err(SimError::InconsistentState(format!(
                "clock moved backwards: {} -> {}",
                old_time, state.time
            )));
        }

        let message = format!(
            "t={}: {} transition(s){}",
            state.time,
            applied.len(),
            if rejected.is_some() { ", 1 rejected" } else { "" }
        );
        debug!(%message, "step complete");
        self.history.push(HistoryRecord {
            time: state.time,
            transitions: applied.clone(),
            chosen,
            message,
            state: state.clone(),
        });
        self.state = state;

        Ok(StepReport {
            time: self.state.time,
            applied,
            rejected,
            deadlocked: false,
        })
    }

    /// Replays the recorded chosen-transition sequence on a fresh engine
    /// with the same instance, config, and seed, returning the final
    /// state. Deterministic stepping makes the result identical to the
    /// live run.
    pub fn replay(&self) -> SimResult<State> {
        let mut fresh = Simulation::new(self.instance.clone(), self.config.clone(), self.seed)?;
        for record in &self.history {
            fresh.step(record.chosen.clone())?;
        }
        Ok(fresh.state.clone())
    }
}
