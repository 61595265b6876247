//! Factory interfaces between the engine and an external agent loop.
//!
//! Three seams, declared as traits so configuration can choose a variant
//! at startup and the environment holds it as a field:
//!
//! - [`ActionInterpreter`] — raw agent action → transitions or no-op;
//! - [`ObservationBuilder`] — state → feature object of a fixed shape;
//! - [`RewardScorer`] — step outcome → scalar reward.
//!
//! The canonical interpreter is binary: accept or skip the head of the
//! offered transition list.

use serde::{Deserialize, Serialize};

use crate::models::{ComponentTransition, Instance, State};
use crate::sim::bounds;

/// What an interpreted action asks the engine to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    /// Apply these transitions, one engine step each.
    Schedule(Vec<ComponentTransition>),
    /// Decline; the environment advances or rotates the offer.
    NoOp,
}

/// Translates a raw agent action into engine transitions.
pub trait ActionInterpreter {
    /// Raw action type the agent emits.
    type Action;

    /// Interprets one action against the current offer.
    fn interpret(
        &self,
        action: &Self::Action,
        state: &State,
        instance: &Instance,
        offered: &[ComponentTransition],
    ) -> Interpretation;
}

/// The canonical binary decision: schedule the offered head pairing or
/// skip it.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryActionInterpreter;

impl ActionInterpreter for BinaryActionInterpreter {
    type Action = bool;

    fn interpret(
        &self,
        action: &bool,
        _state: &State,
        _instance: &Instance,
        offered: &[ComponentTransition],
    ) -> Interpretation {
        match (*action, offered.first()) {
            (true, Some(head)) => Interpretation::Schedule(vec![head.clone()]),
            _ => Interpretation::NoOp,
        }
    }
}

/// Builds the observation handed to the agent.
pub trait ObservationBuilder {
    /// Feature object of a pre-declared shape.
    type Observation;

    /// Builds the observation for a state.
    fn build(&self, state: &State, instance: &Instance) -> Self::Observation;
}

/// Flat numeric features: normalized clock, per-job operation progress,
/// per-machine and per-transport availability.
///
/// Shape: `1 + jobs + machines + transports` values in `[0, 1]`, ordered
/// by declaration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressObservation;

impl ObservationBuilder for ProgressObservation {
    type Observation = Vec<f64>;

    fn build(&self, state: &State, instance: &Instance) -> Vec<f64> {
        let horizon = bounds::max_allowed_time(instance).max(1) as f64;
        let mut features = Vec::with_capacity(
            1 + instance.jobs.len() + instance.machines.len() + instance.transports.len(),
        );
        features.push((state.time as f64 / horizon).min(1.0));
        for job_config in &instance.jobs {
            let progress = state
                .job(&job_config.id)
                .map(|job| {
                    if job.operations.is_empty() {
                        1.0
                    } else {
                        job.operations.iter().filter(|o| o.is_done()).count() as f64
                            / job.operations.len() as f64
                    }
                })
                .unwrap_or(0.0);
            features.push(progress);
        }
        for machine_config in &instance.machines {
            let available = state
                .machine(&machine_config.id)
                .map(|m| m.phase == crate::models::MachinePhase::Idle)
                .unwrap_or(false);
            features.push(if available { 1.0 } else { 0.0 });
        }
        for transport_config in &instance.transports {
            let available = state
                .transport(&transport_config.id)
                .map(|t| t.is_free())
                .unwrap_or(false);
            features.push(if available { 1.0 } else { 0.0 });
        }
        features
    }
}

/// What the environment tells the scorer about one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    /// Clock after the step.
    pub time: u64,
    /// The action scheduled something (as opposed to a no-op or a
    /// rejected transition).
    pub scheduled: bool,
    /// The chosen transition was rejected by a validator.
    pub rejected: bool,
    /// Size of the offer the agent decided over.
    pub possible: usize,
}

/// Scores one environment step.
pub trait RewardScorer {
    /// Computes the reward for a step outcome.
    fn score(
        &mut self,
        summary: &StepSummary,
        state: &State,
        instance: &Instance,
        terminated: bool,
        truncated: bool,
    ) -> f64;

    /// Clears per-episode accumulators.
    fn reset(&mut self) {}
}

/// Makespan-driven reward: a sparse terminal payout scaled between the
/// lower bound and the worst-case horizon, a penalty on truncation, and a
/// dense discouragement of long no-op streaks.
#[derive(Debug, Clone)]
pub struct MakespanScorer {
    /// Weight of the terminal makespan payout.
    pub sparse_bias: f64,
    /// Weight of the dense no-op penalty.
    pub dense_bias: f64,
    /// Penalty magnitude on truncation.
    pub truncation_bias: f64,
    no_op_streak: usize,
}

impl MakespanScorer {
    /// Creates a scorer with unit weights.
    pub fn new() -> Self {
        Self {
            sparse_bias: 1.0,
            dense_bias: 1.0,
            truncation_bias: 1.0,
            no_op_streak: 0,
        }
    }

    /// Sets the sparse weight.
    pub fn with_sparse_bias(mut self, bias: f64) -> Self {
        self.sparse_bias = bias;
        self
    }

    /// Sets the dense weight.
    pub fn with_dense_bias(mut self, bias: f64) -> Self {
        self.dense_bias = bias;
        self
    }

    /// Sets the truncation penalty magnitude.
    pub fn with_truncation_bias(mut self, bias: f64) -> Self {
        self.truncation_bias = bias;
        self
    }

    fn sparse(&self, time: u64, instance: &Instance, terminated: bool, truncated: bool) -> f64 {
        if truncated {
            return -self.truncation_bias;
        }
        if !terminated {
            return 0.0;
        }
        let horizon = bounds::max_allowed_time(instance);
        let floor = bounds::lower_bound(instance);
        if horizon <= floor {
            return 1.0;
        }
        (horizon.saturating_sub(time)) as f64 / (horizon - floor) as f64
    }

    fn dense(&mut self, summary: &StepSummary, instance: &Instance) -> f64 {
        if summary.scheduled {
            self.no_op_streak = 0;
        } else {
            self.no_op_streak += 1;
        }
        let total_ops = instance.total_operations();
        if total_ops == 0 {
            return 0.0;
        }
        // idling a full offer cycle without scheduling earns a nudge
        if self.no_op_streak >= instance.jobs.len().max(1) {
            -1.0 / total_ops as f64
        } else {
            0.0
        }
    }
}

impl Default for MakespanScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl RewardScorer for MakespanScorer {
    fn score(
        &mut self,
        summary: &StepSummary,
        _state: &State,
        instance: &Instance,
        terminated: bool,
        truncated: bool,
    ) -> f64 {
        let sparse = self.sparse(summary.time, instance, terminated, truncated);
        let dense = self.dense(summary, instance);
        sparse * self.sparse_bias + dense * self.dense_bias
    }

    fn reset(&mut self) {
        self.no_op_streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobConfig, MachineConfig, MachinePhase, OperationConfig};

    fn instance() -> Instance {
        Instance::new()
            .with_machine(MachineConfig::new("m-0"))
            .with_job(
                JobConfig::new("j-0")
                    .with_operation(OperationConfig::new("o-0", "m-0", 3))
                    .with_operation(OperationConfig::new("o-1", "m-0", 2)),
            )
            .with_default_buffers()
    }

    #[test]
    fn test_binary_interpreter_accepts_head() {
        let inst = instance();
        let state = State::initial(&inst);
        let offered = vec![ComponentTransition::machine(
            "m-0",
            MachinePhase::Working,
            Some("j-0".into()),
        )];
        let interp = BinaryActionInterpreter;
        assert_eq!(
            interp.interpret(&true, &state, &inst, &offered),
            Interpretation::Schedule(offered.clone())
        );
        assert_eq!(
            interp.interpret(&false, &state, &inst, &offered),
            Interpretation::NoOp
        );
        assert_eq!(
            interp.interpret(&true, &state, &inst, &[]),
            Interpretation::NoOp
        );
    }

    #[test]
    fn test_observation_shape_and_range() {
        let inst = instance();
        let state = State::initial(&inst);
        let obs = ProgressObservation.build(&state, &inst);
        // clock + 1 job + 1 machine + 0 transports
        assert_eq!(obs.len(), 3);
        assert!(obs.iter().all(|v| (0.0..=1.0).contains(v)));
        // idle machine reads available
        assert!((obs[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sparse_reward_scales_with_makespan() {
        let inst = instance();
        let state = State::initial(&inst);
        let mut scorer = MakespanScorer::new();
        let summary = StepSummary {
            time: 5,
            scheduled: true,
            rejected: false,
            possible: 1,
        };
        // lower bound = horizon = 5 for this single-machine chain
        let reward = scorer.score(&summary, &state, &inst, true, false);
        assert!((reward - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_truncation_penalty() {
        let inst = instance();
        let state = State::initial(&inst);
        let mut scorer = MakespanScorer::new().with_truncation_bias(2.0);
        let summary = StepSummary {
            time: 50,
            scheduled: false,
            rejected: false,
            possible: 0,
        };
        let reward = scorer.score(&summary, &state, &inst, false, true);
        assert!(reward <= -2.0);
    }

    #[test]
    fn test_no_op_streak_penalty_and_reset() {
        let inst = instance();
        let state = State::initial(&inst);
        let mut scorer = MakespanScorer::new();
        let idle = StepSummary {
            time: 0,
            scheduled: false,
            rejected: false,
            possible: 1,
        };
        // one job: a single idle step already completes a cycle
        let r = scorer.score(&idle, &state, &inst, false, false);
        assert!(r < 0.0);
        scorer.reset();
        let busy = StepSummary {
            scheduled: true,
            ..idle
        };
        let r = scorer.score(&busy, &state, &inst, false, false);
        assert!((r - 0.0).abs() < 1e-12);
    }
}
