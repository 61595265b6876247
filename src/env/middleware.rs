//! Environment middleware: the agent-facing step/reset/render surface.
//!
//! [`ShopFloorEnv`] wraps the engine for an external agent loop. One
//! external step interprets the action, applies zero or more engine
//! steps, drains forced events until the next decision point, and emits
//! observation, reward, terminated, truncated, and info.
//!
//! Declining an offer rotates the offered list instead of burning time;
//! only when every candidate of the instant has been declined does the
//! clock jump to the next event. Invalid actions consume jokers before
//! truncation strikes.

use tracing::{debug, warn};

use crate::error::{SimError, SimResult};
use crate::models::Instance;
use crate::sim::{bounds, SimConfig, Simulation};

use super::factories::{
    ActionInterpreter, Interpretation, ObservationBuilder, RewardScorer, StepSummary,
};

/// Safety cap for the forced-event drain loop.
const DRAIN_LIMIT: usize = 100_000;

/// Rendering surface selector.
///
/// The core renders plain text; dashboard and 3D simulation views are
/// external collaborators fed from the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// One-line episode summary.
    Default,
    /// External Gantt dashboard (not provided by the core).
    Dashboard,
    /// Full textual state dump.
    Debug,
    /// External 3D view (not provided by the core).
    Simulation,
}

/// Auxiliary episode information emitted with every step.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeInfo {
    /// Current clock.
    pub time: u64,
    /// Delivery time of the last job, once the episode terminated.
    pub makespan: Option<u64>,
    /// The run is stuck: nothing can ever fire again.
    pub deadlock: bool,
    /// Invalid-action allowance left.
    pub jokers_left: i64,
    /// Scheduling actions taken so far.
    pub actions: u32,
    /// No-op actions taken so far.
    pub no_ops: u32,
    /// Size of the current offer.
    pub possible: usize,
}

/// Result of one external step.
#[derive(Debug, Clone)]
pub struct StepResult<Obs> {
    /// Observation of the new state.
    pub observation: Obs,
    /// Scalar reward.
    pub reward: f64,
    /// All jobs delivered.
    pub terminated: bool,
    /// Horizon, action budget, joker, or deadlock cut the episode.
    pub truncated: bool,
    /// Auxiliary episode information.
    pub info: EpisodeInfo,
}

/// The agent-facing environment.
pub struct ShopFloorEnv<A, O, R> {
    sim: Simulation,
    interpreter: A,
    observer: O,
    scorer: R,
    cursor: usize,
    jokers_left: i64,
    actions: u32,
    no_ops: u32,
    terminated: bool,
    truncated: bool,
    deadlock: bool,
    lower_bound: u64,
    total_operations: usize,
}

impl<A, O, R> ShopFloorEnv<A, O, R>
where
    A: ActionInterpreter,
    O: ObservationBuilder,
    R: RewardScorer,
{
    /// Builds an environment over a validated instance.
    pub fn new(
        instance: Instance,
        config: SimConfig,
        seed: u64,
        interpreter: A,
        observer: O,
        scorer: R,
    ) -> SimResult<Self> {
        let sim = Simulation::new(instance, config, seed)?;
        let lower_bound = bounds::lower_bound(sim.instance());
        let total_operations = sim.instance().total_operations();
        let jokers_left = sim.config().truncation_joker as i64;
        Ok(Self {
            sim,
            interpreter,
            observer,
            scorer,
            cursor: 0,
            jokers_left,
            actions: 0,
            no_ops: 0,
            terminated: false,
            truncated: false,
            deadlock: false,
            lower_bound,
            total_operations,
        })
    }

    /// Resets the episode: fresh state, reseeded RNG, cleared counters.
    ///
    /// Forced events are drained so the first observation already offers a
    /// decision (or reports immediate termination).
    pub fn reset(&mut self) -> SimResult<(O::Observation, EpisodeInfo)> {
        self.sim.reset();
        self.scorer.reset();
        self.cursor = 0;
        self.jokers_left = self.sim.config().truncation_joker as i64;
        self.actions = 0;
        self.no_ops = 0;
        self.terminated = false;
        self.truncated = false;
        self.deadlock = false;
        self.drain_forced()?;
        self.terminated = self.sim.is_done();
        let observation = self.observer.build(self.sim.state(), self.sim.instance());
        Ok((observation, self.info()))
    }

    /// Executes one external step.
    ///
    /// Erroring once the episode is over is deliberate: the caller must
    /// [`ShopFloorEnv::reset`] between episodes.
    pub fn step(&mut self, action: A::Action) -> SimResult<StepResult<O::Observation>> {
        if self.terminated || self.truncated {
            return Err(SimError::invalid_value(
                "episode",
                "episode is over; call reset",
            ));
        }

        let offered_all = self.sim.possible_transitions();
        if self.cursor >= offered_all.len() {
            self.cursor = 0;
        }
        let offered = &offered_all[self.cursor..];
        let possible = offered.len();

        let interpretation =
            self.interpreter
                .interpret(&action, self.sim.state(), self.sim.instance(), offered);

        let mut scheduled = false;
        let mut rejected = false;
        match interpretation {
            Interpretation::NoOp => {
                self.no_ops += 1;
                if possible > 1 {
                    // decline this pairing; offer the next one at the same
                    // instant
                    self.cursor += 1;
                } else {
                    self.cursor = 0;
                    let report = self.sim.step(None)?;
                    if report.deadlocked {
                        self.flag_deadlock();
                    }
                }
            }
            Interpretation::Schedule(transitions) => {
                self.actions += 1;
                self.cursor = 0;
                for transition in transitions {
                    let report = self.sim.step(Some(transition))?;
                    if let Some((transition, reason)) = &report.rejected {
                        warn!(%transition, %reason, "invalid action consumed a joker");
                        rejected = true;
                        self.jokers_left -= 1;
                    } else {
                        scheduled = true;
                    }
                    if report.deadlocked {
                        self.flag_deadlock();
                        break;
                    }
                }
            }
        }

        if !self.deadlock {
            self.drain_forced()?;
        }

        self.terminated = self.sim.is_done();
        self.apply_truncation_rules();

        let summary = StepSummary {
            time: self.sim.state().time,
            scheduled,
            rejected,
            possible,
        };
        let reward = self.scorer.score(
            &summary,
            self.sim.state(),
            self.sim.instance(),
            self.terminated,
            self.truncated,
        );
        let observation = self.observer.build(self.sim.state(), self.sim.instance());
        debug!(
            time = summary.time,
            reward,
            terminated = self.terminated,
            truncated = self.truncated,
            "env step"
        );
        Ok(StepResult {
            observation,
            reward,
            terminated: self.terminated,
            truncated: self.truncated,
            info: self.info(),
        })
    }

    /// Renders the current episode.
    pub fn render(&self, mode: RenderMode) -> SimResult<String> {
        match mode {
            RenderMode::Default => Ok(format!(
                "t={} jobs_done={}/{} actions={} no_ops={} jokers={}",
                self.sim.state().time,
                self.sim
                    .state()
                    .jobs
                    .iter()
                    .filter(|j| self.sim.instance().is_output_buffer(&j.location))
                    .count(),
                self.sim.state().jobs.len(),
                self.actions,
                self.no_ops,
                self.jokers_left,
            )),
            RenderMode::Debug => Ok(self.render_debug()),
            RenderMode::Dashboard | RenderMode::Simulation => Err(SimError::NotImplemented(
                "dashboard and simulation rendering are external surfaces",
            )),
        }
    }

    /// The wrapped engine, for history access and inspection.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Whether the episode terminated (all jobs delivered).
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Whether the episode was truncated.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    fn flag_deadlock(&mut self) {
        warn!("deadlock: truncating episode");
        self.deadlock = true;
        self.truncated = true;
    }

    fn apply_truncation_rules(&mut self) {
        if self.terminated {
            return;
        }
        let config = self.sim.config();
        let time_budget = self.lower_bound as f64 * config.max_time_fct;
        if self.sim.state().time as f64 > time_budget {
            self.truncated = true;
        }
        let action_budget = self.total_operations as f64 * config.max_action_fct;
        if (self.actions + self.no_ops) as f64 > action_budget {
            self.truncated = true;
        }
        if config.truncation_active && self.jokers_left < 0 {
            self.truncated = true;
        }
    }

    /// Advances through forced events until a decision is offered, the
    /// episode ends, or the run deadlocks.
    fn drain_forced(&mut self) -> SimResult<()> {
        for _ in 0..DRAIN_LIMIT {
            if self.sim.is_done() {
                return Ok(());
            }
            if !self.sim.possible_transitions().is_empty() {
                return Ok(());
            }
            let report = self.sim.step(None)?;
            if report.deadlocked {
                self.flag_deadlock();
                return Ok(());
            }
        }
        Err(SimError::InconsistentState(
            "forced-event drain did not converge".into(),
        ))
    }

    fn info(&self) -> EpisodeInfo {
        EpisodeInfo {
            time: self.sim.state().time,
            makespan: if self.terminated {
                Some(self.sim.state().time)
            } else {
                None
            },
            deadlock: self.deadlock,
            jokers_left: self.jokers_left,
            actions: self.actions,
            no_ops: self.no_ops,
            possible: self.sim.possible_transitions().len(),
        }
    }

    fn render_debug(&self) -> String {
        let state = self.sim.state();
        let mut out = String::new();
        out.push_str(&format!("TIME: {}\n", state.time));
        out.push_str("--- Machines ---\n");
        for machine in &state.machines {
            out.push_str(&format!(
                "{}\t{:?}\ttool={:?}\tpre={:?}\tbuf={:?}\tpost={:?}\n",
                machine.id,
                machine.phase,
                machine.current_tool,
                machine.prebuffer.store,
                machine.buffer.store,
                machine.postbuffer.store,
            ));
        }
        out.push_str("--- Transports ---\n");
        for transport in &state.transports {
            out.push_str(&format!(
                "{}\t{:?}\tat={}\tjob={:?}\n",
                transport.id, transport.phase, transport.location, transport.transport_job,
            ));
        }
        out.push_str("--- Jobs ---\n");
        for job in &state.jobs {
            out.push_str(&format!("{}\tat={}\n", job.id, job.location));
            for op in &job.operations {
                out.push_str(&format!(
                    "  {}\t{}\t{:?}\t{:?}..{:?}\n",
                    op.id, op.machine_id, op.status, op.start_time, op.end_time,
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::factories::{BinaryActionInterpreter, MakespanScorer, ProgressObservation};
    use crate::models::{
        JobConfig, MachineConfig, OperationConfig, TransportConfig, INPUT_BUFFER_ID,
        OUTPUT_BUFFER_ID,
    };

    type BinaryEnv = ShopFloorEnv<BinaryActionInterpreter, ProgressObservation, MakespanScorer>;

    fn teleport_env(config: SimConfig) -> BinaryEnv {
        let instance = Instance::new()
            .with_machine(MachineConfig::new("m-0"))
            .with_machine(MachineConfig::new("m-1"))
            .with_job(
                JobConfig::new("j-0")
                    .with_operation(OperationConfig::new("o-00", "m-0", 3))
                    .with_operation(OperationConfig::new("o-01", "m-1", 2)),
            )
            .with_job(
                JobConfig::new("j-1")
                    .with_operation(OperationConfig::new("o-10", "m-1", 2))
                    .with_operation(OperationConfig::new("o-11", "m-0", 4)),
            );
        ShopFloorEnv::new(
            instance,
            config,
            7,
            BinaryActionInterpreter,
            ProgressObservation,
            MakespanScorer::new(),
        )
        .unwrap()
    }

    fn run_accepting(env: &mut BinaryEnv, limit: usize) -> (bool, bool, EpisodeInfo) {
        let (_, mut info) = env.reset().unwrap();
        for _ in 0..limit {
            if env.is_terminated() || env.is_truncated() {
                break;
            }
            let result = env.step(true).unwrap();
            info = result.info;
            if result.terminated || result.truncated {
                return (result.terminated, result.truncated, info);
            }
        }
        (env.is_terminated(), env.is_truncated(), info)
    }

    #[test]
    fn test_accepting_agent_completes_two_by_two() {
        let mut env = teleport_env(SimConfig::default().with_max_action_fct(16.0));
        let (terminated, truncated, info) = run_accepting(&mut env, 300);
        assert!(terminated, "episode should finish: {info:?}");
        assert!(!truncated);
        // classical optimum is 7
        let makespan = info.makespan.unwrap();
        assert!(makespan >= 7, "makespan {makespan} beats the lower bound");
        let out = env
            .simulation()
            .state()
            .buffer(OUTPUT_BUFFER_ID)
            .unwrap()
            .clone();
        assert_eq!(out.store.len(), 2);
    }

    #[test]
    fn test_reset_gives_first_decision() {
        let mut env = teleport_env(SimConfig::default());
        let (observation, info) = env.reset().unwrap();
        assert!(info.possible > 0);
        assert!(!observation.is_empty());
        assert_eq!(info.time, 0);
    }

    #[test]
    fn test_step_after_end_is_an_error() {
        let mut env = teleport_env(SimConfig::default().with_max_action_fct(16.0));
        let (terminated, _, _) = run_accepting(&mut env, 300);
        assert!(terminated);
        assert!(env.step(true).is_err());
    }

    #[test]
    fn test_declining_rotates_then_advances() {
        let mut env = teleport_env(SimConfig::default().with_max_action_fct(50.0));
        let (_, info) = env.reset().unwrap();
        let offers = info.possible;
        assert!(offers >= 2);
        // decline every offer of the instant; time must not move yet
        for _ in 0..offers - 1 {
            let result = env.step(false).unwrap();
            assert_eq!(result.info.time, 0);
        }
        // declining the last one advances the engine
        let result = env.step(false).unwrap();
        assert!(result.info.time >= 1);
    }

    #[test]
    fn test_action_budget_truncates() {
        let mut env = teleport_env(SimConfig::default().with_max_action_fct(0.5));
        let (_, _) = env.reset().unwrap();
        // 4 operations * 0.5 = 2 actions allowed
        let mut truncated = false;
        for _ in 0..10 {
            let result = env.step(false).unwrap();
            if result.truncated {
                truncated = true;
                break;
            }
        }
        assert!(truncated);
    }

    #[test]
    fn test_transport_episode_with_agv() {
        let instance = Instance::new()
            .with_machine(MachineConfig::new("m-0"))
            .with_job(JobConfig::new("j-0").with_operation(OperationConfig::new("o-0", "m-0", 3)))
            .with_transport(TransportConfig::new("t-0", INPUT_BUFFER_ID))
            .with_travel_between(INPUT_BUFFER_ID, "m-0", 2u64)
            .with_travel_between("m-0", OUTPUT_BUFFER_ID, 2u64)
            .with_travel_between(INPUT_BUFFER_ID, OUTPUT_BUFFER_ID, 4u64);
        let mut env: BinaryEnv = ShopFloorEnv::new(
            instance,
            SimConfig::default().with_max_action_fct(20.0),
            3,
            BinaryActionInterpreter,
            ProgressObservation,
            MakespanScorer::new(),
        )
        .unwrap();
        let (terminated, truncated, info) = run_accepting(&mut env, 300);
        assert!(terminated, "AGV episode should finish: {info:?}");
        assert!(!truncated);
        // processing ends at 5, but the makespan is the delivery time:
        // haul 2 to the machine, process 3, haul 2 to the output
        assert_eq!(info.makespan, Some(7));
        let job = env.simulation().state().job("j-0").unwrap();
        assert_eq!(job.operations[0].end_time, Some(5));
    }

    #[test]
    fn test_jokers_absorb_invalid_actions_then_truncate() {
        use crate::env::factories::Interpretation;
        use crate::models::{ComponentTransition, MachinePhase};

        /// Always schedules a transition for a machine that does not exist.
        struct Bogus;
        impl ActionInterpreter for Bogus {
            type Action = ();
            fn interpret(
                &self,
                _action: &(),
                _state: &crate::models::State,
                _instance: &Instance,
                _offered: &[ComponentTransition],
            ) -> Interpretation {
                Interpretation::Schedule(vec![ComponentTransition::machine(
                    "m-9",
                    MachinePhase::Working,
                    Some("j-0".into()),
                )])
            }
        }

        let instance = Instance::new()
            .with_machine(MachineConfig::new("m-0"))
            .with_job(JobConfig::new("j-0").with_operation(OperationConfig::new("o-0", "m-0", 3)));
        let mut env = ShopFloorEnv::new(
            instance,
            SimConfig::default().with_truncation_joker(1),
            0,
            Bogus,
            ProgressObservation,
            MakespanScorer::new(),
        )
        .unwrap();
        let (_, info) = env.reset().unwrap();
        assert_eq!(info.jokers_left, 1);

        // first invalid action burns the joker
        let result = env.step(()).unwrap();
        assert_eq!(result.info.jokers_left, 0);
        assert!(!result.truncated);
        // second one exhausts the allowance
        let result = env.step(()).unwrap();
        assert_eq!(result.info.jokers_left, -1);
        assert!(result.truncated);
    }

    #[test]
    fn test_jokers_ignored_when_truncation_inactive() {
        use crate::env::factories::Interpretation;
        use crate::models::{ComponentTransition, MachinePhase};

        struct Bogus;
        impl ActionInterpreter for Bogus {
            type Action = ();
            fn interpret(
                &self,
                _action: &(),
                _state: &crate::models::State,
                _instance: &Instance,
                _offered: &[ComponentTransition],
            ) -> Interpretation {
                Interpretation::Schedule(vec![ComponentTransition::machine(
                    "m-9",
                    MachinePhase::Working,
                    Some("j-0".into()),
                )])
            }
        }

        let instance = Instance::new()
            .with_machine(MachineConfig::new("m-0"))
            .with_job(JobConfig::new("j-0").with_operation(OperationConfig::new("o-0", "m-0", 3)));
        let mut env = ShopFloorEnv::new(
            instance,
            SimConfig::default()
                .with_truncation_joker(0)
                .with_truncation_active(false)
                .with_max_action_fct(50.0),
            0,
            Bogus,
            ProgressObservation,
            MakespanScorer::new(),
        )
        .unwrap();
        env.reset().unwrap();
        for _ in 0..5 {
            let result = env.step(()).unwrap();
            assert!(!result.truncated);
        }
    }

    #[test]
    fn test_render_modes() {
        let mut env = teleport_env(SimConfig::default());
        env.reset().unwrap();
        assert!(env.render(RenderMode::Default).unwrap().contains("t="));
        assert!(env.render(RenderMode::Debug).unwrap().contains("Machines"));
        assert!(env.render(RenderMode::Dashboard).is_err());
        assert!(env.render(RenderMode::Simulation).is_err());
    }
}
