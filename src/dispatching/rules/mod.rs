//! Standard priority dispatch rules.
//!
//! | Rule | Picks the job with… |
//! |------|---------------------|
//! | [`Spt`] | shortest next-operation processing time |
//! | [`Lpt`] | longest next-operation processing time |
//! | [`Srpt`] | shortest remaining processing time |
//! | [`Lrpt`] | longest remaining processing time |
//! | [`Lor`] | fewest operations remaining |
//! | [`Mor`] | most operations remaining |
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use crate::models::JobState;

use super::{DispatchContext, DispatchRule, RuleScore};

/// Shortest processing time: dispatch the job whose next idle operation
/// is quickest.
#[derive(Debug, Clone, Copy)]
pub struct Spt;

impl DispatchRule for Spt {
    fn name(&self) -> &'static str {
        "SPT"
    }

    fn score(&self, job: &JobState, context: &DispatchContext<'_>) -> RuleScore {
        match job.next_idle_operation() {
            Some(op) => context.nominal_duration(&op.id) as f64,
            None => f64::INFINITY,
        }
    }

    fn description(&self) -> &'static str {
        "Shortest processing time of the next operation"
    }
}

/// Longest processing time: the mirror of [`Spt`].
#[derive(Debug, Clone, Copy)]
pub struct Lpt;

impl DispatchRule for Lpt {
    fn name(&self) -> &'static str {
        "LPT"
    }

    fn score(&self, job: &JobState, context: &DispatchContext<'_>) -> RuleScore {
        -Spt.score(job, context)
    }

    fn description(&self) -> &'static str {
        "Longest processing time of the next operation"
    }
}

/// Shortest remaining processing time across all idle operations.
#[derive(Debug, Clone, Copy)]
pub struct Srpt;

impl DispatchRule for Srpt {
    fn name(&self) -> &'static str {
        "SRPT"
    }

    fn score(&self, job: &JobState, context: &DispatchContext<'_>) -> RuleScore {
        context.remaining_work(&job.id) as f64
    }

    fn description(&self) -> &'static str {
        "Shortest remaining processing time"
    }
}

/// Longest remaining processing time: the mirror of [`Srpt`].
#[derive(Debug, Clone, Copy)]
pub struct Lrpt;

impl DispatchRule for Lrpt {
    fn name(&self) -> &'static str {
        "LRPT"
    }

    fn score(&self, job: &JobState, context: &DispatchContext<'_>) -> RuleScore {
        -Srpt.score(job, context)
    }

    fn description(&self) -> &'static str {
        "Longest remaining processing time"
    }
}

/// Least operations remaining.
#[derive(Debug, Clone, Copy)]
pub struct Lor;

impl DispatchRule for Lor {
    fn name(&self) -> &'static str {
        "LOR"
    }

    fn score(&self, job: &JobState, _context: &DispatchContext<'_>) -> RuleScore {
        job.idle_operation_count() as f64
    }

    fn description(&self) -> &'static str {
        "Least operations remaining"
    }
}

/// Most operations remaining.
#[derive(Debug, Clone, Copy)]
pub struct Mor;

impl DispatchRule for Mor {
    fn name(&self) -> &'static str {
        "MOR"
    }

    fn score(&self, job: &JobState, context: &DispatchContext<'_>) -> RuleScore {
        -Lor.score(job, context)
    }

    fn description(&self) -> &'static str {
        "Most operations remaining"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Instance, JobConfig, MachineConfig, OperationConfig, State};

    fn fixture() -> (Instance, State) {
        let instance = Instance::new()
            .with_machine(MachineConfig::new("m-0"))
            .with_machine(MachineConfig::new("m-1"))
            .with_job(
                JobConfig::new("j-short")
                    .with_operation(OperationConfig::new("o-s0", "m-0", 1)),
            )
            .with_job(
                JobConfig::new("j-long")
                    .with_operation(OperationConfig::new("o-l0", "m-0", 9))
                    .with_operation(OperationConfig::new("o-l1", "m-1", 9)),
            )
            .with_default_buffers();
        let state = State::initial(&instance);
        (instance, state)
    }

    #[test]
    fn test_spt_prefers_quick_operation() {
        let (instance, state) = fixture();
        let ctx = DispatchContext::new(&state, &instance);
        let short = Spt.score(state.job("j-short").unwrap(), &ctx);
        let long = Spt.score(state.job("j-long").unwrap(), &ctx);
        assert!(short < long);
    }

    #[test]
    fn test_lpt_mirrors_spt() {
        let (instance, state) = fixture();
        let ctx = DispatchContext::new(&state, &instance);
        let short = Lpt.score(state.job("j-short").unwrap(), &ctx);
        let long = Lpt.score(state.job("j-long").unwrap(), &ctx);
        assert!(long < short);
    }

    #[test]
    fn test_srpt_sums_remaining_work() {
        let (instance, state) = fixture();
        let ctx = DispatchContext::new(&state, &instance);
        assert!((Srpt.score(state.job("j-long").unwrap(), &ctx) - 18.0).abs() < 1e-9);
        assert!((Srpt.score(state.job("j-short").unwrap(), &ctx) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_operation_count_rules() {
        let (instance, state) = fixture();
        let ctx = DispatchContext::new(&state, &instance);
        let short = state.job("j-short").unwrap();
        let long = state.job("j-long").unwrap();
        assert!(Lor.score(short, &ctx) < Lor.score(long, &ctx));
        assert!(Mor.score(long, &ctx) < Mor.score(short, &ctx));
    }

    #[test]
    fn test_finished_job_scores_last_for_spt() {
        let (instance, mut state) = fixture();
        for op in state.jobs[0].operations.iter_mut() {
            op.status = crate::models::OperationStatus::Done;
        }
        let ctx = DispatchContext::new(&state, &instance);
        assert!(Spt.score(&state.jobs[0], &ctx).is_infinite());
    }
}
