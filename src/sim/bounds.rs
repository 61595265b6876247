//! Makespan bounds for truncation horizons and reward scaling.
//!
//! # Reference
//! Taillard (1993), "Benchmarks for basic scheduling problems"

use std::collections::HashMap;

use crate::models::Instance;

/// Lower bound on the makespan of an instance.
///
/// Per-machine bound after Taillard: for machine *i* with total load `T_i`,
/// head `b_i` (the smallest work any job does before reaching *i*) and tail
/// `a_i` (the smallest work after leaving *i*), the makespan is at least
/// `b_i + T_i + a_i`. The final bound is the maximum over machines and
/// over total job durations. Nominal durations are used throughout so the
/// bound never consumes randomness.
pub fn lower_bound(instance: &Instance) -> u64 {
    let mut machine_load: HashMap<&str, u64> = HashMap::new();
    let mut machine_head: HashMap<&str, u64> = HashMap::new();
    let mut machine_tail: HashMap<&str, u64> = HashMap::new();
    let mut max_job_duration: u64 = 0;

    for job in &instance.jobs {
        let durations: Vec<u64> = job.operations.iter().map(|o| o.duration.nominal()).collect();
        let total: u64 = durations.iter().sum();
        max_job_duration = max_job_duration.max(total);

        let mut before: u64 = 0;
        for (op, duration) in job.operations.iter().zip(&durations) {
            let after = total - before - duration;
            let machine = op.machine.as_str();
            *machine_load.entry(machine).or_insert(0) += duration;
            machine_head
                .entry(machine)
                .and_modify(|h| *h = (*h).min(before))
                .or_insert(before);
            machine_tail
                .entry(machine)
                .and_modify(|t| *t = (*t).min(after))
                .or_insert(after);
            before += duration;
        }
    }

    let machine_bound = machine_load
        .iter()
        .map(|(machine, load)| {
            machine_head.get(machine).copied().unwrap_or(0)
                + load
                + machine_tail.get(machine).copied().unwrap_or(0)
        })
        .max()
        .unwrap_or(0);

    machine_bound.max(max_job_duration)
}

/// Worst-case horizon: the sum of all nominal operation durations.
///
/// A schedule without gross mistakes never exceeds this; truncation and
/// reward normalization use it as the far end of the time scale.
pub fn max_allowed_time(instance: &Instance) -> u64 {
    instance
        .jobs
        .iter()
        .flat_map(|j| j.operations.iter())
        .map(|o| o.duration.nominal())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobConfig, MachineConfig, OperationConfig};

    /// j0: (m0,3)(m1,2); j1: (m1,2)(m0,4) — the classical 2x2 with LB 7.
    fn two_by_two() -> Instance {
        Instance::new()
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
            )
            .with_default_buffers()
    }

    #[test]
    fn test_two_by_two_lower_bound() {
        // m-0 carries 3 + 4 = 7 with zero head (j-0 starts there) and zero
        // tail (j-1 ends there); job totals are 5 and 6
        assert_eq!(lower_bound(&two_by_two()), 7);
    }

    #[test]
    fn test_max_allowed_time_is_total_work() {
        assert_eq!(max_allowed_time(&two_by_two()), 11);
    }

    #[test]
    fn test_single_job_bound_is_its_duration() {
        let instance = Instance::new()
            .with_machine(MachineConfig::new("m-0"))
            .with_machine(MachineConfig::new("m-1"))
            .with_job(
                JobConfig::new("j-0")
                    .with_operation(OperationConfig::new("o-0", "m-0", 5))
                    .with_operation(OperationConfig::new("o-1", "m-1", 5)),
            )
            .with_default_buffers();
        assert_eq!(lower_bound(&instance), 10);
    }

    #[test]
    fn test_empty_instance() {
        let instance = Instance::new().with_default_buffers();
        assert_eq!(lower_bound(&instance), 0);
        assert_eq!(max_allowed_time(&instance), 0);
    }

    #[test]
    fn test_head_tail_tightening() {
        // one machine in the middle of both jobs: head and tail both 1
        let instance = Instance::new()
            .with_machine(MachineConfig::new("m-0"))
            .with_machine(MachineConfig::new("m-1"))
            .with_machine(MachineConfig::new("m-2"))
            .with_job(
                JobConfig::new("j-0")
                    .with_operation(OperationConfig::new("o-00", "m-0", 1))
                    .with_operation(OperationConfig::new("o-01", "m-1", 4))
                    .with_operation(OperationConfig::new("o-02", "m-2", 1)),
            )
            .with_job(
                JobConfig::new("j-1")
                    .with_operation(OperationConfig::new("o-10", "m-0", 1))
                    .with_operation(OperationConfig::new("o-11", "m-1", 4))
                    .with_operation(OperationConfig::new("o-12", "m-2", 1)),
            )
            .with_default_buffers();
        // m-1: head 1 + load 8 + tail 1 = 10
        assert_eq!(lower_bound(&instance), 10);
    }
}
