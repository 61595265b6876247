//! Episode quality metrics.
//!
//! Computes standard indicators from a final (or intermediate) state:
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan | Current clock — delivery time of the last job when done |
//! | Utilization | Per-machine busy time / makespan |
//! | Avg Flow Time | Mean completion time of finished jobs |
//! | Completed Jobs | Jobs with every operation done |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::HashMap;

use crate::models::{Instance, State};

/// Episode performance indicators.
#[derive(Debug, Clone)]
pub struct EpisodeKpi {
    /// Clock value the KPIs were computed at.
    pub makespan: u64,
    /// Per-machine utilization (0.0..1.0 of the makespan).
    pub utilization_by_machine: HashMap<String, f64>,
    /// Mean utilization across machines.
    pub avg_utilization: f64,
    /// Mean completion time of jobs with all operations done.
    pub avg_flow_time: f64,
    /// Number of jobs with every operation done.
    pub completed_jobs: usize,
}

impl EpisodeKpi {
    /// Computes KPIs from a state.
    pub fn calculate(state: &State, instance: &Instance) -> Self {
        let makespan = state.time;

        let mut busy: HashMap<String, u64> = HashMap::new();
        for job in &state.jobs {
            for op in &job.operations {
                if let (Some(start), Some(end)) = (op.start_time, op.end_time) {
                    let worked = end.min(makespan).saturating_sub(start);
                    *busy.entry(op.machine_id.clone()).or_insert(0) += worked;
                }
            }
        }

        let utilization_by_machine: HashMap<String, f64> = instance
            .machines
            .iter()
            .map(|m| {
                let load = busy.get(&m.id).copied().unwrap_or(0);
                let share = if makespan == 0 {
                    0.0
                } else {
                    load as f64 / makespan as f64
                };
                (m.id.clone(), share)
            })
            .collect();
        let avg_utilization = if utilization_by_machine.is_empty() {
            0.0
        } else {
            utilization_by_machine.values().sum::<f64>() / utilization_by_machine.len() as f64
        };

        let mut completed_jobs = 0;
        let mut flow_total = 0u64;
        for job in &state.jobs {
            if job.all_operations_done() {
                completed_jobs += 1;
                flow_total += job
                    .operations
                    .iter()
                    .filter_map(|o| o.end_time)
                    .max()
                    .unwrap_or(0);
            }
        }
        let avg_flow_time = if completed_jobs == 0 {
            0.0
        } else {
            flow_total as f64 / completed_jobs as f64
        };

        Self {
            makespan,
            utilization_by_machine,
            avg_utilization,
            avg_flow_time,
            completed_jobs,
        }
    }
}
