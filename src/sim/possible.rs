//! Possible-transition generation.
//!
//! Enumerates the agent-facing candidates for the current tick: machine
//! starts (pre-buffer head job whose next idle operation targets the
//! machine) and transport pickups (idle transport paired with a
//! transportable job). Forced events — completions, outages, dependency
//! resolutions — are generated by the timing module, not here.

use crate::error::{SimError, SimResult};
use crate::models::{
    ComponentTransition, Instance, JobState, MachinePhase, State, TransportPhase,
};

/// Whether a job is at the given machine from the machine's point of
/// view: staged in its pre-buffer or internal slot, or located there
/// directly. The post-buffer does not count — a job there has left the
/// machine and must be hauled back around for a second visit.
pub fn job_at_machine(job: &JobState, machine_id: &str, instance: &Instance) -> bool {
    if job.location == machine_id {
        return true;
    }
    instance
        .machine(machine_id)
        .map(|m| m.prebuffer.id == job.location || m.buffer.id == job.location)
        .unwrap_or(false)
}

/// Four-case transport decision for a job.
///
/// 1. In an Output-role buffer → not transportable (delivered).
/// 2. All operations done elsewhere → transportable to output.
/// 3. Next idle operation's machine already holds the job → not
///    transportable.
/// 4. Otherwise → transportable to the next operation's machine.
///
/// A job mid-processing is an early-transport candidate for its next
/// operation. An idle job with no idle operation left and work undone is
/// an [`SimError::InconsistentState`].
pub fn is_transportable(job: &JobState, instance: &Instance) -> SimResult<bool> {
    if instance.is_output_buffer(&job.location) {
        return Ok(false);
    }
    if job.all_operations_done() {
        return Ok(true);
    }
    if job.is_running() {
        return Ok(match job.next_idle_operation() {
            Some(op) => !job_at_machine(job, &op.machine_id, instance),
            None => false,
        });
    }
    let next = job.next_idle_operation().ok_or_else(|| {
        SimError::InconsistentState(format!(
            "job '{}' has no idle operation but is not done",
            job.id
        ))
    })?;
    Ok(!job_at_machine(job, &next.machine_id, instance))
}

/// Where a transport must carry the job: the machine of its next idle
/// operation, or the first Output-role buffer once all operations are done.
pub fn transport_destination(job: &JobState, instance: &Instance) -> SimResult<String> {
    match job.next_idle_operation() {
        Some(op) => Ok(op.machine_id.clone()),
        None => instance
            .output_buffer()
            .map(|b| b.id.clone())
            .ok_or_else(|| SimError::invalid_value(&job.id, "no output buffer to deliver into")),
    }
}

/// Whether the job sits at the head position of a pickable buffer.
///
/// Jobs being processed, waiting in a machine's internal slot, or buried
/// behind other jobs are not ready; committing to them anyway is an early
/// transport.
pub fn is_ready_for_pickup(job: &JobState, state: &State, instance: &Instance) -> bool {
    if job.is_running() {
        return false;
    }
    let Some(buffer) = state.buffer(&job.location) else {
        return false;
    };
    let Some(config) = instance.buffer(&job.location) else {
        return false;
    };
    buffer.can_pick(config.discipline, &job.id)
}

/// Machine-start candidates: idle machines whose pre-buffer head job has
/// an idle operation targeting them next. The target phase is `Setup` when
/// a tool change is needed and `Working` otherwise.
pub fn machine_start_transitions(state: &State, instance: &Instance) -> Vec<ComponentTransition> {
    let mut transitions = Vec::new();
    for machine in &state.machines {
        if machine.phase != MachinePhase::Idle {
            continue;
        }
        let Some(config) = instance.machine(&machine.id) else {
            continue;
        };
        let Some(head) = machine.prebuffer.head(config.prebuffer.discipline) else {
            continue;
        };
        let Some(job) = state.job(head) else {
            continue;
        };
        let Some(op) = job.next_idle_operation() else {
            continue;
        };
        if op.machine_id != machine.id {
            continue;
        }
        let tool = instance.operation(&op.id).and_then(|o| o.tool.clone());
        let needs_setup = match (machine.current_tool.as_deref(), tool.as_deref()) {
            (Some(mounted), Some(required)) => mounted != required,
            _ => false,
        };
        let phase = if needs_setup {
            MachinePhase::Setup
        } else {
            MachinePhase::Working
        };
        transitions.push(ComponentTransition::machine(
            &machine.id,
            phase,
            Some(job.id.clone()),
        ));
    }
    transitions
}

/// Transport-pickup candidates: every free transport paired with every
/// unclaimed transportable job. With `allow_early_transport = false`,
/// jobs not at the head of a pickable buffer are filtered out.
pub fn transport_pickup_transitions(
    state: &State,
    instance: &Instance,
    allow_early_transport: bool,
) -> Vec<ComponentTransition> {
    let claimed: Vec<&str> = state
        .transports
        .iter()
        .filter_map(|t| t.transport_job.as_deref())
        .collect();

    let mut haulable: Vec<&JobState> = Vec::new();
    for job in &state.jobs {
        if claimed.contains(&job.id.as_str()) {
            continue;
        }
        if !is_transportable(job, instance).unwrap_or(false) {
            continue;
        }
        if !allow_early_transport && !is_ready_for_pickup(job, state, instance) {
            continue;
        }
        haulable.push(job);
    }

    let mut transitions = Vec::new();
    for transport in &state.transports {
        if !transport.is_free() {
            continue;
        }
        for job in &haulable {
            transitions.push(ComponentTransition::transport(
                &transport.id,
                TransportPhase::Pickup,
                Some(job.id.clone()),
            ));
        }
    }
    transitions
}

/// The agent-facing candidate set for the current tick: machine starts
/// first, then transport pickups, each in stable component order.
pub fn possible_transitions(
    state: &State,
    instance: &Instance,
    allow_early_transport: bool,
) -> Vec<ComponentTransition> {
    let mut transitions = machine_start_transitions(state, instance);
    transitions.extend(transport_pickup_transitions(
        state,
        instance,
        allow_early_transport,
    ));
    transitions
}

/// Jobs a transport-less instance moves instantly: every transportable,
/// non-running job. Buffer ordering is bypassed — teleportation treats
/// every buffer as FLEX.
pub fn teleportable_jobs(state: &State, instance: &Instance) -> Vec<String> {
    state
        .jobs
        .iter()
        .filter(|j| !j.is_running())
        .filter(|j| is_transportable(j, instance).unwrap_or(false))
        .map(|j| j.id.clone())
        .collect()
}
