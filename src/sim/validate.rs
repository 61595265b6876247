//! Transition validators and the state invariant audit.
//!
//! [`is_transition_valid`] gates every transition before it reaches a
//! handler; failures are [`SimError::InvalidTransition`] and cost nothing
//! but the transition. [`audit_state`] runs after every engine step and
//! checks the structural invariants; a failure there is
//! [`SimError::InconsistentState`] — a defect in the engine, not in the
//! caller.

use std::collections::HashSet;

use crate::error::{SimError, SimResult};
use crate::models::{
    ComponentTransition, Instance, MachinePhase, OperationStatus, State, TransitionTarget,
    TransportPhase,
};

use super::possible::is_transportable;

/// Checks a transition's preconditions against the current state.
pub fn is_transition_valid(
    state: &State,
    instance: &Instance,
    transition: &ComponentTransition,
) -> SimResult<()> {
    match transition.target {
        TransitionTarget::Machine(target) => {
            validate_machine_transition(state, instance, transition, target)
        }
        TransitionTarget::Transport(target) => {
            validate_transport_transition(state, instance, transition, target)
        }
    }
}

fn validate_machine_transition(
    state: &State,
    instance: &Instance,
    transition: &ComponentTransition,
    target: MachinePhase,
) -> SimResult<()> {
    let id = &transition.component_id;
    let machine = state
        .machine(id)
        .ok_or_else(|| SimError::invalid_transition(id, "machine does not exist"))?;
    let config = instance
        .machine(id)
        .ok_or_else(|| SimError::invalid_transition(id, "machine not in instance"))?;

    match (machine.phase, target) {
        (MachinePhase::Idle, MachinePhase::Setup) | (MachinePhase::Idle, MachinePhase::Working) => {
            let job_id = transition
                .job_id
                .as_deref()
                .ok_or_else(|| SimError::invalid_transition(id, "machine start needs a job"))?;
            let job = state
                .job(job_id)
                .ok_or_else(|| SimError::invalid_transition(id, "job does not exist"))?;
            if !machine.prebuffer.can_pick(config.prebuffer.discipline, job_id) {
                return Err(SimError::invalid_transition(
                    id,
                    format!("job '{job_id}' not at pre-buffer head"),
                ));
            }
            let op = job.next_idle_operation().ok_or_else(|| {
                SimError::invalid_transition(id, "job has no idle operation left")
            })?;
            if op.machine_id != *id {
                return Err(SimError::invalid_transition(
                    id,
                    format!("next operation of '{job_id}' targets '{}'", op.machine_id),
                ));
            }
            let tool = instance.operation(&op.id).and_then(|o| o.tool.clone());
            let needs_setup = match (machine.current_tool.as_deref(), tool.as_deref()) {
                (Some(mounted), Some(required)) => mounted != required,
                _ => false,
            };
            if target == MachinePhase::Setup && !needs_setup {
                return Err(SimError::invalid_transition(
                    id,
                    "tool already mounted; start skips setup",
                ));
            }
            if target == MachinePhase::Working && needs_setup {
                return Err(SimError::invalid_transition(
                    id,
                    "tool change required; start must enter setup",
                ));
            }
            if machine.buffer.is_full(config.buffer.capacity) {
                return Err(SimError::invalid_transition(id, "internal slot occupied"));
            }
            Ok(())
        }
        (MachinePhase::Setup, MachinePhase::Working) => {
            if !machine.occupied_till.is_due(state.time) {
                return Err(SimError::invalid_transition(id, "setup still running"));
            }
            if machine.current_operation.is_none() {
                return Err(SimError::invalid_transition(id, "setup without operation"));
            }
            if machine.buffer.store.is_empty() {
                return Err(SimError::invalid_transition(id, "setup without staged job"));
            }
            Ok(())
        }
        (MachinePhase::Working, MachinePhase::Idle) => {
            if !machine.occupied_till.is_due(state.time) {
                return Err(SimError::invalid_transition(id, "operation still running"));
            }
            let job_id = machine
                .buffer
                .store
                .first()
                .ok_or_else(|| SimError::invalid_transition(id, "no job in internal slot"))?;
            let job = state
                .job(job_id)
                .ok_or_else(|| SimError::invalid_transition(id, "staged job does not exist"))?;
            if job.processing_operation().is_none() {
                return Err(SimError::invalid_transition(
                    id,
                    "no processing operation to complete",
                ));
            }
            if machine.postbuffer.is_full(config.postbuffer.capacity) {
                return Err(SimError::invalid_transition(id, "post-buffer full"));
            }
            Ok(())
        }
        (MachinePhase::Outage, exit) => {
            if !machine.occupied_till.is_due(state.time) {
                return Err(SimError::invalid_transition(id, "outage still running"));
            }
            let resume = machine
                .paused
                .as_ref()
                .map(|p| p.phase)
                .unwrap_or(MachinePhase::Idle);
            if exit != resume {
                return Err(SimError::invalid_transition(
                    id,
                    format!("outage resumes into {resume:?}, not {exit:?}"),
                ));
            }
            Ok(())
        }
        (from, to) => Err(SimError::invalid_transition(
            id,
            format!("machine has no edge {from:?} -> {to:?}"),
        )),
    }
}

fn validate_transport_transition(
    state: &State,
    instance: &Instance,
    transition: &ComponentTransition,
    target: TransportPhase,
) -> SimResult<()> {
    let id = &transition.component_id;
    let transport = state
        .transport(id)
        .ok_or_else(|| SimError::invalid_transition(id, "transport does not exist"))?;

    match (transport.phase, target) {
        (TransportPhase::Idle, TransportPhase::Pickup) => {
            if transport.occupied_till.waiting().is_some() {
                return Err(SimError::invalid_transition(id, "parked on a dependency"));
            }
            let job_id = transition
                .job_id
                .as_deref()
                .ok_or_else(|| SimError::invalid_transition(id, "pickup needs a job"))?;
            if let Some(committed) = transport.transport_job.as_deref() {
                if committed != job_id {
                    return Err(SimError::invalid_transition(
                        id,
                        format!("already committed to '{committed}'"),
                    ));
                }
            }
            let job = state
                .job(job_id)
                .ok_or_else(|| SimError::invalid_transition(id, "job does not exist"))?;
            if state
                .transports
                .iter()
                .any(|t| t.id != *id && t.transport_job.as_deref() == Some(job_id))
            {
                return Err(SimError::invalid_transition(
                    id,
                    format!("job '{job_id}' claimed by another transport"),
                ));
            }
            if !is_transportable(job, instance)? {
                return Err(SimError::invalid_transition(
                    id,
                    format!("job '{job_id}' needs no transport"),
                ));
            }
            Ok(())
        }
        (TransportPhase::Pickup, TransportPhase::Working) => {
            if !transport.occupied_till.is_due(state.time) {
                return Err(SimError::invalid_transition(id, "pickup leg still running"));
            }
            if transport.transport_job.is_none() {
                return Err(SimError::invalid_transition(id, "no committed job to load"));
            }
            Ok(())
        }
        (TransportPhase::Working, TransportPhase::Idle) => {
            if !transport.occupied_till.is_due(state.time) {
                return Err(SimError::invalid_transition(id, "loaded leg still running"));
            }
            let job_id = transport
                .transport_job
                .as_deref()
                .ok_or_else(|| SimError::invalid_transition(id, "nothing on board"))?;
            let job = state
                .job(job_id)
                .ok_or_else(|| SimError::invalid_transition(id, "carried job does not exist"))?;
            // delivery target must be able to accept
            let destination = super::possible::transport_destination(job, instance)?;
            let (buffer_id, capacity) = match instance.machine(&destination) {
                Some(machine) => (machine.prebuffer.id.clone(), machine.prebuffer.capacity),
                None => {
                    let config = instance.buffer(&destination).ok_or_else(|| {
                        SimError::invalid_transition(id, "destination unknown")
                    })?;
                    (config.id.clone(), config.capacity)
                }
            };
            let buffer = state
                .buffer(&buffer_id)
                .ok_or_else(|| SimError::invalid_transition(id, "destination buffer missing"))?;
            if buffer.is_full(capacity) {
                return Err(SimError::invalid_transition(
                    id,
                    format!("destination buffer '{buffer_id}' full"),
                ));
            }
            Ok(())
        }
        (TransportPhase::Outage, TransportPhase::Idle) => {
            if !transport.occupied_till.is_due(state.time) {
                return Err(SimError::invalid_transition(id, "outage still running"));
            }
            Ok(())
        }
        (from, to) => Err(SimError::invalid_transition(
            id,
            format!("transport has no edge {from:?} -> {to:?}"),
        )),
    }
}

/// Structural invariant audit, run after every engine step.
///
/// Violations indicate an engine defect: job conservation, buffer
/// capacity, operation precedence, and single-claim must hold in every
/// emitted state.
pub fn audit_state(state: &State, instance: &Instance) -> SimResult<()> {
    // job conservation: exactly one holder per job, matching its location
    for job in &state.jobs {
        let mut holders: Vec<String> = Vec::new();
        for buffer in state.all_buffers() {
            if buffer.contains(&job.id) {
                holders.push(buffer.id.clone());
            }
        }
        for transport in &state.transports {
            if transport.transport_job.as_deref() == Some(&job.id)
                && job.location == transport.id
            {
                holders.push(transport.id.clone());
            }
        }
        if holders.len() != 1 {
            return Err(SimError::InconsistentState(format!(
                "job '{}' held by {} containers: {holders:?}",
                job.id,
                holders.len()
            )));
        }
        if holders[0] != job.location {
            return Err(SimError::InconsistentState(format!(
                "job '{}' located at '{}' but stored in '{}'",
                job.id, job.location, holders[0]
            )));
        }
    }

    // buffer capacity
    for buffer in state.all_buffers() {
        let capacity = instance
            .buffer(&buffer.id)
            .map(|b| b.capacity)
            .ok_or_else(|| {
                SimError::InconsistentState(format!("buffer '{}' has no config", buffer.id))
            })?;
        if buffer.store.len() > capacity {
            return Err(SimError::InconsistentState(format!(
                "buffer '{}' holds {} > capacity {capacity}",
                buffer.id,
                buffer.store.len()
            )));
        }
    }

    // operation precedence and one running operation per job
    for job in &state.jobs {
        let mut seen_processing = false;
        for (idx, op) in job.operations.iter().enumerate() {
            if op.status == OperationStatus::Processing {
                if seen_processing {
                    return Err(SimError::InconsistentState(format!(
                        "job '{}' has two processing operations",
                        job.id
                    )));
                }
                seen_processing = true;
                if job.operations[..idx].iter().any(|o| !o.is_done()) {
                    return Err(SimError::InconsistentState(format!(
                        "operation '{}' runs before its predecessors finished",
                        op.id
                    )));
                }
            }
        }
    }

    // single claim: jobs on transports, operations on machines
    let mut carried: HashSet<&str> = HashSet::new();
    for transport in &state.transports {
        if let Some(job) = transport.transport_job.as_deref() {
            if transport.phase == TransportPhase::Working && !carried.insert(job) {
                return Err(SimError::InconsistentState(format!(
                    "job '{job}' carried by two transports"
                )));
            }
        }
    }
    let mut claimed_ops: HashSet<&str> = HashSet::new();
    for machine in &state.machines {
        if let Some(op) = machine.current_operation.as_deref() {
            if !claimed_ops.insert(op) {
                return Err(SimError::InconsistentState(format!(
                    "operation '{op}' claimed by two machines"
                )));
            }
        }
    }

    // a working machine is actually working on something
    for machine in &state.machines {
        if machine.phase == MachinePhase::Working
            && (machine.current_operation.is_none() || machine.buffer.store.is_empty())
        {
            return Err(SimError::InconsistentState(format!(
                "machine '{}' working without a claimed operation",
                machine.id
            )));
        }
    }

    // a delivered job never has pending work elsewhere recorded as running
    for job in &state.jobs {
        if instance.is_output_buffer(&job.location) && job.is_running() {
            return Err(SimError::InconsistentState(format!(
                "job '{}' processing while delivered",
                job.id
            )));
        }
    }

    Ok(())
}
