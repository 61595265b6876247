//! Transition handlers.
//!
//! Each handler is a pure function from a state (plus instance and RNG) to
//! a new state. Handlers assume their preconditions were checked by the
//! validators; they still re-check anything whose violation would corrupt
//! the state and report it as [`SimError::InvalidTransition`].
//!
//! Stochastic durations are sampled here, exactly once, at the moment the
//! phase begins.

use rand::rngs::SmallRng;
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::models::{
    put_in_buffer, remove_from_buffer, ComponentTransition, Instance, MachinePhase, Occupied,
    OperationStatus, PausedWork, PendingOutage, State, TimeDependency, TransitionTarget,
    TransportPhase,
};

use super::possible::{teleportable_jobs, transport_destination};

/// Routes a transition to its handler based on the component's current
/// phase and the requested target.
pub fn apply_transition(
    state: &State,
    instance: &Instance,
    transition: &ComponentTransition,
    rng: &mut SmallRng,
) -> SimResult<State> {
    debug!(transition = %transition, time = state.time, "applying transition");
    match transition.target {
        TransitionTarget::Machine(target) => {
            let machine = state.machine(&transition.component_id).ok_or_else(|| {
                SimError::invalid_value(&transition.component_id, "machine not found")
            })?;
            match (machine.phase, target) {
                (MachinePhase::Idle, MachinePhase::Setup) => {
                    machine_begin_setup(state, instance, transition, rng)
                }
                (MachinePhase::Idle, MachinePhase::Working) => {
                    let staged = machine_stage_job(state, instance, transition)?;
                    machine_begin_work(&staged, instance, &transition.component_id, rng)
                }
                (MachinePhase::Setup, MachinePhase::Working) => {
                    machine_begin_work(state, instance, &transition.component_id, rng)
                }
                (MachinePhase::Working, MachinePhase::Idle) => {
                    machine_complete(state, instance, &transition.component_id)
                }
                (MachinePhase::Outage, _) => {
                    machine_end_outage(state, instance, &transition.component_id, rng)
                }
                (from, to) => Err(SimError::invalid_transition(
                    &transition.component_id,
                    format!("machine cannot go {from:?} -> {to:?}"),
                )),
            }
        }
        TransitionTarget::Transport(target) => {
            let transport = state.transport(&transition.component_id).ok_or_else(|| {
                SimError::invalid_value(&transition.component_id, "transport not found")
            })?;
            match (transport.phase, target) {
                (TransportPhase::Idle, TransportPhase::Pickup) => {
                    transport_begin_pickup(state, instance, transition, rng)
                }
                (TransportPhase::Pickup, TransportPhase::Working) => {
                    transport_load(state, instance, &transition.component_id, rng)
                }
                (TransportPhase::Working, TransportPhase::Idle) => {
                    transport_deliver(state, instance, &transition.component_id)
                }
                (TransportPhase::Outage, TransportPhase::Idle) => {
                    transport_end_outage(state, instance, &transition.component_id, rng)
                }
                (from, to) => Err(SimError::invalid_transition(
                    &transition.component_id,
                    format!("transport cannot go {from:?} -> {to:?}"),
                )),
            }
        }
    }
}

/// Moves the named job from the pre-buffer into the machine's internal
/// slot and claims its next idle operation. Shared by the setup entry and
/// the direct (tool-free) work start.
fn machine_stage_job(
    state: &State,
    instance: &Instance,
    transition: &ComponentTransition,
) -> SimResult<State> {
    let machine_id = &transition.component_id;
    let job_id = transition.job_id.as_deref().ok_or_else(|| {
        SimError::invalid_transition(machine_id, "machine start carries no job")
    })?;
    let machine = state
        .machine(machine_id)
        .ok_or_else(|| SimError::invalid_value(machine_id, "machine not found"))?
        .clone();
    let config = instance
        .machine(machine_id)
        .ok_or_else(|| SimError::invalid_value(machine_id, "machine config not found"))?;
    let job = state
        .job(job_id)
        .ok_or_else(|| SimError::invalid_value(job_id, "job not found"))?
        .clone();

    if !machine
        .prebuffer
        .can_pick(config.prebuffer.discipline, job_id)
    {
        return Err(SimError::invalid_transition(
            machine_id,
            format!("job '{job_id}' is not at the pre-buffer head"),
        ));
    }
    let op = job
        .next_idle_operation()
        .ok_or_else(|| SimError::invalid_transition(machine_id, "job has no idle operation"))?;
    if op.machine_id != *machine_id {
        return Err(SimError::invalid_transition(
            machine_id,
            format!("operation '{}' targets machine '{}'", op.id, op.machine_id),
        ));
    }
    let op_id = op.id.clone();

    let prebuffer = remove_from_buffer(&machine.prebuffer, job_id)?;
    let (buffer, job) = put_in_buffer(&machine.buffer, &config.buffer, &job)?;

    let mut machine = machine;
    machine.prebuffer = prebuffer;
    machine.buffer = buffer;
    machine.current_operation = Some(op_id);

    Ok(state.with_machine(machine).with_job(job))
}

/// Machine `Idle -> Setup`: stage the job and run the tool change.
fn machine_begin_setup(
    state: &State,
    instance: &Instance,
    transition: &ComponentTransition,
    rng: &mut SmallRng,
) -> SimResult<State> {
    let machine_id = &transition.component_id;
    let state = machine_stage_job(state, instance, transition)?;
    let mut machine = state
        .machine(machine_id)
        .ok_or_else(|| SimError::InconsistentState("staged machine disappeared".into()))?
        .clone();
    let config = instance
        .machine(machine_id)
        .ok_or_else(|| SimError::invalid_value(machine_id, "machine config not found"))?;

    let op_id = machine
        .current_operation
        .clone()
        .ok_or_else(|| SimError::InconsistentState("staged machine lost its operation".into()))?;
    let tool = instance.operation(&op_id).and_then(|o| o.tool.clone());

    let setup = config
        .setup_duration(machine.current_tool.as_deref(), tool.as_deref())
        .ok_or_else(|| {
            SimError::invalid_value(
                machine_id,
                format!(
                    "no setup time from {:?} to {:?}",
                    machine.current_tool, tool
                ),
            )
        })?;
    let duration = setup.sample(rng);

    machine.phase = MachinePhase::Setup;
    machine.occupied_till = Occupied::Until(state.time + duration);
    if tool.is_some() {
        machine.current_tool = tool;
    }

    Ok(state.with_machine(machine))
}

/// Machine `Setup -> Working` (or the tail of a direct start): begin
/// processing the claimed operation.
fn machine_begin_work(
    state: &State,
    instance: &Instance,
    machine_id: &str,
    rng: &mut SmallRng,
) -> SimResult<State> {
    let mut machine = state
        .machine(machine_id)
        .ok_or_else(|| SimError::invalid_value(machine_id, "machine not found"))?
        .clone();
    let op_id = machine.current_operation.clone().ok_or_else(|| {
        SimError::invalid_transition(machine_id, "no operation claimed for work start")
    })?;
    let op_config = instance
        .operation(&op_id)
        .ok_or_else(|| SimError::invalid_value(&op_id, "operation config not found"))?;
    let job_id = machine
        .buffer
        .store
        .first()
        .cloned()
        .ok_or_else(|| SimError::invalid_transition(machine_id, "internal buffer is empty"))?;
    let job = state
        .job(&job_id)
        .ok_or_else(|| SimError::invalid_value(&job_id, "job not found"))?;

    let duration = op_config.duration.sample(rng);
    let mut op = job
        .operations
        .iter()
        .find(|o| o.id == op_id)
        .ok_or_else(|| SimError::invalid_value(&op_id, "operation not on job"))?
        .clone();
    op.status = OperationStatus::Processing;
    op.start_time = Some(state.time);
    op.end_time = Some(state.time + duration);

    machine.phase = MachinePhase::Working;
    machine.occupied_till = Occupied::Until(state.time + duration);
    // a free first mount still counts as mounted for later tool changes
    if op_config.tool.is_some() {
        machine.current_tool = op_config.tool.clone();
    }

    Ok(state.with_job(job.with_operation(op)).with_machine(machine))
}

/// Machine `Working -> Idle`: finish the operation and park the job in the
/// post-buffer.
fn machine_complete(state: &State, instance: &Instance, machine_id: &str) -> SimResult<State> {
    let mut machine = state
        .machine(machine_id)
        .ok_or_else(|| SimError::invalid_value(machine_id, "machine not found"))?
        .clone();
    let config = instance
        .machine(machine_id)
        .ok_or_else(|| SimError::invalid_value(machine_id, "machine config not found"))?;
    let job_id = machine
        .buffer
        .store
        .first()
        .cloned()
        .ok_or_else(|| SimError::invalid_transition(machine_id, "internal buffer is empty"))?;
    let job = state
        .job(&job_id)
        .ok_or_else(|| SimError::invalid_value(&job_id, "job not found"))?
        .clone();
    let mut op = job
        .processing_operation()
        .ok_or_else(|| SimError::invalid_transition(machine_id, "no processing operation"))?
        .clone();

    op.status = OperationStatus::Done;
    op.end_time = Some(state.time);
    let job = job.with_operation(op);

    let buffer = remove_from_buffer(&machine.buffer, &job_id)?;
    let (postbuffer, job) = put_in_buffer(&machine.postbuffer, &config.postbuffer, &job)?;

    machine.buffer = buffer;
    machine.postbuffer = postbuffer;
    machine.phase = MachinePhase::Idle;
    machine.current_operation = None;
    machine.occupied_till = Occupied::Until(state.time);

    Ok(state.with_machine(machine).with_job(job))
}

/// Outage entry for any component named by a due [`PendingOutage`].
///
/// Working or setting-up machines pause: the remaining work is carried in
/// [`PausedWork`] and the running operation's end time slides by the
/// outage duration. The next occurrence of the schedule is pre-sampled
/// counting from the outage's end, which serializes overlapping schedules.
pub fn begin_outage(
    state: &State,
    instance: &Instance,
    pending: &PendingOutage,
    rng: &mut SmallRng,
) -> SimResult<State> {
    let now = state.time;
    let outage_end = now + pending.duration;

    let mut next = if let Some(machine) = state.machine(&pending.component_id) {
        let mut machine = machine.clone();
        if machine.phase == MachinePhase::Outage {
            return Err(SimError::invalid_transition(
                &pending.component_id,
                "already in outage",
            ));
        }
        let mut next = state.clone();
        if matches!(machine.phase, MachinePhase::Working | MachinePhase::Setup) {
            let remaining = machine
                .occupied_till
                .until()
                .unwrap_or(now)
                .saturating_sub(now);
            machine.paused = Some(PausedWork {
                phase: machine.phase,
                remaining,
            });
            // a paused operation finishes later by exactly the outage
            if machine.phase == MachinePhase::Working {
                if let Some(job_id) = machine.buffer.store.first() {
                    if let Some(job) = next.job(job_id) {
                        if let Some(op) = job.processing_operation() {
                            let mut op = op.clone();
                            op.end_time = Some(outage_end + remaining);
                            let job = job.with_operation(op);
                            next = next.with_job(job);
                        }
                    }
                }
            }
        }
        machine.phase = MachinePhase::Outage;
        machine.occupied_till = Occupied::Until(outage_end);
        next.with_machine(machine)
    } else if let Some(transport) = state.transport(&pending.component_id) {
        let mut transport = transport.clone();
        if transport.phase != TransportPhase::Idle {
            return Err(SimError::invalid_transition(
                &pending.component_id,
                "transport outage requires idle phase",
            ));
        }
        transport.phase = TransportPhase::Outage;
        transport.occupied_till = Occupied::Until(outage_end);
        state.with_transport(transport)
    } else {
        return Err(SimError::invalid_value(
            &pending.component_id,
            "component not found",
        ));
    };

    // consume this occurrence and pre-sample the next one from the end of
    // the outage
    next.pending_outages.retain(|p| {
        !(p.component_id == pending.component_id && p.schedule_idx == pending.schedule_idx)
    });
    if let Some(schedule) = outage_schedule(instance, &pending.component_id, pending.schedule_idx) {
        next.pending_outages.push(PendingOutage::sample(
            &pending.component_id,
            pending.schedule_idx,
            schedule,
            outage_end,
            rng,
        ));
    }
    Ok(next)
}

fn outage_schedule<'a>(
    instance: &'a Instance,
    component_id: &str,
    schedule_idx: usize,
) -> Option<&'a crate::models::OutageConfig> {
    if let Some(machine) = instance.machine(component_id) {
        return machine.outages.get(schedule_idx);
    }
    instance
        .transport(component_id)
        .and_then(|t| t.outages.get(schedule_idx))
}

/// Machine `Outage -> (resumed phase | Idle)`.
fn machine_end_outage(
    state: &State,
    _instance: &Instance,
    machine_id: &str,
    _rng: &mut SmallRng,
) -> SimResult<State> {
    let mut machine = state
        .machine(machine_id)
        .ok_or_else(|| SimError::invalid_value(machine_id, "machine not found"))?
        .clone();
    match machine.paused.take() {
        Some(paused) => {
            machine.phase = paused.phase;
            machine.occupied_till = Occupied::Until(state.time + paused.remaining);
        }
        None => {
            machine.phase = MachinePhase::Idle;
            machine.occupied_till = Occupied::Until(state.time);
        }
    }
    Ok(state.with_machine(machine))
}

/// Transport `Outage -> Idle`.
fn transport_end_outage(
    state: &State,
    _instance: &Instance,
    transport_id: &str,
    _rng: &mut SmallRng,
) -> SimResult<State> {
    let mut transport = state
        .transport(transport_id)
        .ok_or_else(|| SimError::invalid_value(transport_id, "transport not found"))?
        .clone();
    transport.phase = TransportPhase::Idle;
    transport.occupied_till = Occupied::Until(state.time);
    Ok(state.with_transport(transport))
}

/// Transport `Idle -> Pickup`: commit to a job and drive to it.
///
/// When the job sits in a buffer but not at its head position, no leg
/// starts; instead the transport parks on a [`TimeDependency`] naming the
/// current head as the blocker, with this very transition deferred. The
/// phase stays `Idle` — committed, not yet moving.
fn transport_begin_pickup(
    state: &State,
    instance: &Instance,
    transition: &ComponentTransition,
    rng: &mut SmallRng,
) -> SimResult<State> {
    let transport_id = &transition.component_id;
    let job_id = transition.job_id.as_deref().ok_or_else(|| {
        SimError::invalid_transition(transport_id, "pickup carries no job")
    })?;
    let mut transport = state
        .transport(transport_id)
        .ok_or_else(|| SimError::invalid_value(transport_id, "transport not found"))?
        .clone();
    let job = state
        .job(job_id)
        .ok_or_else(|| SimError::invalid_value(job_id, "job not found"))?;

    if let Some(other) = state
        .transports
        .iter()
        .find(|t| t.id != *transport_id && t.transport_job.as_deref() == Some(job_id))
    {
        return Err(SimError::invalid_transition(
            transport_id,
            format!("job '{job_id}' already claimed by '{}'", other.id),
        ));
    }

    // ordering check at request time: a buried job defers the whole leg
    if !job.is_running() {
        if let (Some(buffer), Some(config)) =
            (state.buffer(&job.location), instance.buffer(&job.location))
        {
            if !buffer.can_pick(config.discipline, job_id) {
                let blocking = buffer
                    .head(config.discipline)
                    .ok_or_else(|| {
                        SimError::InconsistentState(format!(
                            "buffer '{}' blocks '{job_id}' while empty",
                            buffer.id
                        ))
                    })?
                    .to_string();
                let blocker_handled = state.transports.iter().any(|t| {
                    t.id != *transport_id && t.transport_job.as_deref() == Some(blocking.as_str())
                });
                transport.transport_job = Some(job_id.to_string());
                if blocker_handled {
                    // the blocker is being hauled away: the wait collapses
                    // to a retried pickup attempt at the next tick
                    debug!(
                        transport = transport_id,
                        job = job_id,
                        blocking = %blocking,
                        "blocker in transit, retrying next tick"
                    );
                    transport.occupied_till = Occupied::Until(state.time + 1);
                } else {
                    debug!(
                        transport = transport_id,
                        job = job_id,
                        blocking = %blocking,
                        "pickup deferred on time dependency"
                    );
                    transport.occupied_till = Occupied::Waiting(TimeDependency {
                        blocking_job: blocking,
                        buffer_id: buffer.id.clone(),
                        deferred: Box::new(transition.clone()),
                    });
                }
                return Ok(state.with_transport(transport));
            }
        }
    }

    let pickup_point = instance.pickup_location(&job.location);
    let travel = instance
        .travel_duration(&transport.location, &pickup_point)
        .ok_or_else(|| {
            SimError::invalid_value(
                transport_id,
                format!("no travel time from '{}' to '{pickup_point}'", transport.location),
            )
        })?;
    let duration = travel.sample(rng);

    transport.phase = TransportPhase::Pickup;
    transport.transport_job = Some(job_id.to_string());
    transport.occupied_till = Occupied::Until(state.time + duration);
    Ok(state.with_transport(transport))
}

/// Transport `Pickup -> Working`: load the job and start the loaded leg.
///
/// Early arrivals wait in place: a still-processing job extends the pickup
/// phase to the operation's end; a buried job parks the transport on a
/// time dependency with the load deferred.
fn transport_load(
    state: &State,
    instance: &Instance,
    transport_id: &str,
    rng: &mut SmallRng,
) -> SimResult<State> {
    let mut transport = state
        .transport(transport_id)
        .ok_or_else(|| SimError::invalid_value(transport_id, "transport not found"))?
        .clone();
    let job_id = transport.transport_job.clone().ok_or_else(|| {
        SimError::invalid_transition(transport_id, "no job committed for loading")
    })?;
    let job = state
        .job(&job_id)
        .ok_or_else(|| SimError::invalid_value(&job_id, "job not found"))?
        .clone();

    // arrived before the job finished processing: hold the pickup phase
    if let Some(op) = job.processing_operation() {
        let until = op.end_time.unwrap_or(state.time).max(state.time);
        transport.occupied_till = Occupied::Until(until.max(state.time + 1));
        debug!(transport = transport_id, job = %job_id, until, "early arrival, holding pickup");
        return Ok(state.with_transport(transport));
    }

    let buffer = state
        .buffer(&job.location)
        .ok_or_else(|| {
            SimError::invalid_transition(
                transport_id,
                format!("job '{job_id}' is not in a buffer"),
            )
        })?
        .clone();
    let config = instance
        .buffer(&job.location)
        .ok_or_else(|| SimError::invalid_value(&job.location, "buffer config not found"))?;

    if !buffer.can_pick(config.discipline, &job_id) {
        let blocking = buffer
            .head(config.discipline)
            .ok_or_else(|| {
                SimError::InconsistentState(format!(
                    "buffer '{}' blocks '{job_id}' while empty",
                    buffer.id
                ))
            })?
            .to_string();
        let blocker_handled = state.transports.iter().any(|t| {
            t.id != *transport_id && t.transport_job.as_deref() == Some(blocking.as_str())
        });
        if blocker_handled {
            transport.occupied_till = Occupied::Until(state.time + 1);
        } else {
            transport.occupied_till = Occupied::Waiting(TimeDependency {
                blocking_job: blocking,
                buffer_id: buffer.id.clone(),
                deferred: Box::new(ComponentTransition::transport(
                    transport_id,
                    TransportPhase::Working,
                    Some(job_id.clone()),
                )),
            });
        }
        return Ok(state.with_transport(transport));
    }

    let pickup_point = instance.pickup_location(&buffer.id);
    let source = remove_from_buffer(&buffer, &job_id)?;
    let job = job.at_location(transport_id);

    let destination = transport_destination(&job, instance)?;
    let travel = instance
        .travel_duration(&pickup_point, &destination)
        .ok_or_else(|| {
            SimError::invalid_value(
                transport_id,
                format!("no travel time from '{pickup_point}' to '{destination}'"),
            )
        })?;
    let duration = travel.sample(rng);

    transport.phase = TransportPhase::Working;
    transport.location = pickup_point;
    transport.occupied_till = Occupied::Until(state.time + duration);

    Ok(state
        .with_buffer(source)
        .with_job(job)
        .with_transport(transport))
}

/// Transport `Working -> Idle`: deliver the job at its destination.
fn transport_deliver(state: &State, instance: &Instance, transport_id: &str) -> SimResult<State> {
    let mut transport = state
        .transport(transport_id)
        .ok_or_else(|| SimError::invalid_value(transport_id, "transport not found"))?
        .clone();
    let job_id = transport.transport_job.clone().ok_or_else(|| {
        SimError::invalid_transition(transport_id, "no job on board for delivery")
    })?;
    let job = state
        .job(&job_id)
        .ok_or_else(|| SimError::invalid_value(&job_id, "job not found"))?
        .clone();

    let destination = transport_destination(&job, instance)?;
    let (target_buffer_id, target_config) = match instance.machine(&destination) {
        Some(machine) => (machine.prebuffer.id.clone(), machine.prebuffer.clone()),
        None => {
            let config = instance
                .buffer(&destination)
                .ok_or_else(|| SimError::invalid_value(&destination, "destination not found"))?;
            (config.id.clone(), config.clone())
        }
    };
    let target = state
        .buffer(&target_buffer_id)
        .ok_or_else(|| SimError::invalid_value(&target_buffer_id, "buffer state not found"))?;

    let (filled, job) = put_in_buffer(target, &target_config, &job)?;

    transport.phase = TransportPhase::Idle;
    transport.transport_job = None;
    transport.location = destination;
    transport.occupied_till = Occupied::Until(state.time);

    Ok(state
        .with_buffer(filled)
        .with_job(job)
        .with_transport(transport))
}

/// Releases a transport from a resolved time dependency so its deferred
/// transition can re-validate as if freshly requested.
pub fn release_dependency(state: &State, transport_id: &str) -> SimResult<State> {
    let mut transport = state
        .transport(transport_id)
        .ok_or_else(|| SimError::invalid_value(transport_id, "transport not found"))?
        .clone();
    if transport.occupied_till.waiting().is_none() {
        return Err(SimError::invalid_transition(
            transport_id,
            "no dependency to release",
        ));
    }
    transport.occupied_till = Occupied::Until(state.time);
    // commitment stays: the deferred transition re-claims the job
    if transport.phase == TransportPhase::Idle {
        transport.transport_job = None;
    }
    Ok(state.with_transport(transport))
}

/// Moves every teleportable job straight to its destination.
///
/// Used by transport-less instances: the logistics layer degenerates to
/// instant, capacity-checked moves that bypass buffer ordering.
pub fn apply_teleport_moves(state: &State, instance: &Instance) -> SimResult<(State, usize)> {
    let mut next = state.clone();
    let mut moved = 0;
    for job_id in teleportable_jobs(state, instance) {
        let job = next
            .job(&job_id)
            .ok_or_else(|| SimError::invalid_value(&job_id, "job not found"))?
            .clone();
        let destination = transport_destination(&job, instance)?;
        let (target_buffer_id, target_config) = match instance.machine(&destination) {
            Some(machine) => (machine.prebuffer.id.clone(), machine.prebuffer.clone()),
            None => {
                let config = instance.buffer(&destination).ok_or_else(|| {
                    SimError::invalid_value(&destination, "destination not found")
                })?;
                (config.id.clone(), config.clone())
            }
        };
        let Some(source) = next.buffer(&job.location).cloned() else {
            continue;
        };
        let target = next
            .buffer(&target_buffer_id)
            .cloned()
            .ok_or_else(|| SimError::invalid_value(&target_buffer_id, "buffer state not found"))?;
        if target.is_full(target_config.capacity) {
            continue;
        }
        let source = remove_from_buffer(&source, &job_id)?;
        let (filled, job) = put_in_buffer(&target, &target_config, &job)?;
        next = next.with_buffer(source).with_buffer(filled).with_job(job);
        moved += 1;
    }
    Ok((next, moved))
}
