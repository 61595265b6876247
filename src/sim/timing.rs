//! Time advancement: next-event computation, due completions and outages,
//! and the time-dependency resolver.
//!
//! The engine never ticks through empty time: it jumps the clock straight
//! to the earliest point where something changes — a phase runs out, an
//! outage comes due, or a start is waiting to be applied now.

use crate::models::{
    ComponentTransition, Instance, MachinePhase, PendingOutage, State, TransportPhase,
};

/// Earliest tick at which a forced event fires, if any.
///
/// Considers every busy component with a concrete deadline and every
/// pending outage whose component could accept it. Components parked on a
/// time dependency have no deadline; the resolver releases them instead.
pub fn next_event_time(state: &State) -> Option<u64> {
    let now = state.time;
    let mut earliest: Option<u64> = None;
    let mut consider = |t: u64| {
        let t = t.max(now);
        earliest = Some(earliest.map_or(t, |e| e.min(t)));
    };

    for machine in &state.machines {
        if machine.phase != MachinePhase::Idle {
            if let Some(t) = machine.occupied_till.until() {
                consider(t);
            }
        }
    }
    for transport in &state.transports {
        // busy legs, and committed-but-idle transports retrying a pickup
        if transport.phase != TransportPhase::Idle || transport.transport_job.is_some() {
            if let Some(t) = transport.occupied_till.until() {
                consider(t);
            }
        }
    }
    for pending in &state.pending_outages {
        // a component that cannot accept its outage yet contributes its
        // next idle window through the completion candidates instead
        if outage_can_fire(state, pending) {
            consider(pending.at);
        }
    }
    earliest
}

/// Whether a pending outage may enter right now.
///
/// Machines accept outages in any phase but a running outage; transports
/// only while idle, free, and not parked on a dependency.
fn outage_can_fire(state: &State, pending: &PendingOutage) -> bool {
    if let Some(machine) = state.machine(&pending.component_id) {
        return machine.phase != MachinePhase::Outage;
    }
    if let Some(transport) = state.transport(&pending.component_id) {
        return transport.is_free();
    }
    false
}

/// Pending outages due at the current clock, in stable component order.
pub fn due_outages(state: &State) -> Vec<PendingOutage> {
    let mut due: Vec<PendingOutage> = state
        .pending_outages
        .iter()
        .filter(|p| p.is_due(state.time) && outage_can_fire(state, p))
        .cloned()
        .collect();
    due.sort_by(|a, b| {
        a.component_id
            .cmp(&b.component_id)
            .then(a.schedule_idx.cmp(&b.schedule_idx))
    });
    due
}

/// Completion transitions due at the current clock.
///
/// Machines come before transports so a finished job lands in its
/// post-buffer before a transport completion tries to haul it away; within
/// each group the order is stable by component position.
pub fn timed_transitions(state: &State) -> Vec<ComponentTransition> {
    let now = state.time;
    let mut transitions = Vec::new();

    for machine in &state.machines {
        if !machine.occupied_till.is_due(now) {
            continue;
        }
        let job = machine.buffer.store.first().cloned();
        match machine.phase {
            MachinePhase::Setup => transitions.push(ComponentTransition::machine(
                &machine.id,
                MachinePhase::Working,
                job,
            )),
            MachinePhase::Working => transitions.push(ComponentTransition::machine(
                &machine.id,
                MachinePhase::Idle,
                job,
            )),
            MachinePhase::Outage => {
                let resume = machine
                    .paused
                    .as_ref()
                    .map(|p| p.phase)
                    .unwrap_or(MachinePhase::Idle);
                transitions.push(ComponentTransition::machine(&machine.id, resume, job));
            }
            MachinePhase::Idle => {}
        }
    }

    for transport in &state.transports {
        if !transport.occupied_till.is_due(now) {
            continue;
        }
        let job = transport.transport_job.clone();
        match transport.phase {
            TransportPhase::Pickup => transitions.push(ComponentTransition::transport(
                &transport.id,
                TransportPhase::Working,
                job,
            )),
            TransportPhase::Working => transitions.push(ComponentTransition::transport(
                &transport.id,
                TransportPhase::Idle,
                job,
            )),
            TransportPhase::Outage => transitions.push(ComponentTransition::transport(
                &transport.id,
                TransportPhase::Idle,
                None,
            )),
            // committed but never departed: retry the pickup request
            TransportPhase::Idle => {
                if let Some(job) = job {
                    transitions.push(ComponentTransition::transport(
                        &transport.id,
                        TransportPhase::Pickup,
                        Some(job),
                    ));
                }
            }
        }
    }

    transitions
}

/// Transports whose time dependency has resolved, with the transition each
/// one deferred.
///
/// Resolution conditions, checked against the current state:
/// - **R1** — the blocking job no longer sits at the head of the buffer;
/// - **R2** — some other transport is carrying the blocking job.
pub fn resolved_dependencies(
    state: &State,
    instance: &Instance,
) -> Vec<(String, ComponentTransition)> {
    let mut resolved = Vec::new();
    for transport in &state.transports {
        let Some(dep) = transport.occupied_till.waiting() else {
            continue;
        };
        let moved_off_head = match (
            state.buffer(&dep.buffer_id),
            instance.buffer(&dep.buffer_id),
        ) {
            (Some(buffer), Some(config)) => {
                buffer.head(config.discipline) != Some(dep.blocking_job.as_str())
            }
            // buffer vanished: treat as resolved and let validation decide
            _ => true,
        };
        let handled_elsewhere = state.transports.iter().any(|t| {
            t.id != transport.id && t.transport_job.as_deref() == Some(dep.blocking_job.as_str())
        });
        if moved_off_head || handled_elsewhere {
            resolved.push((transport.id.clone(), (*dep.deferred).clone()));
        }
    }
    resolved
}
