//! Outage model: scheduled unavailability of machines and transports.
//!
//! An outage schedule pairs a frequency source (how long the component
//! stays available between outages) with a duration source (how long the
//! outage lasts). The engine pre-samples each schedule into a
//! [`PendingOutage`] carried in the state; when the clock passes its due
//! tick, an outage transition fires with highest priority, and the
//! schedule is resampled on exit.
//!
//! The kind tag is informational only — it drives rendering and logging,
//! never mechanics.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::duration::TimeSource;

/// Informational classification of an outage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutageKind {
    /// Planned maintenance window.
    Maintenance,
    /// Unplanned breakdown.
    Fail,
    /// Battery / energy recharge (transports).
    Recharge,
}

/// Static description of an outage schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutageConfig {
    /// Informational kind tag.
    pub kind: OutageKind,
    /// Available time between outages.
    pub frequency: TimeSource,
    /// Length of one outage.
    pub duration: TimeSource,
}

impl OutageConfig {
    /// Creates an outage schedule.
    pub fn new(kind: OutageKind, frequency: TimeSource, duration: TimeSource) -> Self {
        Self {
            kind,
            frequency,
            duration,
        }
    }

    /// Fixed-interval, fixed-length schedule.
    pub fn periodic(kind: OutageKind, every: u64, lasting: u64) -> Self {
        Self::new(kind, TimeSource::fixed(every), TimeSource::fixed(lasting))
    }
}

/// A pre-sampled upcoming outage for one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOutage {
    /// Component the outage hits.
    pub component_id: String,
    /// Index of the schedule on that component's config.
    pub schedule_idx: usize,
    /// Tick at which the outage becomes due.
    pub at: u64,
    /// Sampled outage length.
    pub duration: u64,
    /// Informational kind tag, copied from the schedule.
    pub kind: OutageKind,
}

impl PendingOutage {
    /// Samples the next occurrence of a schedule, counting from `from`.
    pub fn sample<R: Rng>(
        component_id: &str,
        schedule_idx: usize,
        config: &OutageConfig,
        from: u64,
        rng: &mut R,
    ) -> Self {
        Self {
            component_id: component_id.to_string(),
            schedule_idx,
            at: from + config.frequency.sample(rng),
            duration: config.duration.sample(rng),
            kind: config.kind,
        }
    }

    /// Whether the outage is due at `now`.
    pub fn is_due(&self, now: u64) -> bool {
        self.at <= now
    }
}
