//! Priority dispatch rules for scripted agents and baselines.
//!
//! Rules score jobs (lower = dispatch first); the [`RuleChooser`] applies
//! them to the engine's offered transitions, turning a rule stack into a
//! deterministic scheduling policy. Useful as benchmark heuristics against
//! learned agents and as drivers in tests.
//!
//! # Usage
//!
//! ```
//! use shopsim::dispatching::{rules, RuleChooser};
//!
//! let chooser = RuleChooser::new()
//!     .with_rule(rules::Spt)
//!     .with_rule(rules::Mor);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

mod context;
mod engine;
pub mod rules;

pub use context::DispatchContext;
pub use engine::RuleChooser;

use crate::models::JobState;
use std::fmt::Debug;

/// Score returned by a dispatch rule.
///
/// Lower scores = higher priority (dispatched first), following the
/// academic convention where SPT = shortest processing time first.
pub type RuleScore = f64;

/// A dispatch rule that evaluates job priority.
///
/// # Score Convention
/// **Lower score = higher priority.** Rules return smaller values for
/// jobs that should be dispatched first.
pub trait DispatchRule: Send + Sync + Debug {
    /// Rule name (e.g., "SPT", "MOR").
    fn name(&self) -> &'static str;

    /// Evaluates the priority of a job given the current context.
    fn score(&self, job: &JobState, context: &DispatchContext<'_>) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
