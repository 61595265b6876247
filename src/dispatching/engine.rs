//! Rule chooser: turns a rule stack into a transition-selection policy.
//!
//! Rules are applied in sequence; later rules only break ties of earlier
//! ones. Exhausted ties fall back to lexicographic (component, job) order
//! so the choice is always deterministic.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::models::{ComponentTransition, Instance, State};

use super::{DispatchContext, DispatchRule};

/// A composable dispatch policy over offered transitions.
///
/// # Example
/// ```
/// use shopsim::dispatching::{rules, RuleChooser};
///
/// let chooser = RuleChooser::new()
///     .with_rule(rules::Mor)
///     .with_rule(rules::Spt);
/// ```
#[derive(Clone)]
pub struct RuleChooser {
    rules: Vec<Arc<dyn DispatchRule>>,
    epsilon: f64,
}

impl Default for RuleChooser {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleChooser {
    /// Creates an empty chooser (pure lexicographic fallback).
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            epsilon: 1e-9,
        }
    }

    /// Appends a rule; earlier rules dominate, later ones break ties.
    pub fn with_rule<R: DispatchRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Sorts the offered transitions by policy preference.
    ///
    /// Returns indices into `offered`, best first. Transitions without a
    /// job are ranked behind everything a rule can score.
    pub fn sort_indices(
        &self,
        offered: &[ComponentTransition],
        state: &State,
        instance: &Instance,
    ) -> Vec<usize> {
        let context = DispatchContext::new(state, instance);
        let mut indices: Vec<usize> = (0..offered.len()).collect();
        indices.sort_by(|&a, &b| self.compare(&offered[a], &offered[b], &context));
        indices
    }

    /// The policy's preferred transition, if any are offered.
    pub fn choose(
        &self,
        offered: &[ComponentTransition],
        state: &State,
        instance: &Instance,
    ) -> Option<usize> {
        self.sort_indices(offered, state, instance).first().copied()
    }

    fn job_score(
        &self,
        rule: &Arc<dyn DispatchRule>,
        transition: &ComponentTransition,
        context: &DispatchContext<'_>,
    ) -> f64 {
        transition
            .job_id
            .as_deref()
            .and_then(|id| context.state.job(id))
            .map(|job| rule.score(job, context))
            .unwrap_or(f64::INFINITY)
    }

    fn compare(
        &self,
        a: &ComponentTransition,
        b: &ComponentTransition,
        context: &DispatchContext<'_>,
    ) -> Ordering {
        for rule in &self.rules {
            let score_a = self.job_score(rule, a, context);
            let score_b = self.job_score(rule, b, context);
            if (score_a - score_b).abs() > self.epsilon {
                return score_a.partial_cmp(&score_b).unwrap_or(Ordering::Equal);
            }
        }
        // all rules tied: deterministic lexicographic fallback
        (&a.component_id, &a.job_id).cmp(&(&b.component_id, &b.job_id))
    }
}

impl std::fmt::Debug for RuleChooser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleChooser")
            .field(
                "rules",
                &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
