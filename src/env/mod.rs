//! Agent-facing environment layer.
//!
//! Wraps the engine behind the stable RL loop contract —
//! `reset() -> (observation, info)`,
//! `step(action) -> (observation, reward, terminated, truncated, info)`,
//! `render(mode)` — with the action/observation/reward seams declared as
//! traits and canonical implementations provided.

mod factories;
mod kpi;
mod middleware;

pub use factories::{
    ActionInterpreter, BinaryActionInterpreter, Interpretation, MakespanScorer,
    ObservationBuilder, ProgressObservation, RewardScorer, StepSummary,
};
pub use kpi::EpisodeKpi;
pub use middleware::{EpisodeInfo, RenderMode, ShopFloorEnv, StepResult};
