//! Deterministic, event-driven job-shop simulation core for
//! reinforcement-learning research.
//!
//! Models machines (setup / processing / outage phases), AGV transports,
//! jobs of totally ordered operations, and disciplined buffers. An
//! immutable [`models::State`] value advances by applying validated
//! component transitions; impossible-yet-legal pickups defer on time
//! dependencies until they become feasible.
//!
//! # Modules
//!
//! - **`models`**: Value types — [`models::Instance`], [`models::State`],
//!   machines, transports, jobs, buffers, outages, transitions
//! - **`validation`**: Structural instance checks before simulation
//! - **`sim`**: The engine — [`sim::Simulation`] with handlers,
//!   validators, possible-transition generation, and time advancement
//! - **`dispatching`**: Priority rules (SPT, MOR, …) for scripted agents
//! - **`env`**: The agent loop surface — [`env::ShopFloorEnv`] plus the
//!   action / observation / reward factory traits
//! - **`error`**: Crate-wide error taxonomy
//!
//! # Example
//!
//! ```
//! use shopsim::env::{
//!     BinaryActionInterpreter, MakespanScorer, ProgressObservation, ShopFloorEnv,
//! };
//! use shopsim::models::{Instance, JobConfig, MachineConfig, OperationConfig};
//! use shopsim::sim::SimConfig;
//!
//! let instance = Instance::new()
//!     .with_machine(MachineConfig::new("m-0"))
//!     .with_job(JobConfig::new("j-0").with_operation(OperationConfig::new("o-0", "m-0", 5)));
//!
//! let mut env = ShopFloorEnv::new(
//!     instance,
//!     SimConfig::default(),
//!     42,
//!     BinaryActionInterpreter,
//!     ProgressObservation,
//!     MakespanScorer::new(),
//! )
//! .unwrap();
//!
//! let (_observation, info) = env.reset().unwrap();
//! assert!(info.possible > 0);
//! while !env.is_terminated() && !env.is_truncated() {
//!     env.step(true).unwrap();
//! }
//! assert!(env.is_terminated());
//! ```
//!
//! # Determinism
//!
//! Given the same instance, configuration, seed, and action sequence,
//! two runs produce bit-identical histories. All stochastic durations
//! draw from one seeded RNG in a fixed advancement order.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Law & Kelton (2000), "Simulation Modeling and Analysis"
//! - Sutton & Barto (2018), "Reinforcement Learning: An Introduction"

pub mod dispatching;
pub mod env;
pub mod error;
pub mod models;
pub mod sim;
pub mod validation;

pub use error::{SimError, SimResult};
pub use models::{ComponentTransition, Instance, State};
pub use sim::{SimConfig, Simulation};
