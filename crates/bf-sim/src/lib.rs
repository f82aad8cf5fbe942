//! Time-stepping executor for compiled block diagrams.
//!
//! Provides:
//! - `Executor`: Idle -> Running -> {Completed, Aborted} state machine
//! - Whole-diagram state integration through the `TransientModel` trait
//! - Fixed-step RK4 (default) and forward Euler integrators
//! - A lazy, finite run stream of per-step sink records
//! - Cooperative cancellation polled at step boundaries

pub mod error;
pub mod executor;
pub mod integrator;
pub mod model;
pub mod sim;

pub use error::{SimError, SimResult};
pub use executor::{DiagramModel, Executor, Run, RunState, StopHandle};
pub use integrator::{ForwardEuler, Integrator, RK4};
pub use model::TransientModel;
pub use sim::{IntegratorType, RunRecord, SimOptions, SinkSample, SinkSeries, StepRecord};
