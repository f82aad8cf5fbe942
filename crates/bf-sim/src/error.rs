//! Error types for simulation runs.

use bf_core::BlockError;
use bf_graph::GraphError;
use thiserror::Error;

/// Errors encountered while running a diagram.
///
/// Runtime errors abort the current run and carry the block, step index and
/// simulated time at which they occurred.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Plan was compiled for diagram revision {compiled}, diagram is at {current}")]
    StalePlan { compiled: u64, current: u64 },

    #[error("Executor is {state}, expected {expected}")]
    InvalidState {
        state: &'static str,
        expected: &'static str,
    },

    /// A block never received all of its inputs during a step.
    #[error("Dead input: {block} port {port} never received a value (step {step}, t={t})")]
    DeadInput {
        block: String,
        port: usize,
        step: usize,
        t: f64,
    },

    /// A block's output, derivative or step failed.
    #[error("Computation failed in {block} [{type_name}] at step {step}, t={t}: {source}")]
    Computation {
        block: String,
        type_name: &'static str,
        step: usize,
        t: f64,
        source: BlockError,
    },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

pub type SimResult<T> = Result<T, SimError>;
