//! Run options and result records.

use bf_core::{BlockId, Value};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Integrator selection for simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorType {
    /// 4th-order Runge-Kutta (default, 4 diagram evaluations per step).
    #[default]
    Rk4,
    /// Forward Euler (1st-order, 1 diagram evaluation per step).
    ForwardEuler,
}

/// Options for simulation runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    /// Fixed time step (seconds)
    pub dt: f64,
    /// Final simulation time (seconds)
    pub t_end: f64,
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
    /// Record every N-th step in `RunRecord` (decimation)
    pub record_every: usize,
    pub integrator: IntegratorType,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            dt: 1e-3,
            t_end: 1.0,
            max_steps: 1_000_000,
            record_every: 1,
            integrator: IntegratorType::default(),
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if !(self.t_end.is_finite() && self.t_end >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "t_end must be non-negative",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if self.record_every == 0 {
            return Err(SimError::InvalidArg {
                what: "record_every must be positive",
            });
        }
        Ok(())
    }

    /// Number of integration steps a run performs.
    pub fn steps(&self) -> usize {
        bf_core::step_count(self.t_end, self.dt).min(self.max_steps)
    }
}

/// Inputs delivered to one sink during a step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SinkSample {
    pub block: BlockId,
    pub inputs: Vec<Value>,
}

/// One element of the run stream.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepRecord {
    pub step: usize,
    pub t: f64,
    /// Sinks in execution order.
    pub sinks: Vec<SinkSample>,
}

/// Time series of one sink's inputs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SinkSeries {
    pub block: BlockId,
    pub label: String,
    /// One entry per recorded time point, one value per input port.
    pub values: Vec<Vec<Value>>,
}

impl SinkSeries {
    /// Scalar series of one input port, skipping non-scalar samples.
    pub fn port(&self, port: usize) -> Vec<f64> {
        self.values
            .iter()
            .filter_map(|v| v.get(port).and_then(|x| x.as_scalar().ok()))
            .collect()
    }
}

/// Accumulated history of a completed run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunRecord {
    /// Recorded time points (seconds)
    pub t: Vec<f64>,
    pub sinks: Vec<SinkSeries>,
    /// Total steps evaluated, including unrecorded ones.
    pub steps: usize,
}

impl RunRecord {
    pub fn sink(&self, block: BlockId) -> Option<&SinkSeries> {
        self.sinks.iter().find(|s| s.block == block)
    }

    pub(crate) fn push(&mut self, record: StepRecord) {
        self.t.push(record.t);
        for sample in record.sinks {
            if let Some(series) = self.sinks.iter_mut().find(|s| s.block == sample.block) {
                series.values.push(sample.inputs);
            }
        }
    }
}
