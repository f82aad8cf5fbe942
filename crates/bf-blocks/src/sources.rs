//! Signal sources: blocks whose outputs depend on time alone.

use std::f64::consts::TAU;

use bf_core::{BlockError, BlockResult, Value};
use bf_graph::{BlockInfo, SourceBlock};

use crate::params::Params;

/// Constant output, scalar or vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub value: Value,
}

impl Constant {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Ok(Self::new(p.value_or("value", Value::scalar(0.0))?))
    }
}

impl BlockInfo for Constant {
    fn type_name(&self) -> &'static str {
        "constant"
    }

    fn check(&self) -> BlockResult<()> {
        if !self.value.is_finite() {
            return Err(BlockError::config("constant value must be finite"));
        }
        Ok(())
    }
}

impl SourceBlock for Constant {
    fn output(&self, _t: f64) -> BlockResult<Vec<Value>> {
        Ok(vec![self.value.clone()])
    }
}

/// Switches from `off` to `on` at time `t_step`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub t_step: f64,
    pub off: f64,
    pub on: f64,
}

impl Step {
    /// Unit step at `t_step`.
    pub fn new(t_step: f64) -> Self {
        Self {
            t_step,
            off: 0.0,
            on: 1.0,
        }
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Ok(Self {
            t_step: p.f64_or("t", 1.0)?,
            off: p.f64_or("off", 0.0)?,
            on: p.f64_or("on", 1.0)?,
        })
    }
}

impl BlockInfo for Step {
    fn type_name(&self) -> &'static str {
        "step"
    }
}

impl SourceBlock for Step {
    fn output(&self, t: f64) -> BlockResult<Vec<Value>> {
        let y = if t >= self.t_step { self.on } else { self.off };
        Ok(vec![Value::scalar(y)])
    }
}

/// `offset + slope * (t - t_start)` once `t >= t_start`, `offset` before.
#[derive(Debug, Clone, PartialEq)]
pub struct Ramp {
    pub t_start: f64,
    pub slope: f64,
    pub offset: f64,
}

impl Ramp {
    pub fn new(slope: f64) -> Self {
        Self {
            t_start: 0.0,
            slope,
            offset: 0.0,
        }
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Ok(Self {
            t_start: p.f64_or("t", 0.0)?,
            slope: p.f64_or("slope", 1.0)?,
            offset: p.f64_or("offset", 0.0)?,
        })
    }
}

impl BlockInfo for Ramp {
    fn type_name(&self) -> &'static str {
        "ramp"
    }
}

impl SourceBlock for Ramp {
    fn output(&self, t: f64) -> BlockResult<Vec<Value>> {
        let y = self.offset + self.slope * (t - self.t_start).max(0.0);
        Ok(vec![Value::scalar(y)])
    }
}

/// `amplitude * sin(2*pi*freq*t + phase) + offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sine {
    pub amplitude: f64,
    /// Frequency (Hz)
    pub freq: f64,
    /// Phase (rad)
    pub phase: f64,
    pub offset: f64,
}

impl Sine {
    pub fn new(amplitude: f64, freq: f64) -> Self {
        Self {
            amplitude,
            freq,
            phase: 0.0,
            offset: 0.0,
        }
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Ok(Self {
            amplitude: p.f64_or("amplitude", 1.0)?,
            freq: p.f64_or("freq", 1.0)?,
            phase: p.f64_or("phase", 0.0)?,
            offset: p.f64_or("offset", 0.0)?,
        })
    }
}

impl BlockInfo for Sine {
    fn type_name(&self) -> &'static str {
        "sine"
    }

    fn check(&self) -> BlockResult<()> {
        if self.freq < 0.0 {
            return Err(BlockError::config("sine frequency must be non-negative"));
        }
        Ok(())
    }
}

impl SourceBlock for Sine {
    fn output(&self, t: f64) -> BlockResult<Vec<Value>> {
        let y = self.amplitude * (TAU * self.freq * t + self.phase).sin() + self.offset;
        Ok(vec![Value::scalar(y)])
    }
}

/// Emits the simulation time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Clock;

impl BlockInfo for Clock {
    fn type_name(&self) -> &'static str {
        "clock"
    }
}

impl SourceBlock for Clock {
    fn output(&self, t: f64) -> BlockResult<Vec<Value>> {
        Ok(vec![Value::scalar(t)])
    }
}
