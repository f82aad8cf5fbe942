//! Signal sinks.

use std::sync::{Arc, Mutex, MutexGuard};

use bf_core::{BlockError, BlockResult, Value};
use bf_graph::{BlockInfo, SinkBlock};
use tracing::info;

use crate::params::Params;

/// One recorded time point.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub t: f64,
    pub inputs: Vec<Value>,
}

/// Shared view of a recorder's history.
///
/// Clone it before the recorder is moved into a diagram; the history can be
/// read after (or during) a run.
#[derive(Debug, Clone, Default)]
pub struct RecorderHandle(Arc<Mutex<Vec<Sample>>>);

impl RecorderHandle {
    fn lock(&self) -> BlockResult<MutexGuard<'_, Vec<Sample>>> {
        self.0
            .lock()
            .map_err(|_| BlockError::computation("recorder history lock poisoned"))
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.lock().map(|h| h.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().map_or(0, |h| h.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn times(&self) -> Vec<f64> {
        self.lock()
            .map(|h| h.iter().map(|s| s.t).collect())
            .unwrap_or_default()
    }

    /// Scalar series of one input port.
    pub fn port(&self, port: usize) -> Vec<f64> {
        self.lock()
            .map(|h| {
                h.iter()
                    .filter_map(|s| s.inputs.get(port).and_then(|v| v.as_scalar().ok()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Keeps every step's inputs in a shared history.
///
/// Registered as both `recorder` and `scope`.
#[derive(Debug)]
pub struct Recorder {
    nin: usize,
    history: RecorderHandle,
}

impl Recorder {
    pub fn new(nin: usize) -> Self {
        Self {
            nin,
            history: RecorderHandle::default(),
        }
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Ok(Self::new(p.usize_or("nin", 1)?))
    }

    pub fn handle(&self) -> RecorderHandle {
        self.history.clone()
    }
}

impl BlockInfo for Recorder {
    fn type_name(&self) -> &'static str {
        "recorder"
    }

    fn check(&self) -> BlockResult<()> {
        if self.nin == 0 {
            return Err(BlockError::config("recorder needs at least one input"));
        }
        Ok(())
    }

    fn start(&mut self) -> BlockResult<()> {
        self.history.lock()?.clear();
        Ok(())
    }
}

impl SinkBlock for Recorder {
    fn nin(&self) -> usize {
        self.nin
    }

    fn step(&mut self, t: f64, inputs: &[Value]) -> BlockResult<()> {
        self.history.lock()?.push(Sample {
            t,
            inputs: inputs.to_vec(),
        });
        Ok(())
    }
}

/// Logs its inputs every step through `tracing`.
#[derive(Debug, Clone)]
pub struct Print {
    nin: usize,
    prefix: String,
}

impl Print {
    pub fn new(nin: usize) -> Self {
        Self {
            nin,
            prefix: String::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Ok(Self::new(p.usize_or("nin", 1)?).with_prefix(p.str_or("prefix", "")?))
    }
}

impl BlockInfo for Print {
    fn type_name(&self) -> &'static str {
        "print"
    }
}

impl SinkBlock for Print {
    fn nin(&self) -> usize {
        self.nin
    }

    fn step(&mut self, t: f64, inputs: &[Value]) -> BlockResult<()> {
        let values = inputs
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        info!(prefix = %self.prefix, t, "{values}");
        Ok(())
    }
}

/// Discards its inputs.
#[derive(Debug, Clone)]
pub struct Null {
    nin: usize,
}

impl Null {
    pub fn new(nin: usize) -> Self {
        Self { nin }
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Ok(Self::new(p.usize_or("nin", 1)?))
    }
}

impl BlockInfo for Null {
    fn type_name(&self) -> &'static str {
        "null"
    }
}

impl SinkBlock for Null {
    fn nin(&self) -> usize {
        self.nin
    }

    fn step(&mut self, _t: f64, _inputs: &[Value]) -> BlockResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_shares_history() {
        let mut rec = Recorder::new(2);
        let handle = rec.handle();
        rec.step(0.0, &[Value::scalar(1.0), Value::scalar(2.0)])
            .unwrap();
        rec.step(0.5, &[Value::scalar(3.0), Value::scalar(4.0)])
            .unwrap();
        assert_eq!(handle.len(), 2);
        assert_eq!(handle.times(), vec![0.0, 0.5]);
        assert_eq!(handle.port(1), vec![2.0, 4.0]);

        rec.start().unwrap();
        assert!(handle.is_empty());
    }

    #[test]
    fn recorder_rejects_zero_inputs() {
        assert!(Recorder::new(0).check().is_err());
    }
}
