//! Stateless functions of their inputs.

use bf_core::{BlockError, BlockResult, Value};
use bf_graph::{BlockInfo, FunctionBlock};

use crate::params::Params;

/// Multiplies its input by a scalar gain.
#[derive(Debug, Clone, PartialEq)]
pub struct Gain {
    pub k: f64,
}

impl Gain {
    pub fn new(k: f64) -> Self {
        Self { k }
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Ok(Self::new(p.f64("k")?))
    }
}

impl BlockInfo for Gain {
    fn type_name(&self) -> &'static str {
        "gain"
    }

    fn check(&self) -> BlockResult<()> {
        if !self.k.is_finite() {
            return Err(BlockError::config("gain must be finite"));
        }
        Ok(())
    }
}

impl FunctionBlock for Gain {
    fn nin(&self) -> usize {
        1
    }

    fn output(&self, inputs: &[Value], _t: f64) -> BlockResult<Vec<Value>> {
        Ok(vec![inputs[0].map(|u| self.k * u)])
    }
}

/// Signed sum of its inputs, one input per sign character.
///
/// `"+-"` computes `u0 - u1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sum {
    signs: Vec<f64>,
}

impl Sum {
    pub fn new(signs: &str) -> BlockResult<Self> {
        let signs = signs
            .chars()
            .map(|c| match c {
                '+' => Ok(1.0),
                '-' => Ok(-1.0),
                other => Err(BlockError::config(format!(
                    "sum sign must be '+' or '-', found '{other}'"
                ))),
            })
            .collect::<BlockResult<Vec<_>>>()?;
        Ok(Self { signs })
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Self::new(p.str_or("signs", "++")?)
    }

    pub fn signs(&self) -> &[f64] {
        &self.signs
    }
}

impl BlockInfo for Sum {
    fn type_name(&self) -> &'static str {
        "sum"
    }

    fn check(&self) -> BlockResult<()> {
        if self.signs.is_empty() {
            return Err(BlockError::config("sum needs at least one input"));
        }
        Ok(())
    }
}

impl FunctionBlock for Sum {
    fn nin(&self) -> usize {
        self.signs.len()
    }

    fn output(&self, inputs: &[Value], _t: f64) -> BlockResult<Vec<Value>> {
        let mut acc = inputs[0].map(|u| self.signs[0] * u);
        for (u, &sign) in inputs.iter().zip(&self.signs).skip(1) {
            acc = acc.zip_with(u, |a, b| a + sign * b)?;
        }
        Ok(vec![acc])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProductOp {
    Mul,
    Div,
}

/// Element-wise product and quotient, one input per operator character.
///
/// `"*/"` computes `u0 / u1`. Division by an exact zero is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    ops: Vec<ProductOp>,
}

impl Product {
    pub fn new(ops: &str) -> BlockResult<Self> {
        let ops = ops
            .chars()
            .map(|c| match c {
                '*' => Ok(ProductOp::Mul),
                '/' => Ok(ProductOp::Div),
                other => Err(BlockError::config(format!(
                    "product operator must be '*' or '/', found '{other}'"
                ))),
            })
            .collect::<BlockResult<Vec<_>>>()?;
        Ok(Self { ops })
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Self::new(p.str_or("ops", "**")?)
    }
}

impl BlockInfo for Product {
    fn type_name(&self) -> &'static str {
        "product"
    }

    fn check(&self) -> BlockResult<()> {
        if self.ops.is_empty() {
            return Err(BlockError::config("product needs at least one input"));
        }
        Ok(())
    }
}

impl FunctionBlock for Product {
    fn nin(&self) -> usize {
        self.ops.len()
    }

    fn output(&self, inputs: &[Value], _t: f64) -> BlockResult<Vec<Value>> {
        let mut acc = inputs[0].map(|_| 1.0);
        for (u, op) in inputs.iter().zip(&self.ops) {
            acc = match op {
                ProductOp::Mul => acc.zip_with(u, |a, b| a * b)?,
                ProductOp::Div => {
                    if u.as_slice().contains(&0.0) {
                        return Err(BlockError::computation("division by zero"));
                    }
                    acc.zip_with(u, |a, b| a / b)?
                }
            };
        }
        Ok(vec![acc])
    }
}

/// Clamps its input to `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Saturation {
    pub min: f64,
    pub max: f64,
}

impl Saturation {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Ok(Self::new(
            p.f64_or("min", f64::NEG_INFINITY)?,
            p.f64_or("max", f64::INFINITY)?,
        ))
    }
}

impl BlockInfo for Saturation {
    fn type_name(&self) -> &'static str {
        "saturation"
    }

    fn check(&self) -> BlockResult<()> {
        if self.min.is_nan() || self.max.is_nan() || self.min > self.max {
            return Err(BlockError::config(format!(
                "saturation bounds must satisfy min <= max, got [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl FunctionBlock for Saturation {
    fn nin(&self) -> usize {
        1
    }

    fn output(&self, inputs: &[Value], _t: f64) -> BlockResult<Vec<Value>> {
        Ok(vec![inputs[0].map(|u| u.clamp(self.min, self.max))])
    }
}

/// Concatenates its inputs into one vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Mux {
    pub n: usize,
}

impl Mux {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Ok(Self::new(p.usize_or("n", 2)?))
    }
}

impl BlockInfo for Mux {
    fn type_name(&self) -> &'static str {
        "mux"
    }

    fn check(&self) -> BlockResult<()> {
        if self.n == 0 {
            return Err(BlockError::config("mux needs at least one input"));
        }
        Ok(())
    }
}

impl FunctionBlock for Mux {
    fn nin(&self) -> usize {
        self.n
    }

    fn output(&self, inputs: &[Value], _t: f64) -> BlockResult<Vec<Value>> {
        let joined: Vec<f64> = inputs
            .iter()
            .flat_map(|u| u.as_slice().iter().copied())
            .collect();
        Ok(vec![Value::vector(joined)])
    }
}
