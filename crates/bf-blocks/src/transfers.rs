//! Blocks with continuous state.
//!
//! All transfers here are strictly proper: outputs depend on state only, so
//! feedback through them never forms an algebraic loop.

use bf_core::{BlockError, BlockResult, Value};
use bf_graph::{BlockInfo, State, TransferBlock};
use nalgebra::{DMatrix, DVector, RowDVector};

use crate::params::Params;

/// Pure integrator, `dx/dt = u`.
#[derive(Debug, Clone, PartialEq)]
pub struct Integrator {
    pub x0: f64,
}

impl Integrator {
    pub fn new(x0: f64) -> Self {
        Self { x0 }
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Ok(Self::new(p.f64_or("x0", 0.0)?))
    }
}

impl BlockInfo for Integrator {
    fn type_name(&self) -> &'static str {
        "integrator"
    }
}

impl TransferBlock for Integrator {
    fn nin(&self) -> usize {
        1
    }

    fn nstates(&self) -> usize {
        1
    }

    fn initial_state(&self) -> State {
        State::from_element(1, self.x0)
    }

    fn output(&self, x: &State, _t: f64) -> BlockResult<Vec<Value>> {
        Ok(vec![Value::scalar(x[0])])
    }

    fn derivative(&self, _x: &State, inputs: &[Value], _t: f64) -> BlockResult<State> {
        Ok(State::from_element(1, inputs[0].as_scalar()?))
    }
}

/// Single-input single-output linear system given by a transfer function.
///
/// `num` and `den` list polynomial coefficients from the highest power of
/// `s` down. The system is realised in controllable canonical form:
///
/// ```text
/// A = [-a1 -a2 ... -an]    B = [1]    C = [b1 ... bn]
///     [ 1   0  ...   0]        [0]
///     [      ...      ]        [.]
///     [ 0  ...  1    0]        [0]
/// ```
///
/// after normalising `den` to a monic polynomial.
#[derive(Debug, Clone, PartialEq)]
pub struct LtiSiso {
    a: DMatrix<f64>,
    b: DVector<f64>,
    c: RowDVector<f64>,
    x0: DVector<f64>,
}

impl LtiSiso {
    pub fn new(num: &[f64], den: &[f64]) -> BlockResult<Self> {
        let num = trim_leading_zeros(num);
        let den = trim_leading_zeros(den);
        let Some((&lead, rest)) = den.split_first() else {
            return Err(BlockError::config("denominator must be non-zero"));
        };
        let n = rest.len();
        if n == 0 {
            return Err(BlockError::config(
                "denominator must have degree at least 1",
            ));
        }
        if num.len() > n {
            return Err(BlockError::config(format!(
                "transfer function must be strictly proper: numerator degree {} >= denominator degree {n}",
                num.len() - 1
            )));
        }
        if num.iter().chain(den).any(|v| !v.is_finite()) {
            return Err(BlockError::config("coefficients must be finite"));
        }

        let mut a = DMatrix::zeros(n, n);
        for (j, &aj) in rest.iter().enumerate() {
            a[(0, j)] = -aj / lead;
        }
        for i in 1..n {
            a[(i, i - 1)] = 1.0;
        }

        let mut b = DVector::zeros(n);
        b[0] = 1.0;

        // Right-align the numerator: its constant term pairs with x_n.
        let mut c = RowDVector::zeros(n);
        let pad = n - num.len();
        for (j, &bj) in num.iter().enumerate() {
            c[pad + j] = bj / lead;
        }

        Ok(Self {
            a,
            b,
            c,
            x0: DVector::zeros(n),
        })
    }

    pub fn with_initial_state(mut self, x0: &[f64]) -> BlockResult<Self> {
        if x0.len() != self.x0.len() {
            return Err(BlockError::config(format!(
                "initial state has length {}, expected {}",
                x0.len(),
                self.x0.len()
            )));
        }
        self.x0 = DVector::from_column_slice(x0);
        Ok(self)
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        let sys = Self::new(&p.f64_list("num")?, &p.f64_list("den")?)?;
        if p.contains("x0") {
            sys.with_initial_state(&p.f64_list("x0")?)
        } else {
            Ok(sys)
        }
    }

    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }

    pub fn c(&self) -> &RowDVector<f64> {
        &self.c
    }

    /// Steady-state gain `-C A^-1 B`, or `None` when `A` is singular.
    pub fn dc_gain(&self) -> Option<f64> {
        let inv = self.a.clone().try_inverse()?;
        Some(-(&self.c * inv * &self.b)[0])
    }
}

fn trim_leading_zeros(coeffs: &[f64]) -> &[f64] {
    let start = coeffs
        .iter()
        .position(|&v| v != 0.0)
        .unwrap_or(coeffs.len());
    &coeffs[start..]
}

impl BlockInfo for LtiSiso {
    fn type_name(&self) -> &'static str {
        "lti_siso"
    }
}

impl TransferBlock for LtiSiso {
    fn nin(&self) -> usize {
        1
    }

    fn nstates(&self) -> usize {
        self.a.nrows()
    }

    fn initial_state(&self) -> State {
        self.x0.clone()
    }

    fn output(&self, x: &State, _t: f64) -> BlockResult<Vec<Value>> {
        Ok(vec![Value::scalar((&self.c * x)[0])])
    }

    fn derivative(&self, x: &State, inputs: &[Value], _t: f64) -> BlockResult<State> {
        let u = inputs[0].as_scalar()?;
        Ok(&self.a * x + &self.b * u)
    }
}

/// First-order lag with optional rate limit.
///
/// Dynamics: `dx/dt = (u - x) / tau`, clamped to `[-rate_limit, rate_limit]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FirstOrderLag {
    /// Time constant (seconds), must be positive
    pub tau: f64,
    /// Maximum rate of change (1/second)
    pub rate_limit: Option<f64>,
    pub x0: f64,
}

impl FirstOrderLag {
    pub fn new(tau: f64) -> Self {
        Self {
            tau,
            rate_limit: None,
            x0: 0.0,
        }
    }

    pub fn with_rate_limit(mut self, rate_limit: f64) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    pub fn from_params(p: &Params) -> BlockResult<Self> {
        Ok(Self {
            tau: p.f64("tau")?,
            rate_limit: p.opt_f64("rate_limit")?,
            x0: p.f64_or("x0", 0.0)?,
        })
    }

    /// Rate of change for output `x` under command `u`.
    pub fn dxdt(&self, x: f64, u: f64) -> f64 {
        let raw = (u - x) / self.tau;
        match self.rate_limit {
            Some(limit) => raw.clamp(-limit, limit),
            None => raw,
        }
    }
}

impl BlockInfo for FirstOrderLag {
    fn type_name(&self) -> &'static str {
        "first_order_lag"
    }

    fn check(&self) -> BlockResult<()> {
        if !(self.tau > 0.0) {
            return Err(BlockError::config("tau must be positive"));
        }
        if self.rate_limit.is_some_and(|r| !(r > 0.0)) {
            return Err(BlockError::config("rate_limit must be positive"));
        }
        Ok(())
    }
}

impl TransferBlock for FirstOrderLag {
    fn nin(&self) -> usize {
        1
    }

    fn nstates(&self) -> usize {
        1
    }

    fn initial_state(&self) -> State {
        State::from_element(1, self.x0)
    }

    fn output(&self, x: &State, _t: f64) -> BlockResult<Vec<Value>> {
        Ok(vec![Value::scalar(x[0])])
    }

    fn derivative(&self, x: &State, inputs: &[Value], _t: f64) -> BlockResult<State> {
        let u = inputs[0].as_scalar()?;
        Ok(State::from_element(1, self.dxdt(x[0], u)))
    }
}
