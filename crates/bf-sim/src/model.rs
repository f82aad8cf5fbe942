//! TransientModel trait for pluggable dynamic systems.

use crate::error::SimResult;

/// A dynamic system the integrators can advance.
///
/// The diagram executor implements this over the concatenated state of every
/// transfer block; tests implement it directly for closed-form systems.
pub trait TransientModel {
    type State: Clone;

    /// State at the start of a run.
    fn initial_state(&self) -> Self::State;

    /// Compute the state derivative `dx/dt = f(t, x)`.
    ///
    /// Takes `&mut self` because evaluating a diagram writes its wires and
    /// input buffers.
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Add two states element-wise: result = a + b.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// Scale a state by a scalar: result = scale * a.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;
}
