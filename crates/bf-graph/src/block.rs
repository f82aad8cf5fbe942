//! Block capability contract.
//!
//! Blocks are the processing elements of a diagram. Every block belongs to
//! exactly one of four classes:
//! - **Source**: no inputs, outputs depend on time (step, ramp, hardware)
//! - **Function**: stateless map from inputs to outputs
//! - **Transfer**: owns an integrable state vector; outputs depend on state only
//! - **Sink**: consumes inputs and produces an external side effect
//!
//! Concrete blocks implement [`BlockInfo`] plus the trait for their class and
//! are wrapped in a [`Block`] before being added to a diagram.

use core::fmt;

use bf_core::{BlockResult, Value};

use crate::State;

/// The four block classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockClass {
    Source,
    Function,
    Transfer,
    Sink,
}

impl BlockClass {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockClass::Source => "source",
            BlockClass::Function => "function",
            BlockClass::Transfer => "transfer",
            BlockClass::Sink => "sink",
        }
    }
}

impl fmt::Display for BlockClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour shared by every block class.
pub trait BlockInfo {
    /// Type tag, e.g. `"gain"` or `"lti_siso"`.
    fn type_name(&self) -> &'static str;

    /// Validate block parameters. Called during compile.
    fn check(&self) -> BlockResult<()> {
        Ok(())
    }

    /// Called once at the start of every run, after the engine reset.
    fn start(&mut self) -> BlockResult<()> {
        Ok(())
    }

    /// Called once when a run ends, whether it completed or aborted.
    fn done(&mut self) -> BlockResult<()> {
        Ok(())
    }
}

/// Blocks that generate signals from time alone.
pub trait SourceBlock: BlockInfo {
    fn nout(&self) -> usize {
        1
    }

    fn output(&self, t: f64) -> BlockResult<Vec<Value>>;
}

/// Stateless blocks mapping inputs to outputs.
pub trait FunctionBlock: BlockInfo {
    fn nin(&self) -> usize;

    fn nout(&self) -> usize {
        1
    }

    fn output(&self, inputs: &[Value], t: f64) -> BlockResult<Vec<Value>>;
}

/// Blocks with continuous state.
///
/// Outputs are computed from the state alone (strictly proper dynamics), so a
/// feedback loop through a transfer block is never a same-step dependency.
pub trait TransferBlock: BlockInfo {
    fn nin(&self) -> usize;

    fn nout(&self) -> usize {
        1
    }

    fn nstates(&self) -> usize;

    /// Initial condition `x0`.
    fn initial_state(&self) -> State;

    fn output(&self, x: &State, t: f64) -> BlockResult<Vec<Value>>;

    /// State derivative `dx/dt = f(x, u, t)`.
    fn derivative(&self, x: &State, inputs: &[Value], t: f64) -> BlockResult<State>;
}

/// Blocks that consume signals.
pub trait SinkBlock: BlockInfo {
    fn nin(&self) -> usize {
        1
    }

    /// Consume the inputs of one completed step.
    fn step(&mut self, t: f64, inputs: &[Value]) -> BlockResult<()>;
}

/// A block as stored in a diagram: one of the four classes.
pub enum Block {
    Source(Box<dyn SourceBlock>),
    Function(Box<dyn FunctionBlock>),
    Transfer(Box<dyn TransferBlock>),
    Sink(Box<dyn SinkBlock>),
}

impl Block {
    pub fn source(block: impl SourceBlock + 'static) -> Self {
        Block::Source(Box::new(block))
    }

    pub fn function(block: impl FunctionBlock + 'static) -> Self {
        Block::Function(Box::new(block))
    }

    pub fn transfer(block: impl TransferBlock + 'static) -> Self {
        Block::Transfer(Box::new(block))
    }

    pub fn sink(block: impl SinkBlock + 'static) -> Self {
        Block::Sink(Box::new(block))
    }

    pub fn class(&self) -> BlockClass {
        match self {
            Block::Source(_) => BlockClass::Source,
            Block::Function(_) => BlockClass::Function,
            Block::Transfer(_) => BlockClass::Transfer,
            Block::Sink(_) => BlockClass::Sink,
        }
    }

    fn info(&self) -> &dyn BlockInfo {
        match self {
            Block::Source(b) => b.as_ref(),
            Block::Function(b) => b.as_ref(),
            Block::Transfer(b) => b.as_ref(),
            Block::Sink(b) => b.as_ref(),
        }
    }

    fn info_mut(&mut self) -> &mut dyn BlockInfo {
        match self {
            Block::Source(b) => b.as_mut(),
            Block::Function(b) => b.as_mut(),
            Block::Transfer(b) => b.as_mut(),
            Block::Sink(b) => b.as_mut(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.info().type_name()
    }

    /// Declared input arity.
    pub fn nin(&self) -> usize {
        match self {
            Block::Source(_) => 0,
            Block::Function(b) => b.nin(),
            Block::Transfer(b) => b.nin(),
            Block::Sink(b) => b.nin(),
        }
    }

    /// Declared output arity.
    pub fn nout(&self) -> usize {
        match self {
            Block::Source(b) => b.nout(),
            Block::Function(b) => b.nout(),
            Block::Transfer(b) => b.nout(),
            Block::Sink(_) => 0,
        }
    }

    /// State dimension (zero for everything but transfer blocks).
    pub fn nstates(&self) -> usize {
        match self {
            Block::Transfer(b) => b.nstates(),
            _ => 0,
        }
    }

    pub fn check(&self) -> BlockResult<()> {
        self.info().check()
    }

    pub fn start(&mut self) -> BlockResult<()> {
        self.info_mut().start()
    }

    pub fn done(&mut self) -> BlockResult<()> {
        self.info_mut().done()
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Block::Source(_))
    }

    pub fn is_sink(&self) -> bool {
        matches!(self, Block::Sink(_))
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, Block::Transfer(_))
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("class", &self.class())
            .field("type", &self.type_name())
            .field("nin", &self.nin())
            .field("nout", &self.nout())
            .field("nstates", &self.nstates())
            .finish()
    }
}
