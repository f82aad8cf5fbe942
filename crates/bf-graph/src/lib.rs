//! bf-graph: block-diagram model and compiler for blockflow.
//!
//! Provides:
//! - The block capability contract (source, function, transfer, sink)
//! - Incremental diagram construction (add blocks, connect ports)
//! - Compilation: aggregated validation, algebraic-loop detection and a
//!   deterministic execution order
//! - Read-only views: structural report and Graphviz export
//!
//! # Example
//!
//! ```
//! use bf_core::{BlockResult, Value};
//! use bf_graph::{Block, BlockInfo, Diagram, FunctionBlock, SinkBlock, SourceBlock};
//!
//! struct One;
//! impl BlockInfo for One {
//!     fn type_name(&self) -> &'static str { "one" }
//! }
//! impl SourceBlock for One {
//!     fn output(&self, _t: f64) -> BlockResult<Vec<Value>> { Ok(vec![Value::scalar(1.0)]) }
//! }
//!
//! struct Discard;
//! impl BlockInfo for Discard {
//!     fn type_name(&self) -> &'static str { "discard" }
//! }
//! impl SinkBlock for Discard {
//!     fn step(&mut self, _t: f64, _inputs: &[Value]) -> BlockResult<()> { Ok(()) }
//! }
//!
//! let mut diagram = Diagram::new();
//! let src = diagram.add_block(Block::source(One));
//! let sink = diagram.add_block(Block::sink(Discard));
//! diagram.connect(src, sink).unwrap();
//!
//! let plan = diagram.compile().unwrap();
//! assert_eq!(plan.order(), &[src, sink]);
//! ```

pub mod block;
pub mod compile;
pub mod diagram;
pub mod dot;
pub mod error;
pub mod report;
pub(crate) mod validate;
pub mod wire;

// Re-exports for ergonomics
pub use block::{
    Block, BlockClass, BlockInfo, FunctionBlock, SinkBlock, SourceBlock, TransferBlock,
};
pub use compile::{CompiledPlan, compile};
pub use diagram::{BlockNode, Diagram};
pub use dot::Dot;
pub use error::{CompileErrors, GraphError, GraphResult, ValidationIssue};
pub use report::{BlockRow, Report, WireRow};
pub use wire::{Plug, PlugDir, PortRef, Wire};

/// State vector type used by transfer blocks.
pub type State = nalgebra::DVector<f64>;
