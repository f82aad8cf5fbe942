//! bf-core: stable foundation for blockflow.
//!
//! Contains:
//! - ids (compact ids for blocks and wires)
//! - value (signal values carried on wires, and their shapes)
//! - numeric (Real + tolerances + float helpers)
//! - error (errors raised by block implementations)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod value;

// Re-exports: nice ergonomics for downstream crates
pub use error::{BlockError, BlockResult};
pub use ids::*;
pub use numeric::*;
pub use value::{Shape, Value};
