//! bf-blocks: the standard block library for blockflow.
//!
//! Sources, functions, transfers and sinks implementing the `bf-graph`
//! capability traits, plus [`BlockRegistry`] for building blocks from
//! type tags and parameter maps.
//!
//! # Example
//!
//! ```
//! use bf_blocks::{Gain, Recorder, Step, Sum, LtiSiso};
//! use bf_graph::{Block, Diagram};
//!
//! let recorder = Recorder::new(1);
//! let history = recorder.handle();
//!
//! let mut d = Diagram::new();
//! let demand = d.add_named("demand", Block::source(Step::new(1.0)));
//! let err = d.add_block(Block::function(Sum::new("+-").unwrap()));
//! let gain = d.add_block(Block::function(Gain::new(10.0)));
//! let plant = d.add_named("plant", Block::transfer(LtiSiso::new(&[0.5], &[2.0, 1.0]).unwrap()));
//! let scope = d.add_block(Block::sink(recorder));
//!
//! d.connect(demand, (err, 0)).unwrap();
//! d.connect(plant, (err, 1)).unwrap();
//! d.connect(err, gain).unwrap();
//! d.connect(gain, plant).unwrap();
//! d.connect(plant, scope).unwrap();
//!
//! let plan = d.compile().unwrap();
//! assert_eq!(plan.order().last(), Some(&scope));
//! assert!(history.is_empty());
//! ```

pub mod functions;
pub mod params;
pub mod registry;
pub mod sinks;
pub mod sources;
pub mod transfers;

pub use functions::{Gain, Mux, Product, Saturation, Sum};
pub use params::Params;
pub use registry::{BlockFactory, BlockRegistry};
pub use sinks::{Null, Print, Recorder, RecorderHandle, Sample};
pub use sources::{Clock, Constant, Ramp, Sine, Step};
pub use transfers::{FirstOrderLag, Integrator, LtiSiso};
