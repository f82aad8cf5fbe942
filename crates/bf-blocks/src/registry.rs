//! Type-tag registry used to build blocks from diagram files.

use std::collections::BTreeMap;
use std::fmt;

use bf_core::{BlockError, BlockResult};
use bf_graph::Block;
use tracing::debug;

use crate::functions::{Gain, Mux, Product, Saturation, Sum};
use crate::params::Params;
use crate::sinks::{Null, Print, Recorder};
use crate::sources::{Clock, Constant, Ramp, Sine, Step};
use crate::transfers::{FirstOrderLag, Integrator, LtiSiso};

/// Builds a block from its parameters.
pub type BlockFactory = Box<dyn Fn(&Params) -> BlockResult<Block> + Send + Sync>;

/// Maps type tags such as `"gain"` or `"lti_siso"` to block factories.
#[derive(Default)]
pub struct BlockRegistry {
    factories: BTreeMap<String, BlockFactory>,
}

impl BlockRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in block library.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();

        reg.register("constant", |p| Ok(Block::source(Constant::from_params(p)?)));
        reg.register("step", |p| Ok(Block::source(Step::from_params(p)?)));
        reg.register("ramp", |p| Ok(Block::source(Ramp::from_params(p)?)));
        reg.register("sine", |p| Ok(Block::source(Sine::from_params(p)?)));
        reg.register("clock", |_| Ok(Block::source(Clock)));

        reg.register("gain", |p| Ok(Block::function(Gain::from_params(p)?)));
        reg.register("sum", |p| Ok(Block::function(Sum::from_params(p)?)));
        reg.register("product", |p| Ok(Block::function(Product::from_params(p)?)));
        reg.register("saturation", |p| {
            Ok(Block::function(Saturation::from_params(p)?))
        });
        reg.register("mux", |p| Ok(Block::function(Mux::from_params(p)?)));

        reg.register("integrator", |p| {
            Ok(Block::transfer(Integrator::from_params(p)?))
        });
        reg.register("lti_siso", |p| Ok(Block::transfer(LtiSiso::from_params(p)?)));
        reg.register("first_order_lag", |p| {
            Ok(Block::transfer(FirstOrderLag::from_params(p)?))
        });

        reg.register("recorder", |p| Ok(Block::sink(Recorder::from_params(p)?)));
        reg.register("scope", |p| Ok(Block::sink(Recorder::from_params(p)?)));
        reg.register("print", |p| Ok(Block::sink(Print::from_params(p)?)));
        reg.register("null", |p| Ok(Block::sink(Null::from_params(p)?)));

        reg
    }

    /// Add or replace the factory for `tag`.
    ///
    /// Returns `true` when an existing factory was replaced.
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F) -> bool
    where
        F: Fn(&Params) -> BlockResult<Block> + Send + Sync + 'static,
    {
        let tag = tag.into();
        debug!(tag = %tag, "registering block type");
        self.factories.insert(tag, Box::new(factory)).is_some()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build a block of type `tag`.
    pub fn create(&self, tag: &str, params: &Params) -> BlockResult<Block> {
        let factory = self
            .factories
            .get(tag)
            .ok_or_else(|| BlockError::config(format!("unknown block type '{tag}'")))?;
        factory(params)
    }
}

impl fmt::Debug for BlockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockRegistry")
            .field("tags", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
