//! Diagram arena: blocks, wires and incremental construction.

use std::collections::HashMap;

use bf_core::{BlockId, Value, WireId};

use crate::State;
use crate::block::{Block, BlockClass};
use crate::error::{GraphError, GraphResult};
use crate::wire::{PlugDir, PortRef, Wire};

/// A block together with the per-run buffers the engine maintains for it.
#[derive(Debug)]
pub struct BlockNode {
    id: BlockId,
    name: Option<String>,
    block: Block,
    /// One slot per input port; `None` until a value arrives this pass.
    inputs: Vec<Option<Value>>,
    updated: bool,
    /// Transfer state; empty for every other class.
    x: State,
}

impl BlockNode {
    fn new(id: BlockId, name: Option<String>, block: Block) -> Self {
        let x = match &block {
            Block::Transfer(b) => b.initial_state(),
            _ => State::zeros(0),
        };
        Self {
            id,
            name,
            inputs: vec![None; block.nin()],
            updated: false,
            x,
            block,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn block_mut(&mut self) -> &mut Block {
        &mut self.block
    }

    pub fn class(&self) -> BlockClass {
        self.block.class()
    }

    pub fn nin(&self) -> usize {
        self.block.nin()
    }

    pub fn nout(&self) -> usize {
        self.block.nout()
    }

    pub fn nstates(&self) -> usize {
        self.block.nstates()
    }

    /// `type.name`, or `type.blockN` for unnamed blocks.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{}.{}", self.block.type_name(), name),
            None => format!("{}.block{}", self.block.type_name(), self.id),
        }
    }

    /// Label prefixed with the block class, e.g. `function.gain.block2`.
    pub fn fullname(&self) -> String {
        format!("{}.{}", self.class(), self.label())
    }

    pub fn inputs(&self) -> &[Option<Value>] {
        &self.inputs
    }

    /// All input values, or `None` while any slot is still empty.
    pub fn input_values(&self) -> Option<Vec<Value>> {
        self.inputs.iter().cloned().collect()
    }

    /// True once every input slot holds a value for the current pass.
    pub fn updated(&self) -> bool {
        self.updated
    }

    /// Current state vector (`getstate`).
    pub fn state(&self) -> &State {
        &self.x
    }

    /// Take this block's share of a diagram state vector and return the rest.
    pub fn setstate<'a>(&mut self, x: &'a [f64]) -> &'a [f64] {
        let n = self.x.len().min(x.len());
        self.x.as_mut_slice()[..n].copy_from_slice(&x[..n]);
        &x[n..]
    }

    /// Clear inputs and restore the initial state. Called once per run start.
    pub fn reset(&mut self) {
        self.clear_inputs();
        if let Block::Transfer(b) = &self.block {
            self.x = b.initial_state();
        }
    }

    /// Clear inputs but keep state. Called before each evaluation pass.
    pub fn clear_inputs(&mut self) {
        self.inputs.iter_mut().for_each(|slot| *slot = None);
        self.updated = false;
    }

    /// Store `value` at input `port`.
    ///
    /// Returns whether every input is now present.
    pub fn setinput(&mut self, port: usize, value: Value) -> GraphResult<bool> {
        let arity = self.inputs.len();
        let Some(slot) = self.inputs.get_mut(port) else {
            return Err(GraphError::PortIndex {
                block: self.label(),
                port,
                arity,
                dir: PlugDir::Input,
            });
        };
        *slot = Some(value);
        self.updated = self.inputs.iter().all(Option::is_some);
        Ok(self.updated)
    }
}

/// A block diagram under construction.
///
/// Blocks and wires live in arenas indexed by their ids. Structural edits
/// bump the revision, which invalidates any previously compiled plan.
#[derive(Debug, Default)]
pub struct Diagram {
    name: Option<String>,
    blocks: Vec<BlockNode>,
    wires: Vec<Wire>,
    /// Input (block, port) -> driving wire.
    driven: HashMap<(BlockId, usize), WireId>,
    revision: u64,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Add an unnamed block and return its id.
    pub fn add_block(&mut self, block: Block) -> BlockId {
        self.insert(None, block)
    }

    /// Add a named block and return its id.
    pub fn add_named(&mut self, name: impl Into<String>, block: Block) -> BlockId {
        self.insert(Some(name.into()), block)
    }

    fn insert(&mut self, name: Option<String>, block: Block) -> BlockId {
        let id = BlockId::from_index(self.blocks.len() as u32);
        self.blocks.push(BlockNode::new(id, name, block));
        self.revision += 1;
        id
    }

    /// Rename a block. Names are cosmetic and do not invalidate a plan.
    pub fn rename_block(&mut self, id: BlockId, name: impl Into<String>) {
        if let Some(node) = self.blocks.get_mut(id.slot()) {
            node.name = Some(name.into());
        }
    }

    /// Name a wire for reports.
    pub fn rename_wire(&mut self, id: WireId, name: impl Into<String>) {
        if let Some(wire) = self.wires.get_mut(id.slot()) {
            wire.name = Some(name.into());
        }
    }

    /// Wire an output port to an input port.
    ///
    /// A bare block id means port 0 on either side.
    pub fn connect(
        &mut self,
        from: impl Into<PortRef>,
        to: impl Into<PortRef>,
    ) -> GraphResult<WireId> {
        let from = from.into();
        let to = to.into();

        let src = self.node(from.block)?;
        if from.port >= src.nout() {
            return Err(GraphError::PortIndex {
                block: src.label(),
                port: from.port,
                arity: src.nout(),
                dir: PlugDir::Output,
            });
        }
        let dst = self.node(to.block)?;
        if to.port >= dst.nin() {
            return Err(GraphError::PortIndex {
                block: dst.label(),
                port: to.port,
                arity: dst.nin(),
                dir: PlugDir::Input,
            });
        }
        if let Some(&existing) = self.driven.get(&(to.block, to.port)) {
            return Err(GraphError::DuplicateConnection {
                block: dst.label(),
                port: to.port,
                existing,
            });
        }

        let id = WireId::from_index(self.wires.len() as u32);
        self.wires.push(Wire::new(id, from, to));
        self.driven.insert((to.block, to.port), id);
        self.revision += 1;
        Ok(id)
    }

    /// Fan one output port out to several input ports.
    ///
    /// Stops at the first failing connection; wires made before it remain.
    pub fn connect_all(
        &mut self,
        from: impl Into<PortRef>,
        to: &[PortRef],
    ) -> GraphResult<Vec<WireId>> {
        let from = from.into();
        to.iter().map(|&dst| self.connect(from, dst)).collect()
    }

    fn node(&self, id: BlockId) -> GraphResult<&BlockNode> {
        self.blocks
            .get(id.slot())
            .ok_or(GraphError::UnknownBlock { id })
    }

    pub fn block(&self, id: BlockId) -> Option<&BlockNode> {
        self.blocks.get(id.slot())
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut BlockNode> {
        self.blocks.get_mut(id.slot())
    }

    pub fn blocks(&self) -> &[BlockNode] {
        &self.blocks
    }

    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(id.slot())
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Wire driving the given input port, if any.
    pub fn input_wire(&self, block: BlockId, port: usize) -> Option<WireId> {
        self.driven.get(&(block, port)).copied()
    }

    /// Wires leaving a block, in creation order.
    pub fn output_wires(&self, block: BlockId) -> impl Iterator<Item = &Wire> {
        self.wires.iter().filter(move |w| w.start.block == block)
    }

    /// Structural revision; bumped by every block or wire addition.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Label of a block, or a placeholder for unknown ids.
    pub fn label(&self, id: BlockId) -> String {
        self.block(id)
            .map(BlockNode::label)
            .unwrap_or_else(|| format!("??.block{id}"))
    }

    /// `wire.N: src[p] --> dst[q]`.
    pub fn describe_wire(&self, wire: &Wire) -> String {
        format!(
            "{wire}: {}[{}] --> {}[{}]",
            self.label(wire.start.block),
            wire.start.port,
            self.label(wire.end.block),
            wire.end.port
        )
    }

    /// Mutable access to the block and wire arenas for the executor.
    ///
    /// The arenas cannot grow or shrink through these slices, so the
    /// structure a plan was compiled against stays intact.
    pub fn runtime_mut(&mut self) -> (&mut [BlockNode], &mut [Wire]) {
        (&mut self.blocks, &mut self.wires)
    }
}
