//! Diagram compilation: validation, dependency analysis and execution order.
//!
//! The same-step dependency graph has an edge `A -> B` for every wire from an
//! output of `A` to an input of `B`, except wires into transfer blocks: their
//! outputs depend on state only, so those inputs are consumed by the state
//! update rather than by live propagation. Any cycle left in that graph is an
//! algebraic loop and rejects the diagram.

use std::collections::BTreeSet;
use std::ops::Range;

use bf_core::{BlockId, WireId};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::{debug, info};

use crate::block::BlockClass;
use crate::diagram::Diagram;
use crate::error::{CompileErrors, GraphError};
use crate::validate;

/// A validated diagram's execution plan.
///
/// Only valid for the diagram revision it was compiled from; any structural
/// edit requires recompiling.
#[derive(Debug, Clone)]
pub struct CompiledPlan {
    order: Vec<BlockId>,
    /// Per block slot: the wire driving each input port.
    inputs: Vec<Vec<WireId>>,
    /// Per block slot: outgoing wires in creation order.
    outputs: Vec<Vec<WireId>>,
    /// Per block slot: offset of the block's state in the diagram state vector.
    state_offsets: Vec<usize>,
    nstates: usize,
    revision: u64,
}

impl CompiledPlan {
    /// Blocks in evaluation order.
    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    pub fn input_wires(&self, block: BlockId) -> &[WireId] {
        self.inputs.get(block.slot()).map_or(&[], Vec::as_slice)
    }

    pub fn output_wires(&self, block: BlockId) -> &[WireId] {
        self.outputs.get(block.slot()).map_or(&[], Vec::as_slice)
    }

    /// Slice of the diagram state vector owned by `block`.
    pub fn state_range(&self, block: BlockId, nstates: usize) -> Range<usize> {
        let start = self.state_offsets.get(block.slot()).copied().unwrap_or(0);
        start..start + nstates
    }

    /// Total length of the diagram state vector.
    pub fn nstates(&self) -> usize {
        self.nstates
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True while the diagram has not been structurally edited since compile.
    pub fn is_current(&self, diagram: &Diagram) -> bool {
        diagram.revision() == self.revision
    }

    /// Position of each block in the execution order, indexed by slot.
    pub fn positions(&self) -> Vec<usize> {
        let mut pos = vec![usize::MAX; self.order.len()];
        for (i, id) in self.order.iter().enumerate() {
            if let Some(p) = pos.get_mut(id.slot()) {
                *p = i;
            }
        }
        pos
    }
}

impl Diagram {
    /// Validate the diagram and compute its execution order.
    pub fn compile(&self) -> Result<CompiledPlan, CompileErrors> {
        compile(self)
    }
}

/// Validate `diagram` and compute its execution plan.
///
/// Validation issues and algebraic loops are reported together.
pub fn compile(diagram: &Diagram) -> Result<CompiledPlan, CompileErrors> {
    let mut errors = CompileErrors::default();

    let issues = validate::collect_issues(diagram);
    if !issues.is_empty() {
        errors.push(GraphError::Validation { issues });
    }

    let deps = same_step_graph(diagram);
    let order = match execution_order(diagram, &deps) {
        Ok(order) => order,
        Err(loops) => {
            for err in loops {
                errors.push(err);
            }
            Vec::new()
        }
    };

    if !errors.is_empty() {
        debug!(errors = errors.len(), "diagram rejected");
        return Err(errors);
    }

    let n = diagram.blocks().len();
    let mut inputs: Vec<Vec<WireId>> = diagram
        .blocks()
        .iter()
        .map(|node| Vec::with_capacity(node.nin()))
        .collect();
    for node in diagram.blocks() {
        for port in 0..node.nin() {
            // Validation guarantees every input port is driven.
            if let Some(w) = diagram.input_wire(node.id(), port) {
                inputs[node.id().slot()].push(w);
            }
        }
    }

    let mut outputs: Vec<Vec<WireId>> = vec![Vec::new(); n];
    for wire in diagram.wires() {
        outputs[wire.start().block.slot()].push(wire.id());
    }

    let mut state_offsets = Vec::with_capacity(n);
    let mut nstates = 0;
    for node in diagram.blocks() {
        state_offsets.push(nstates);
        nstates += node.nstates();
    }

    info!(
        blocks = n,
        wires = diagram.wires().len(),
        states = nstates,
        "diagram compiled"
    );
    debug!(
        order = %order
            .iter()
            .map(|id| diagram.label(*id))
            .collect::<Vec<_>>()
            .join(" -> "),
        "execution order"
    );

    Ok(CompiledPlan {
        order,
        inputs,
        outputs,
        state_offsets,
        nstates,
        revision: diagram.revision(),
    })
}

/// Same-step dependency graph. Node `i` is the block in slot `i`.
fn same_step_graph(diagram: &Diagram) -> DiGraph<BlockId, WireId> {
    let mut graph = DiGraph::with_capacity(diagram.blocks().len(), diagram.wires().len());
    for node in diagram.blocks() {
        graph.add_node(node.id());
    }
    for wire in diagram.wires() {
        let dst = wire.end().block;
        let feeds_state = diagram
            .block(dst)
            .is_some_and(|node| node.class() == BlockClass::Transfer);
        if feeds_state {
            continue;
        }
        graph.add_edge(
            NodeIndex::new(wire.start().block.slot()),
            NodeIndex::new(dst.slot()),
            wire.id(),
        );
    }
    graph
}

/// Kahn's algorithm with deterministic tie-breaking.
///
/// Among ready blocks, non-sinks go first, then ascending creation id, so
/// sinks run after everything they could depend on.
fn execution_order(
    diagram: &Diagram,
    graph: &DiGraph<BlockId, WireId>,
) -> Result<Vec<BlockId>, Vec<GraphError>> {
    let n = graph.node_count();
    let mut in_degree = vec![0_usize; n];
    for edge in graph.edge_references() {
        in_degree[edge.target().index()] += 1;
    }

    let key = |idx: usize| {
        let id = graph[NodeIndex::new(idx)];
        let is_sink = diagram
            .block(id)
            .is_some_and(|node| node.class() == BlockClass::Sink);
        (is_sink, id)
    };

    let mut ready: BTreeSet<(bool, BlockId)> = (0..n)
        .filter(|&i| in_degree[i] == 0)
        .map(key)
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some((_, id)) = ready.pop_first() {
        order.push(id);
        for edge in graph.edges(NodeIndex::new(id.slot())) {
            let target = edge.target().index();
            in_degree[target] -= 1;
            if in_degree[target] == 0 {
                ready.insert(key(target));
            }
        }
    }

    if order.len() == n {
        return Ok(order);
    }
    Err(algebraic_loops(diagram, graph))
}

/// One error per strongly connected component that forms a cycle.
fn algebraic_loops(diagram: &Diagram, graph: &DiGraph<BlockId, WireId>) -> Vec<GraphError> {
    let mut loops: Vec<Vec<BlockId>> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut ids: Vec<BlockId> = scc.into_iter().map(|i| graph[i]).collect();
            ids.sort();
            ids
        })
        .collect();
    loops.sort();

    loops
        .into_iter()
        .map(|ids| GraphError::AlgebraicLoop {
            blocks: ids.iter().map(|id| diagram.label(*id)).collect(),
            ids,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::State;
    use crate::block::{Block, BlockInfo, FunctionBlock, SinkBlock, SourceBlock, TransferBlock};
    use bf_core::{BlockResult, Value};

    struct Src;
    impl BlockInfo for Src {
        fn type_name(&self) -> &'static str {
            "src"
        }
    }
    impl SourceBlock for Src {
        fn output(&self, _t: f64) -> BlockResult<Vec<Value>> {
            Ok(vec![Value::scalar(1.0)])
        }
    }

    struct Pass(usize);
    impl BlockInfo for Pass {
        fn type_name(&self) -> &'static str {
            "pass"
        }
    }
    impl FunctionBlock for Pass {
        fn nin(&self) -> usize {
            self.0
        }
        fn output(&self, inputs: &[Value], _t: f64) -> BlockResult<Vec<Value>> {
            Ok(vec![inputs[0].clone()])
        }
    }

    struct Lag;
    impl BlockInfo for Lag {
        fn type_name(&self) -> &'static str {
            "lag"
        }
    }
    impl TransferBlock for Lag {
        fn nin(&self) -> usize {
            1
        }
        fn nstates(&self) -> usize {
            1
        }
        fn initial_state(&self) -> State {
            State::zeros(1)
        }
        fn output(&self, x: &State, _t: f64) -> BlockResult<Vec<Value>> {
            Ok(vec![Value::scalar(x[0])])
        }
        fn derivative(&self, x: &State, u: &[Value], _t: f64) -> BlockResult<State> {
            Ok(State::from_element(1, u[0].as_scalar()? - x[0]))
        }
    }

    struct Null;
    impl BlockInfo for Null {
        fn type_name(&self) -> &'static str {
            "null"
        }
    }
    impl SinkBlock for Null {
        fn step(&mut self, _t: f64, _inputs: &[Value]) -> BlockResult<()> {
            Ok(())
        }
    }

    #[test]
    fn chain_orders_upstream_first() {
        let mut d = Diagram::new();
        let sink = d.add_block(Block::sink(Null));
        let b = d.add_block(Block::function(Pass(1)));
        let a = d.add_block(Block::source(Src));
        d.connect(a, b).unwrap();
        d.connect(b, sink).unwrap();

        let plan = d.compile().unwrap();
        assert_eq!(plan.order(), &[a, b, sink]);
        assert!(plan.is_current(&d));
    }

    #[test]
    fn sinks_run_after_independent_blocks() {
        let mut d = Diagram::new();
        let a = d.add_block(Block::source(Src));
        let sink = d.add_block(Block::sink(Null));
        let b = d.add_block(Block::source(Src));
        let c = d.add_block(Block::function(Pass(1)));
        d.connect(a, sink).unwrap();
        d.connect(b, c).unwrap();

        let plan = d.compile().unwrap();
        assert_eq!(plan.order().last(), Some(&sink));
    }

    #[test]
    fn loop_through_transfer_compiles() {
        let mut d = Diagram::new();
        let src = d.add_block(Block::source(Src));
        let sum = d.add_block(Block::function(Pass(2)));
        let lag = d.add_block(Block::transfer(Lag));
        d.connect(src, (sum, 0)).unwrap();
        d.connect(lag, (sum, 1)).unwrap();
        d.connect(sum, lag).unwrap();

        let plan = d.compile().unwrap();
        // The transfer block only depends on state, so it may come first.
        assert_eq!(plan.order(), &[src, lag, sum]);
        assert_eq!(plan.nstates(), 1);
        assert_eq!(plan.state_range(lag, 1), 0..1);
    }

    #[test]
    fn combinational_loop_is_rejected() {
        let mut d = Diagram::new();
        let a = d.add_block(Block::function(Pass(1)));
        let b = d.add_block(Block::function(Pass(1)));
        d.connect(a, b).unwrap();
        d.connect(b, a).unwrap();

        let errors = d.compile().unwrap_err();
        let loops: Vec<_> = errors.algebraic_loops().collect();
        assert_eq!(loops, vec![&[a, b][..]]);
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut d = Diagram::new();
        let a = d.add_block(Block::function(Pass(1)));
        d.connect(a, a).unwrap();

        let errors = d.compile().unwrap_err();
        assert_eq!(errors.algebraic_loops().count(), 1);
    }

    #[test]
    fn validation_and_loops_reported_together() {
        let mut d = Diagram::new();
        let a = d.add_block(Block::function(Pass(1)));
        let b = d.add_block(Block::function(Pass(2)));
        d.connect(a, b).unwrap();
        d.connect(b, a).unwrap();

        let errors = d.compile().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.validation_issues().count(), 1);
        assert_eq!(errors.algebraic_loops().count(), 1);
    }

    #[test]
    fn edit_after_compile_makes_plan_stale() {
        let mut d = Diagram::new();
        let a = d.add_block(Block::source(Src));
        let s = d.add_block(Block::sink(Null));
        d.connect(a, s).unwrap();
        let plan = d.compile().unwrap();
        d.add_block(Block::source(Src));
        assert!(!plan.is_current(&d));
    }
}
