use bf_core::{BlockId, BlockResult, Value};
use bf_graph::{
    Block, BlockInfo, Diagram, FunctionBlock, GraphError, SinkBlock, SourceBlock, State,
    TransferBlock, ValidationIssue,
};
use proptest::prelude::*;

struct Src;
impl BlockInfo for Src {
    fn type_name(&self) -> &'static str {
        "step"
    }
}
impl SourceBlock for Src {
    fn output(&self, _t: f64) -> BlockResult<Vec<Value>> {
        Ok(vec![Value::scalar(1.0)])
    }
}

/// n-input adder.
struct Add(usize);
impl BlockInfo for Add {
    fn type_name(&self) -> &'static str {
        "sum"
    }
}
impl FunctionBlock for Add {
    fn nin(&self) -> usize {
        self.0
    }
    fn output(&self, inputs: &[Value], _t: f64) -> BlockResult<Vec<Value>> {
        let s: f64 = inputs.iter().filter_map(|v| v.as_scalar().ok()).sum();
        Ok(vec![Value::scalar(s)])
    }
}

struct Gain;
impl BlockInfo for Gain {
    fn type_name(&self) -> &'static str {
        "gain"
    }
}
impl FunctionBlock for Gain {
    fn nin(&self) -> usize {
        1
    }
    fn output(&self, inputs: &[Value], _t: f64) -> BlockResult<Vec<Value>> {
        Ok(vec![inputs[0].map(|v| 10.0 * v)])
    }
}

struct Plant;
impl BlockInfo for Plant {
    fn type_name(&self) -> &'static str {
        "lti_siso"
    }
}
impl TransferBlock for Plant {
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
        Ok(vec![Value::scalar(0.25 * x[0])])
    }
    fn derivative(&self, x: &State, u: &[Value], _t: f64) -> BlockResult<State> {
        Ok(State::from_element(1, u[0].as_scalar()? - 0.5 * x[0]))
    }
}

struct Scope(usize);
impl BlockInfo for Scope {
    fn type_name(&self) -> &'static str {
        "scope"
    }
}
impl SinkBlock for Scope {
    fn nin(&self) -> usize {
        self.0
    }
    fn step(&mut self, _t: f64, _inputs: &[Value]) -> BlockResult<()> {
        Ok(())
    }
}

#[test]
fn feedback_through_transfer_compiles() {
    let mut d = Diagram::new();
    let demand = d.add_block(Block::source(Src));
    let sum = d.add_block(Block::function(Add(2)));
    let gain = d.add_block(Block::function(Gain));
    let plant = d.add_block(Block::transfer(Plant));
    let scope = d.add_block(Block::sink(Scope(2)));
    d.connect(demand, (sum, 0)).unwrap();
    d.connect(plant, (sum, 1)).unwrap();
    d.connect(sum, gain).unwrap();
    d.connect(gain, plant).unwrap();
    d.connect(plant, (scope, 0)).unwrap();
    d.connect(demand, (scope, 1)).unwrap();

    let plan = d.compile().unwrap();
    let pos = plan.positions();
    assert!(pos[sum.slot()] < pos[gain.slot()]);
    assert!(pos[plant.slot()] < pos[sum.slot()]);
    assert_eq!(plan.order().last(), Some(&scope));
    assert_eq!(plan.nstates(), 1);
}

#[test]
fn feedback_through_function_is_an_algebraic_loop() {
    // Same loop with the plant replaced by a pure gain.
    let mut d = Diagram::new();
    let demand = d.add_block(Block::source(Src));
    let sum = d.add_named("err", Block::function(Add(2)));
    let gain = d.add_named("k", Block::function(Gain));
    let feedback = d.add_named("fb", Block::function(Gain));
    let scope = d.add_block(Block::sink(Scope(1)));
    d.connect(demand, (sum, 0)).unwrap();
    d.connect(feedback, (sum, 1)).unwrap();
    d.connect(sum, gain).unwrap();
    d.connect(gain, feedback).unwrap();
    d.connect(gain, scope).unwrap();

    let errs = d.compile().unwrap_err();
    let loops: Vec<&[BlockId]> = errs.algebraic_loops().collect();
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0], &[sum, gain, feedback]);
    match &errs.errors()[0] {
        GraphError::AlgebraicLoop { blocks, .. } => {
            assert_eq!(blocks, &["sum.err", "gain.k", "gain.fb"]);
        }
        other => panic!("expected algebraic loop, got {other}"),
    }
}

#[test]
fn unconnected_input_is_reported_by_port() {
    let mut d = Diagram::new();
    let demand = d.add_block(Block::source(Src));
    let sum = d.add_block(Block::function(Add(2)));
    let scope = d.add_block(Block::sink(Scope(1)));
    d.connect(demand, (sum, 0)).unwrap();
    d.connect(sum, scope).unwrap();

    let errs = d.compile().unwrap_err();
    let issues: Vec<_> = errs.validation_issues().collect();
    assert_eq!(
        issues,
        vec![&ValidationIssue::UnconnectedInput {
            block: format!("sum.block{sum}"),
            port: 1,
        }]
    );
    assert!(errs.to_string().contains("input port 1 is not connected"));
}

#[test]
fn edits_after_compile_make_plan_stale() {
    let mut d = Diagram::new();
    let a = d.add_block(Block::source(Src));
    let s = d.add_block(Block::sink(Scope(1)));
    d.connect(a, s).unwrap();
    let plan = d.compile().unwrap();
    assert!(plan.is_current(&d));

    d.rename_block(a, "demand");
    assert!(plan.is_current(&d));

    d.add_block(Block::source(Src));
    assert!(!plan.is_current(&d));
}

/// Random DAG: edge `(i, j)` with `i < j` feeds block `j` from block `i`.
/// Also yields a permutation used as the block insertion order.
fn dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>, Vec<usize>)> {
    (2usize..12).prop_flat_map(|n| {
        let edges = prop::collection::vec((0..n - 1, 1..n), 0..3 * n)
            .prop_map(|pairs| {
                pairs
                    .into_iter()
                    .filter_map(|(a, b)| (a < b).then_some((a, b)))
                    .collect::<Vec<_>>()
            });
        let shuffle = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
        (Just(n), edges, shuffle)
    })
}

/// Build a DAG where block 0 is a source, and every later block is an adder
/// with one input per incoming edge (plus one from block 0 when it has none).
fn build(n: usize, edges: &[(usize, usize)], shuffle: &[usize]) -> (Diagram, Vec<BlockId>) {
    let mut fan_in = vec![Vec::new(); n];
    for &(a, b) in edges {
        if !fan_in[b].contains(&a) {
            fan_in[b].push(a);
        }
    }
    for inputs in fan_in.iter_mut().skip(1) {
        if inputs.is_empty() {
            inputs.push(0);
        }
    }

    // Insert blocks in a shuffled order so ids do not follow topology.
    let mut d = Diagram::new();
    let mut ids = vec![BlockId::from_index(0); n];
    for &k in shuffle {
        ids[k] = if k == 0 {
            d.add_block(Block::source(Src))
        } else {
            d.add_block(Block::function(Add(fan_in[k].len())))
        };
    }
    for (j, inputs) in fan_in.iter().enumerate().skip(1) {
        for (port, &i) in inputs.iter().enumerate() {
            d.connect(ids[i], (ids[j], port)).unwrap();
        }
    }
    (d, ids)
}

proptest! {
    #[test]
    fn compiled_order_respects_every_wire((n, edges, shuffle) in dag()) {
        let (d, _) = build(n, &edges, &shuffle);
        let plan = d.compile().unwrap();
        prop_assert_eq!(plan.order().len(), n);

        let pos = plan.positions();
        for wire in d.wires() {
            prop_assert!(pos[wire.start().block.slot()] < pos[wire.end().block.slot()]);
        }

        // Compiling twice yields the same order.
        let again = d.compile().unwrap();
        prop_assert_eq!(plan.order(), again.order());
    }

    #[test]
    fn second_wire_into_a_port_is_rejected(
        order in Just(vec![0usize, 1]).prop_shuffle(),
    ) {
        let mut d = Diagram::new();
        let a = d.add_block(Block::source(Src));
        let b = d.add_block(Block::source(Src));
        let g = d.add_block(Block::function(Gain));
        let sources = [a, b];

        let first = d.connect(sources[order[0]], g).unwrap();
        let before = d.revision();
        let err = d.connect(sources[order[1]], g).unwrap_err();
        match err {
            GraphError::DuplicateConnection { port, existing, .. } => {
                prop_assert_eq!(port, 0);
                prop_assert_eq!(existing, first);
            }
            other => prop_assert!(false, "unexpected error {}", other),
        }
        prop_assert_eq!(d.revision(), before);
        prop_assert_eq!(d.wires().len(), 1);
    }
}
