//! Simulation loop over a compiled diagram.
//!
//! Each step evaluates the diagram once at the current time and state,
//! delivering values to sinks, then advances the concatenated transfer-block
//! state with the configured integrator. Integrator stages re-evaluate the
//! diagram at the stage time and state without stepping sinks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bf_core::{BlockError, BlockId, Value};
use bf_graph::{Block, BlockNode, CompiledPlan, Diagram, State};
use tracing::{debug, info, trace, warn};

use crate::error::{SimError, SimResult};
use crate::integrator::{ForwardEuler, Integrator, RK4};
use crate::model::TransientModel;
use crate::sim::{IntegratorType, RunRecord, SimOptions, SinkSample, SinkSeries, StepRecord};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Aborted => "aborted",
        }
    }
}

/// Cancellation flag polled at step boundaries.
///
/// Cloneable and `Send`, so it can be tripped from another thread. A stop
/// requested while no run is active cancels the next run before its first
/// step. The flag resets when a run ends.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Drives a compiled diagram through simulated time.
///
/// Holds the diagram mutably for its whole lifetime, so the structure cannot
/// change underneath a run.
pub struct Executor<'a> {
    diagram: &'a mut Diagram,
    plan: CompiledPlan,
    opts: SimOptions,
    state: RunState,
    step: usize,
    total_steps: usize,
    x: State,
    stop: StopHandle,
}

impl<'a> Executor<'a> {
    /// Bind a plan to the diagram it was compiled from.
    pub fn new(diagram: &'a mut Diagram, plan: CompiledPlan, opts: SimOptions) -> SimResult<Self> {
        opts.validate()?;
        if !plan.is_current(diagram) {
            return Err(SimError::StalePlan {
                compiled: plan.revision(),
                current: diagram.revision(),
            });
        }
        let x = State::zeros(plan.nstates());
        Ok(Self {
            diagram,
            plan,
            opts,
            state: RunState::Idle,
            step: 0,
            total_steps: 0,
            x,
            stop: StopHandle::default(),
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn options(&self) -> &SimOptions {
        &self.opts
    }

    pub fn plan(&self) -> &CompiledPlan {
        &self.plan
    }

    pub fn diagram(&self) -> &Diagram {
        &*self.diagram
    }

    /// Index of the next step to evaluate.
    pub fn step_index(&self) -> usize {
        self.step
    }

    /// Simulated time of the next step.
    pub fn time(&self) -> f64 {
        self.step as f64 * self.opts.dt
    }

    /// Concatenated transfer-block state.
    pub fn diagram_state(&self) -> &State {
        &self.x
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Share an existing stop handle, e.g. one already given to a block.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Reset every block and wire and enter `Running`.
    pub fn start(&mut self) -> SimResult<()> {
        self.step = 0;
        self.total_steps = self.opts.steps();

        let (nodes, wires) = self.diagram.runtime_mut();
        for node in nodes.iter_mut() {
            node.reset();
        }
        for wire in wires.iter_mut() {
            wire.clear();
        }
        self.x = gather_state(&*self.diagram, &self.plan);

        let (nodes, _) = self.diagram.runtime_mut();
        for i in 0..nodes.len() {
            if let Err(source) = nodes[i].block_mut().start() {
                let err = computation(&nodes[i], 0, 0.0, source);
                warn!(error = %err, "run failed to start");
                // Blocks started before the failure still get their cleanup.
                nodes[..i].iter_mut().for_each(close);
                self.stop.clear();
                self.state = RunState::Aborted;
                return Err(err);
            }
        }

        self.state = RunState::Running;
        info!(
            t_end = self.opts.t_end,
            dt = self.opts.dt,
            steps = self.total_steps,
            integrator = ?self.opts.integrator,
            "run started"
        );
        Ok(())
    }

    /// Evaluate the current step and advance state with the configured integrator.
    pub fn step(&mut self) -> SimResult<StepRecord> {
        match self.opts.integrator {
            IntegratorType::Rk4 => self.step_with(&RK4),
            IntegratorType::ForwardEuler => self.step_with(&ForwardEuler),
        }
    }

    /// Evaluate the current step and advance state with a caller-supplied integrator.
    pub fn step_with<I: Integrator>(&mut self, integrator: &I) -> SimResult<StepRecord> {
        self.guarded(|exec| exec.advance(Some(integrator)))
    }

    /// Evaluate the current step without integrating (final time point).
    fn finish_step(&mut self) -> SimResult<StepRecord> {
        self.guarded(|exec| exec.advance::<RK4>(None))
    }

    fn guarded(
        &mut self,
        f: impl FnOnce(&mut Self) -> SimResult<StepRecord>,
    ) -> SimResult<StepRecord> {
        if self.state != RunState::Running {
            return Err(SimError::InvalidState {
                state: self.state.as_str(),
                expected: "running",
            });
        }
        let result = f(self);
        if let Err(err) = &result {
            warn!(step = self.step, t = self.time(), error = %err, "run aborted");
            self.finish(RunState::Aborted);
        }
        result
    }

    fn advance<I: Integrator>(&mut self, integrator: Option<&I>) -> SimResult<StepRecord> {
        let step = self.step;
        let t = self.time();
        let dt = self.opts.dt;

        scatter_state(self.diagram, &self.plan, &self.x);
        propagate(self.diagram, &self.plan, t, step, true)?;
        let record = StepRecord {
            step,
            t,
            sinks: sink_samples(&*self.diagram, &self.plan),
        };

        if let Some(integrator) = integrator {
            if self.plan.nstates() > 0 {
                // Integrator stages overwrite the wire caches.
                let delivered: Vec<Option<Value>> = self
                    .diagram
                    .wires()
                    .iter()
                    .map(|w| w.value().cloned())
                    .collect();
                let mut model = DiagramModel {
                    diagram: &mut *self.diagram,
                    plan: &self.plan,
                    step,
                };
                let x_next = integrator.step(&mut model, t, &self.x, dt)?;
                if let Some(i) = x_next.iter().position(|v| !v.is_finite()) {
                    let block = owner_of_state(&*self.diagram, &self.plan, i);
                    let node = self.diagram.block(block).ok_or(SimError::InvalidArg {
                        what: "state index outside every block",
                    })?;
                    return Err(computation(
                        node,
                        step,
                        t,
                        BlockError::NonFinite {
                            what: "integrated state",
                            value: x_next[i],
                        },
                    ));
                }
                self.x = x_next;
                scatter_state(self.diagram, &self.plan, &self.x);

                let (_, wires) = self.diagram.runtime_mut();
                for (wire, value) in wires.iter_mut().zip(delivered) {
                    wire.restore(value);
                }
            }
            self.step += 1;
        }

        trace!(step, t, "step complete");
        Ok(record)
    }

    /// Call `done()` on every block and settle into a terminal state.
    fn finish(&mut self, state: RunState) {
        let (nodes, _) = self.diagram.runtime_mut();
        nodes.iter_mut().for_each(close);
        self.stop.clear();
        self.state = state;
    }

    /// Start a run to `t_end` with step `dt` and return its step stream.
    pub fn run(&mut self, t_end: f64, dt: f64) -> SimResult<Run<'_, 'a>> {
        let opts = SimOptions {
            t_end,
            dt,
            ..self.opts.clone()
        };
        opts.validate()?;
        self.opts = opts;
        self.start()?;
        Ok(Run { exec: self })
    }

    /// Run with the configured options and collect the decimated history.
    ///
    /// A cancelled run returns the history collected so far; `state()` is
    /// then `Aborted`.
    pub fn run_to_end(&mut self) -> SimResult<RunRecord> {
        let record_every = self.opts.record_every;
        let mut history = RunRecord {
            sinks: self
                .plan
                .order()
                .iter()
                .filter_map(|&id| self.diagram.block(id))
                .filter(|node| node.block().is_sink())
                .map(|node| SinkSeries {
                    block: node.id(),
                    label: node.label(),
                    values: Vec::new(),
                })
                .collect(),
            ..RunRecord::default()
        };

        let (t_end, dt) = (self.opts.t_end, self.opts.dt);
        let mut last: Option<StepRecord> = None;
        for record in self.run(t_end, dt)? {
            let record = record?;
            history.steps += 1;
            if record.step % record_every == 0 {
                history.push(record);
                last = None;
            } else {
                last = Some(record);
            }
        }
        // Always keep the final time point.
        if let Some(record) = last {
            history.push(record);
        }
        Ok(history)
    }
}

/// Lazy, finite stream of step records for one run.
///
/// Yields one record per time point from `0` to `t_end` inclusive. Ends
/// early after an error (yielded once) or a stop request. Cannot be
/// restarted; call `Executor::run` again for a fresh run. Dropping the
/// stream before it ends aborts the run.
pub struct Run<'r, 'a> {
    exec: &'r mut Executor<'a>,
}

impl Run<'_, '_> {
    pub fn state(&self) -> RunState {
        self.exec.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.exec.stop_handle()
    }
}

impl Drop for Run<'_, '_> {
    fn drop(&mut self) {
        if self.exec.state == RunState::Running {
            debug!(step = self.exec.step, "run stream dropped before completion");
            self.exec.finish(RunState::Aborted);
        }
    }
}

impl Iterator for Run<'_, '_> {
    type Item = SimResult<StepRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let exec = &mut *self.exec;
        if exec.state != RunState::Running {
            return None;
        }
        if exec.stop.is_stopped() {
            info!(step = exec.step, t = exec.time(), "run cancelled");
            exec.finish(RunState::Aborted);
            return None;
        }

        if exec.step < exec.total_steps {
            Some(exec.step())
        } else {
            let result = exec.finish_step();
            if result.is_ok() {
                debug!(steps = exec.step, t = exec.time(), "run completed");
                exec.finish(RunState::Completed);
            }
            Some(result)
        }
    }
}

/// A diagram viewed as one dynamic system over its concatenated state.
pub struct DiagramModel<'d> {
    pub diagram: &'d mut Diagram,
    pub plan: &'d CompiledPlan,
    /// Step index reported in error context.
    pub step: usize,
}

impl TransientModel for DiagramModel<'_> {
    type State = State;

    fn initial_state(&self) -> State {
        let mut x = State::zeros(self.plan.nstates());
        for node in self.diagram.blocks() {
            if let Block::Transfer(b) = node.block() {
                let range = self.plan.state_range(node.id(), node.nstates());
                x.rows_mut(range.start, range.len())
                    .copy_from(&b.initial_state());
            }
        }
        x
    }

    fn rhs(&mut self, t: f64, x: &State) -> SimResult<State> {
        scatter_state(self.diagram, self.plan, x);
        propagate(self.diagram, self.plan, t, self.step, false)?;

        let mut dx = State::zeros(self.plan.nstates());
        for node in self.diagram.blocks() {
            let Block::Transfer(b) = node.block() else {
                continue;
            };
            let inputs = ready_inputs(node, self.step, t)?;
            let d = b
                .derivative(node.state(), &inputs, t)
                .map_err(|e| computation(node, self.step, t, e))?;
            if d.len() != node.nstates() {
                return Err(computation(
                    node,
                    self.step,
                    t,
                    BlockError::computation(format!(
                        "derivative has length {}, expected {}",
                        d.len(),
                        node.nstates()
                    )),
                ));
            }
            let range = self.plan.state_range(node.id(), node.nstates());
            dx.rows_mut(range.start, range.len()).copy_from(&d);
        }
        Ok(dx)
    }

    fn add(&self, a: &State, b: &State) -> State {
        a + b
    }

    fn scale(&self, a: &State, scale: f64) -> State {
        a * scale
    }
}

/// One evaluation pass in execution order.
///
/// Clears all input buffers, computes each block's outputs and fans them out
/// along its wires. Sinks are stepped only when `step_sinks` is set.
fn propagate(
    diagram: &mut Diagram,
    plan: &CompiledPlan,
    t: f64,
    step: usize,
    step_sinks: bool,
) -> SimResult<()> {
    let (nodes, wires) = diagram.runtime_mut();
    for node in nodes.iter_mut() {
        node.clear_inputs();
    }

    for &id in plan.order() {
        let slot = id.slot();

        if nodes[slot].block().is_sink() {
            if step_sinks {
                let node = &mut nodes[slot];
                let inputs = ready_inputs(node, step, t)?;
                let result = match node.block_mut() {
                    Block::Sink(b) => b.step(t, &inputs),
                    _ => Ok(()),
                };
                result.map_err(|e| computation(node, step, t, e))?;
            }
            continue;
        }

        let outputs = {
            let node = &nodes[slot];
            let result = match node.block() {
                Block::Source(b) => b.output(t),
                Block::Function(b) => {
                    let inputs = ready_inputs(node, step, t)?;
                    b.output(&inputs, t)
                }
                Block::Transfer(b) => b.output(node.state(), t),
                Block::Sink(_) => Ok(Vec::new()),
            };
            let outputs = result.map_err(|e| computation(node, step, t, e))?;
            check_outputs(node, &outputs, step, t)?;
            outputs
        };

        for &wid in plan.output_wires(id) {
            let wire = &mut wires[wid.slot()];
            let (start, end) = (wire.start(), wire.end());
            let value = outputs[start.port].clone();
            if let Err((expected, found)) = wire.carry(value.clone()) {
                return Err(computation(
                    &nodes[slot],
                    step,
                    t,
                    BlockError::ShapeMismatch {
                        what: "wire value",
                        expected,
                        found,
                    },
                ));
            }
            nodes[end.block.slot()].setinput(end.port, value)?;
        }
    }

    // Every block with inputs must have been satisfied exactly by this pass.
    for &id in plan.order() {
        let node = &nodes[id.slot()];
        if node.nin() > 0 && !node.updated() {
            return Err(dead_input(node, step, t));
        }
    }
    Ok(())
}

/// Run a block's `done()` hook, logging failures.
fn close(node: &mut BlockNode) {
    if let Err(err) = node.block_mut().done() {
        warn!(block = %node.label(), error = %err, "block cleanup failed");
    }
}

fn check_outputs(node: &BlockNode, outputs: &[Value], step: usize, t: f64) -> SimResult<()> {
    if outputs.len() != node.nout() {
        return Err(computation(
            node,
            step,
            t,
            BlockError::computation(format!(
                "produced {} outputs, expected {}",
                outputs.len(),
                node.nout()
            )),
        ));
    }
    if let Some(bad) = outputs.iter().find(|v| !v.is_finite()) {
        let value = bad
            .as_slice()
            .iter()
            .copied()
            .find(|v| !v.is_finite())
            .unwrap_or(f64::NAN);
        return Err(computation(
            node,
            step,
            t,
            BlockError::NonFinite {
                what: "block output",
                value,
            },
        ));
    }
    Ok(())
}

fn ready_inputs(node: &BlockNode, step: usize, t: f64) -> SimResult<Vec<Value>> {
    node.input_values().ok_or_else(|| dead_input(node, step, t))
}

fn dead_input(node: &BlockNode, step: usize, t: f64) -> SimError {
    let port = node.inputs().iter().position(Option::is_none).unwrap_or(0);
    SimError::DeadInput {
        block: node.label(),
        port,
        step,
        t,
    }
}

fn computation(node: &BlockNode, step: usize, t: f64, source: BlockError) -> SimError {
    SimError::Computation {
        block: node.label(),
        type_name: node.block().type_name(),
        step,
        t,
        source,
    }
}

fn gather_state(diagram: &Diagram, plan: &CompiledPlan) -> State {
    let mut x = State::zeros(plan.nstates());
    for node in diagram.blocks() {
        if node.nstates() > 0 {
            let range = plan.state_range(node.id(), node.nstates());
            x.rows_mut(range.start, range.len()).copy_from(node.state());
        }
    }
    x
}

fn scatter_state(diagram: &mut Diagram, plan: &CompiledPlan, x: &State) {
    let (nodes, _) = diagram.runtime_mut();
    for node in nodes.iter_mut() {
        if node.nstates() > 0 {
            let range = plan.state_range(node.id(), node.nstates());
            node.setstate(&x.as_slice()[range]);
        }
    }
}

fn owner_of_state(diagram: &Diagram, plan: &CompiledPlan, index: usize) -> BlockId {
    diagram
        .blocks()
        .iter()
        .find(|node| {
            plan.state_range(node.id(), node.nstates())
                .contains(&index)
        })
        .map_or(BlockId::from_index(0), BlockNode::id)
}

fn sink_samples(diagram: &Diagram, plan: &CompiledPlan) -> Vec<SinkSample> {
    plan.order()
        .iter()
        .filter_map(|&id| diagram.block(id))
        .filter(|node| node.block().is_sink())
        .map(|node| SinkSample {
            block: node.id(),
            inputs: node.inputs().iter().flatten().cloned().collect(),
        })
        .collect()
}
