use bf_blocks::{Constant, Gain, Integrator, LtiSiso, Recorder, RecorderHandle, Step, Sum};
use bf_graph::{Block, Diagram};
use bf_sim::{Executor, IntegratorType, RunRecord, SimOptions};

/// demand -> sum(+-) -> gain(10) -> plant 0.5/(2s+1) -> scope, with plant fed back.
fn feedback_loop() -> (Diagram, RecorderHandle) {
    let scope = Recorder::new(2);
    let history = scope.handle();

    let mut d = Diagram::named("step response");
    let demand = d.add_named("demand", Block::source(Step::new(1.0)));
    let err = d.add_block(Block::function(Sum::new("+-").unwrap()));
    let gain = d.add_block(Block::function(Gain::new(10.0)));
    let plant = d.add_named(
        "plant",
        Block::transfer(LtiSiso::new(&[0.5], &[2.0, 1.0]).unwrap()),
    );
    let scope = d.add_named("scope", Block::sink(scope));

    d.connect_all(demand, &[(err, 0).into(), (scope, 1).into()])
        .unwrap();
    d.connect(plant, (err, 1)).unwrap();
    d.connect(err, gain).unwrap();
    d.connect(gain, plant).unwrap();
    d.connect(plant, (scope, 0)).unwrap();
    (d, history)
}

fn simulate(d: &mut Diagram, opts: SimOptions) -> RunRecord {
    let plan = d.compile().unwrap();
    let mut exec = Executor::new(d, plan, opts).unwrap();
    exec.run_to_end().unwrap()
}

fn opts() -> SimOptions {
    SimOptions {
        dt: 0.01,
        t_end: 5.0,
        ..SimOptions::default()
    }
}

#[test]
fn closed_loop_step_settles_at_five_sixths() {
    let (mut d, history) = feedback_loop();
    let record = simulate(&mut d, opts());

    assert_eq!(record.t.len(), 501);
    assert!((record.t[500] - 5.0).abs() < 1e-9);

    let y = history.port(0);
    assert_eq!(y.len(), 501);
    assert_eq!(y[0], 0.0);
    for pair in y.windows(2) {
        assert!(pair[1] >= pair[0] - 1e-12, "output decreased: {pair:?}");
    }
    assert!((y[500] - 5.0 / 6.0).abs() < 1e-4, "final value {}", y[500]);

    // Demand is recorded on the second scope port.
    let demand = history.port(1);
    assert_eq!(demand[99], 0.0);
    assert_eq!(demand[100], 1.0);
}

#[test]
fn recorder_and_run_record_agree() {
    let (mut d, history) = feedback_loop();
    let record = simulate(&mut d, opts());
    assert_eq!(record.sinks.len(), 1);
    assert_eq!(record.sinks[0].label, "recorder.scope");
    assert_eq!(record.sinks[0].port(0), history.port(0));
    assert_eq!(record.t, history.times());
}

#[test]
fn repeated_runs_are_bit_identical() {
    let (mut a, _) = feedback_loop();
    let (mut b, _) = feedback_loop();
    assert_eq!(simulate(&mut a, opts()), simulate(&mut b, opts()));
}

#[test]
fn euler_also_converges() {
    let (mut d, history) = feedback_loop();
    let options = SimOptions {
        integrator: IntegratorType::ForwardEuler,
        ..opts()
    };
    simulate(&mut d, options);
    let y = history.port(0);
    assert!((y[500] - 5.0 / 6.0).abs() < 1e-3);
}

#[test]
fn zero_derivative_holds_state() {
    let scope = Recorder::new(1);
    let history = scope.handle();

    let mut d = Diagram::new();
    let zero = d.add_block(Block::source(Constant::new(0.0)));
    let int = d.add_block(Block::transfer(Integrator::new(3.0)));
    let sink = d.add_block(Block::sink(scope));
    d.connect(zero, int).unwrap();
    d.connect(int, sink).unwrap();

    simulate(
        &mut d,
        SimOptions {
            dt: 0.1,
            t_end: 2.0,
            ..SimOptions::default()
        },
    );
    let x = history.port(0);
    assert_eq!(x.len(), 21);
    assert!(x.iter().all(|&v| v == 3.0));
}
