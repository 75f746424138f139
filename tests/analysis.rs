use std::cell::Cell;
use std::rc::Rc;

use desim::prelude::*;

/// Counts firings of the core lifecycle sources.
struct LifecycleLog {
    begin: Rc<Cell<usize>>,
    init: Rc<Cell<usize>>,
    fin: Rc<Cell<usize>>,
    end: Rc<Cell<usize>>,
}

fn observe_lifecycle(engine: &Engine) -> LifecycleLog {
    let log = LifecycleLog {
        begin: Rc::new(Cell::new(0)),
        init: Rc::new(Cell::new(0)),
        fin: Rc::new(Cell::new(0)),
        end: Rc::new(Cell::new(0)),
    };

    let c = log.begin.clone();
    engine
        .begin_of_sim_source()
        .connect(move |_, _| c.set(c.get() + 1));
    let c = log.init.clone();
    engine
        .system_initialization_source()
        .connect(move |_, _| c.set(c.get() + 1));
    let c = log.fin.clone();
    engine
        .system_finalization_source()
        .connect(move |_, _| c.set(c.get() + 1));
    let c = log.end.clone();
    engine
        .end_of_sim_source()
        .connect(move |_, _| c.set(c.get() + 1));

    log
}

#[test]
fn fixed_replications_repeat_the_experiment() {
    let mut sim = Builder::new().quiet().build(IndependentReplications::fixed(3));
    let log = observe_lifecycle(sim.engine());

    // Each replication processes five ticks.
    let ticks = EventSource::new("tick");
    let src = ticks.clone();
    sim.system_initialization_source().connect(move |_, ctx| {
        for i in 1..=5 {
            ctx.schedule(&src, SimTime::from(f64::from(i)));
        }
    });

    let fired = Rc::new(Cell::new(0));
    let f = fired.clone();
    ticks.connect(move |_, _| f.set(f.get() + 1));

    sim.run().unwrap();

    assert_eq!(log.begin.get(), 1);
    assert_eq!(log.init.get(), 3);
    assert_eq!(log.fin.get(), 3);
    assert_eq!(log.end.get(), 1);
    assert_eq!(fired.get(), 15);
    assert!(sim.end_of_simulation());
}

#[test]
fn replication_analyzer_aggregates_replication_means() {
    let mut sim = Builder::new().quiet().build(IndependentReplications::fixed(3));

    let stat = sim
        .make_analyzable_statistic(StdDev::new(), 1e-6)
        .unwrap();

    let replication = Rc::new(Cell::new(0));

    let r = replication.clone();
    let ticks = EventSource::new("tick");
    let src = ticks.clone();
    sim.system_initialization_source().connect(move |_, ctx| {
        r.set(r.get() + 1);
        for i in 1..=4 {
            ctx.schedule(&src, SimTime::from(f64::from(i)));
        }
    });

    // Per-replication means: 10, 20, 30.
    let r = replication.clone();
    let s = stat.clone();
    ticks.connect(move |_, ctx| {
        let value = 10.0 * r.get() as f64;
        s.borrow_mut().collect_at(value, ctx.simulated_time());
    });

    sim.run().unwrap();

    let stat = stat.borrow();
    assert_eq!(stat.len(), 3);
    assert!((stat.mean() - 20.0).abs() < 1e-9);
    assert!((stat.min() - 10.0).abs() < 1e-9);
    assert!((stat.max() - 30.0).abs() < 1e-9);
}

#[test]
fn precise_estimates_stop_replications_early() {
    let mut sim = Builder::new()
        .quiet()
        .build(IndependentReplications::fixed(10));

    let stat = sim.make_analyzable_statistic(StdDev::new(), 0.9).unwrap();

    let init_count = Rc::new(Cell::new(0));
    let r = init_count.clone();
    let ticks = EventSource::new("tick");
    let src = ticks.clone();
    sim.system_initialization_source().connect(move |_, ctx| {
        r.set(r.get() + 1);
        ctx.schedule(&src, SimTime::from(1.0));
    });

    // Nearly identical replication means reach the generous precision
    // target after the minimum of two replications.
    let r = init_count.clone();
    let s = stat.clone();
    ticks.connect(move |_, ctx| {
        let value = 10.0 + 0.01 * r.get() as f64;
        s.borrow_mut().collect_at(value, ctx.simulated_time());
    });

    sim.run().unwrap();

    assert_eq!(init_count.get(), 2);
    assert!(sim.end_of_simulation());
}

#[test]
fn batch_means_reaches_precision_within_one_run() {
    let mut sim = Builder::new().quiet().build(BatchMeans::new(5));

    let stat = sim.make_analyzable_statistic(StdDev::new(), 0.05).unwrap();

    let ticks = EventSource::new("tick");
    let src = ticks.clone();
    sim.system_initialization_source().connect(move |_, ctx| {
        for i in 1..=200 {
            ctx.schedule(&src, SimTime::from(f64::from(i)));
        }
    });

    let flip = Cell::new(false);
    let s = stat.clone();
    ticks.connect(move |_, ctx| {
        let noise = if flip.replace(!flip.get()) { 0.01 } else { -0.01 };
        s.borrow_mut().collect_at(2.0 + noise, ctx.simulated_time());
    });

    sim.run().unwrap();

    // The run terminates well before the schedule runs dry.
    assert!(sim.num_user_events() < 200);
    assert!(sim.end_of_simulation());

    let stat = stat.borrow();
    assert!(stat.len() >= 2);
    assert!((stat.mean() - 2.0).abs() < 0.1);
}

#[test]
fn single_run_statistic_factory_uses_samples() {
    let mut sim = Builder::new().quiet().build(SingleRun::with_warmup(10));

    let stat = sim.make_analyzable_statistic(StdDev::new(), 0.05).unwrap();
    assert!(!stat.borrow().steady_state_entered());

    let ticks = EventSource::new("tick");
    let src = ticks.clone();
    sim.system_initialization_source().connect(move |_, ctx| {
        for i in 1..=500 {
            ctx.schedule(&src, SimTime::from(f64::from(i)));
        }
    });

    let flip = Cell::new(false);
    let s = stat.clone();
    ticks.connect(move |_, ctx| {
        let noise = if flip.replace(!flip.get()) { 0.1 } else { -0.1 };
        s.borrow_mut().collect_at(5.0 + noise, ctx.simulated_time());
    });

    sim.run().unwrap();

    assert!(sim.end_of_simulation());
    assert!(sim.num_user_events() < 500);
    assert!(stat.borrow().target_precision_reached());
}

struct NoAnalysis;

impl RunPolicy for NoAnalysis {
    fn do_run(sim: &mut Simulation<Self>) -> Result<(), EngineError> {
        sim.engine_mut().prepare_simulation();
        sim.engine_mut().initialize_system();
        sim.engine_mut().finalize_system();
        sim.engine_mut().finalize_simulation();
        Ok(())
    }
}

#[test]
fn policies_without_output_analysis_reject_statistics() {
    let mut sim = Builder::new().quiet().build(NoAnalysis);

    assert!(matches!(
        sim.make_analyzable_statistic(StdDev::new(), 0.05),
        Err(EngineError::Unsupported(_))
    ));

    sim.run().unwrap();
    assert!(sim.end_of_simulation());
}

#[test]
fn stop_now_halts_between_events() {
    let mut sim = Builder::new().quiet().build(SingleRun::default());
    sim.prepare_simulation();
    sim.initialize_system();

    let ticks = EventSource::new("tick");
    for i in 1..=10 {
        sim.schedule(&ticks.clone(), SimTime::from(f64::from(i)))
            .unwrap();
    }

    sim.advance();
    sim.advance();
    assert_eq!(sim.simulated_time(), SimTime::from(2.0));

    sim.stop_now();
    assert!(sim.end_of_simulation());

    // No further event fires.
    sim.advance();
    assert_eq!(sim.simulated_time(), SimTime::from(2.0));

    sim.finalize_simulation();
    assert_eq!(sim.pending_events(), 0);
}

#[test]
fn node_categories_name_their_stations() {
    assert_eq!(NodeCategory::DelayStation.to_string(), "delay-station");
    assert_eq!(NodeCategory::Source.to_string(), "source");
    assert_eq!(NodeCategory::ServiceStation.to_string(), "service-station");
    assert_eq!(NodeCategory::Sink.to_string(), "sink");
    assert_ne!(NodeCategory::Source, NodeCategory::Sink);
}
