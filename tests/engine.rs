use std::cell::{Cell, RefCell};
use std::rc::Rc;

use desim::prelude::*;

/// A statistic that counts collected datapoints and reaches steady state /
/// target precision at configured counts.
struct CountingStat {
    collected: usize,
    steady_after: usize,
    precise_after: usize,
    steady_time: Option<SimTime>,
}

impl CountingStat {
    fn new(steady_after: usize, precise_after: usize) -> Self {
        Self {
            collected: 0,
            steady_after,
            precise_after,
            steady_time: None,
        }
    }
}

impl Statistic for CountingStat {
    type Value = f64;

    fn collect_weighted_at(&mut self, _value: f64, _weight: f64, _sim_time: SimTime) {
        self.collected += 1;
    }

    fn len(&self) -> usize {
        self.collected
    }
    fn sum(&self) -> f64 {
        self.collected as f64
    }
    fn sqrtsum(&self) -> f64 {
        self.collected as f64
    }
    fn min(&self) -> f64 {
        0.0
    }
    fn max(&self) -> f64 {
        0.0
    }
    fn mean(&self) -> f64 {
        1.0
    }
    fn std_derivation(&self) -> f64 {
        0.0
    }
    fn variance(&self) -> f64 {
        0.0
    }

    fn reset(&mut self) {
        self.collected = 0;
        self.steady_time = None;
    }
}

impl AnalyzableStatistic for CountingStat {
    fn enabled(&self) -> bool {
        true
    }

    fn steady_state_entered(&self) -> bool {
        self.collected >= self.steady_after
    }

    fn steady_state_enter_time(&mut self, time: SimTime) {
        assert!(self.steady_time.is_none(), "entry time recorded twice");
        self.steady_time = Some(time);
    }

    fn relative_precision(&self) -> f64 {
        if self.collected >= self.precise_after {
            0.0
        } else {
            f64::INFINITY
        }
    }

    fn target_relative_precision(&self) -> f64 {
        0.05
    }

    fn initialize_for_experiment(&mut self) {}
}

#[test]
fn empty_run_fires_core_events_in_order() {
    let mut sim = Builder::new().quiet().build(SingleRun::default());

    let log = Rc::new(RefCell::new(Vec::new()));
    for (source, name) in [
        (sim.begin_of_sim_source(), "begin-of-simulation"),
        (sim.system_initialization_source(), "system-initialization"),
        (sim.system_finalization_source(), "system-finalization"),
        (sim.end_of_sim_source(), "end-of-simulation"),
    ] {
        let log = log.clone();
        source.connect(move |event, _| {
            log.borrow_mut().push((name, event.fire_time()));
        });
    }

    sim.run().unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            ("begin-of-simulation", SimTime::ZERO),
            ("system-initialization", SimTime::ZERO),
            ("system-finalization", SimTime::ZERO),
            ("end-of-simulation", SimTime::ZERO),
        ]
    );
    assert_eq!(sim.simulated_time(), SimTime::ZERO);
    assert!(sim.end_of_simulation());
    assert_eq!(sim.num_events(), 4);
    assert_eq!(sim.num_user_events(), 0);
}

#[test]
fn simultaneous_events_fire_in_schedule_order() {
    let mut sim = Builder::new().quiet().build(SingleRun::default());

    let source = EventSource::new("user");
    let src = source.clone();
    sim.system_initialization_source().connect(move |_, ctx| {
        ctx.schedule_with(&src, SimTime::from(5.0), "A");
        ctx.schedule_with(&src, SimTime::from(5.0), "B");
    });

    let log = Rc::new(RefCell::new(Vec::new()));
    let l = log.clone();
    source.connect(move |event, ctx| {
        let tag = *event.payload::<&str>().unwrap();
        assert_eq!(ctx.simulated_time(), event.fire_time());
        l.borrow_mut().push((tag, event.fire_time()));
        assert!(ctx.last_event_time() <= ctx.simulated_time());
    });

    sim.run().unwrap();

    assert_eq!(
        *log.borrow(),
        vec![("A", SimTime::from(5.0)), ("B", SimTime::from(5.0))]
    );
    assert_eq!(sim.last_event_time(), SimTime::from(5.0));
    assert_eq!(sim.num_user_events(), 2);
}

#[test]
fn reschedule_forward_fires_once_at_new_time() {
    let mut sim = Builder::new().quiet().build(SingleRun::default());

    let source = EventSource::new("user");
    let src = source.clone();
    sim.system_initialization_source().connect(move |_, ctx| {
        let handle = ctx.schedule(&src, SimTime::from(10.0)).unwrap();
        ctx.reschedule(&handle, SimTime::from(20.0));
    });

    let fired = Rc::new(RefCell::new(Vec::new()));
    let f = fired.clone();
    source.connect(move |event, _| f.borrow_mut().push(event.fire_time()));

    sim.run().unwrap();

    assert_eq!(*fired.borrow(), vec![SimTime::from(20.0)]);
    assert_eq!(sim.simulated_time(), SimTime::from(20.0));
}

#[test]
fn past_time_schedule_clamps_to_clock() {
    let mut sim = Builder::new().quiet().build(SingleRun::default());

    let source = EventSource::new("user");
    let src = source.clone();
    sim.system_initialization_source().connect(move |_, ctx| {
        ctx.schedule(&src, SimTime::from(3.0));
    });

    let fired = Rc::new(RefCell::new(Vec::new()));
    let f = fired.clone();
    let src = source.clone();
    let once = Cell::new(false);
    source.connect(move |event, ctx| {
        f.borrow_mut().push(event.fire_time());
        if !once.replace(true) {
            // Asking for t=1 at clock 3 clamps to the clock.
            let handle = ctx.schedule(&src, SimTime::from(1.0)).unwrap();
            assert_eq!(handle.fire_time(), SimTime::from(3.0));
        }
    });

    sim.run().unwrap();

    assert_eq!(*fired.borrow(), vec![SimTime::from(3.0), SimTime::from(3.0)]);
    assert_eq!(sim.last_event_time(), SimTime::from(3.0));
}

#[test]
fn disabled_source_rejects_schedules() {
    // Route the soft warnings of this scenario through the default logger.
    let _ = desim::logger::StandardLogger::setup();

    let mut sim = Builder::new().quiet().build(SingleRun::default());

    let source = EventSource::new("disabled");
    source.disable();

    let rejected = Rc::new(Cell::new(false));
    let src = source.clone();
    let r = rejected.clone();
    sim.system_initialization_source().connect(move |_, ctx| {
        r.set(ctx.schedule(&src, SimTime::from(5.0)).is_none());
        assert!(!ctx.end_of_simulation());
    });

    let fired = Rc::new(Cell::new(0));
    let f = fired.clone();
    source.connect(move |_, _| f.set(f.get() + 1));

    sim.run().unwrap();

    assert!(rejected.get());
    assert_eq!(fired.get(), 0);
    assert_eq!(sim.num_user_events(), 0);
    assert_eq!(sim.simulated_time(), SimTime::ZERO);
}

#[test]
fn disabled_source_skips_pending_events() {
    let mut sim = Builder::new().quiet().build(SingleRun::default());
    sim.prepare_simulation();
    sim.initialize_system();

    let skipped = EventSource::new("skipped");
    let alive = EventSource::new("alive");

    let s = skipped.clone();
    sim.schedule(&s, SimTime::from(1.0)).unwrap();
    sim.schedule(&alive, SimTime::from(2.0)).unwrap();

    let fired = Rc::new(RefCell::new(Vec::new()));
    let f = fired.clone();
    skipped.connect(move |_, _| f.borrow_mut().push("skipped"));
    let f = fired.clone();
    alive.connect(move |_, _| f.borrow_mut().push("alive"));

    // The source is disabled after scheduling but before firing.
    skipped.disable();

    let events_before = sim.num_events();
    sim.advance();
    // The skipped event is discarded without advancing clock or counters.
    assert_eq!(sim.num_events(), events_before);
    assert_eq!(sim.simulated_time(), SimTime::ZERO);

    sim.advance();
    assert_eq!(*fired.borrow(), vec!["alive"]);
    assert_eq!(sim.simulated_time(), SimTime::from(2.0));
    assert_eq!(sim.num_user_events(), 1);
}

#[test]
fn precision_stop_terminates_the_run() {
    let mut sim = Builder::new().quiet().build(SingleRun::default());

    let stat = stat_ref(CountingStat::new(50, 100));
    sim.register_statistic(stat.clone());

    let heartbeat = EventSource::new("heartbeat");
    let src = heartbeat.clone();
    sim.system_initialization_source().connect(move |_, ctx| {
        for i in 1..=1000 {
            ctx.schedule(&src, SimTime::from(f64::from(i)));
        }
    });

    let stat_handle = stat.clone();
    heartbeat.connect(move |_, ctx| {
        stat_handle
            .borrow_mut()
            .collect_at(1.0, ctx.simulated_time());
    });

    sim.run().unwrap();

    assert!(sim.end_of_simulation());
    assert_eq!(sim.simulated_time(), SimTime::from(100.0));
    assert_eq!(sim.num_user_events(), 100);
    assert_eq!(stat.borrow().len(), 100);
}

#[test]
fn steady_state_entry_time_recorded_once() {
    let mut sim = Builder::new().quiet().build(SingleRun::default());

    let typed = Rc::new(RefCell::new(CountingStat::new(50, 100)));
    let handle: StatRef = typed.clone();
    sim.register_statistic(handle);

    let heartbeat = EventSource::new("heartbeat");
    let src = heartbeat.clone();
    sim.system_initialization_source().connect(move |_, ctx| {
        for i in 1..=200 {
            ctx.schedule(&src, SimTime::from(f64::from(i)));
        }
    });

    let stat_handle = typed.clone();
    heartbeat.connect(move |_, ctx| {
        stat_handle
            .borrow_mut()
            .collect_at(1.0, ctx.simulated_time());
    });

    sim.run().unwrap();

    // The 50th heartbeat fires at t=50; the transition is observed by the
    // statistic monitor of that very firing.
    assert_eq!(typed.borrow().steady_time, Some(SimTime::from(50.0)));
}

#[test]
fn stop_at_time_schedules_end_of_simulation() {
    let mut sim = Builder::new().quiet().build(SingleRun::default());
    sim.prepare_simulation();
    sim.initialize_system();

    let ticks = EventSource::new("tick");
    for i in 1..=10 {
        sim.schedule(&ticks.clone(), SimTime::from(f64::from(i)))
            .unwrap();
    }

    let fired = Rc::new(Cell::new(0));
    let f = fired.clone();
    ticks.connect(move |_, _| f.set(f.get() + 1));

    sim.stop_at_time(SimTime::from(5.0)).unwrap();

    while !sim.end_of_simulation() && sim.pending_events() > 0 {
        sim.advance();
    }

    // Ticks at t=1..=5 fire, then the end-of-simulation event.
    assert_eq!(fired.get(), 5);
    assert_eq!(sim.simulated_time(), SimTime::from(5.0));
    assert!(sim.end_of_simulation());

    // Stopping in the past is a logic error.
    assert!(matches!(
        sim.stop_at_time(SimTime::from(1.0)),
        Err(EngineError::LogicError(_))
    ));
}

#[test]
fn advance_on_empty_list_is_a_no_op() {
    let mut sim = Builder::new().quiet().build(SingleRun::default());
    sim.prepare_simulation();

    let fired = sim.num_events();
    sim.advance();
    sim.advance();

    assert_eq!(sim.num_events(), fired);
    assert_eq!(sim.simulated_time(), SimTime::ZERO);
}

#[test]
fn schedule_at_current_time_fires_next() {
    let mut sim = Builder::new().quiet().build(SingleRun::default());

    let source = EventSource::new("user");
    let src = source.clone();
    sim.system_initialization_source().connect(move |_, ctx| {
        ctx.schedule(&src, SimTime::from(5.0));
    });

    let fired = Rc::new(RefCell::new(Vec::new()));
    let f = fired.clone();
    let src = source.clone();
    let once = Cell::new(false);
    source.connect(move |event, ctx| {
        f.borrow_mut().push(event.fire_time());
        if !once.replace(true) {
            ctx.schedule(&src, ctx.simulated_time());
        }
    });

    sim.run().unwrap();

    assert_eq!(*fired.borrow(), vec![SimTime::from(5.0), SimTime::from(5.0)]);
}

#[test]
fn statistic_registry_is_identity_keyed() {
    let mut sim = Builder::new().quiet().build(SingleRun::default());

    let a = stat_ref(CountingStat::new(0, 1));
    let b = stat_ref(CountingStat::new(0, 1));

    sim.register_statistic(a.clone());
    assert_eq!(sim.num_statistics(), 1);

    // Re-registering the same handle does not duplicate the entry.
    sim.register_statistic(a.clone());
    assert_eq!(sim.num_statistics(), 1);

    assert!(matches!(
        sim.unregister_statistic(&b),
        Err(EngineError::InvalidArgument(_))
    ));

    sim.unregister_statistic(&a).unwrap();
    assert_eq!(sim.num_statistics(), 0);

    sim.register_statistic(b);
    sim.clear_statistics();
    assert_eq!(sim.num_statistics(), 0);
}

#[test]
fn run_limit_ends_the_simulation() {
    let mut sim = Builder::new()
        .quiet()
        .max_time(SimTime::from(5.0))
        .build(SingleRun::default());

    let ticks = EventSource::new("tick");
    let src = ticks.clone();
    sim.system_initialization_source().connect(move |_, ctx| {
        for i in 1..=100 {
            ctx.schedule(&src, SimTime::from(f64::from(i)));
        }
    });

    let fired = Rc::new(Cell::new(0));
    let f = fired.clone();
    ticks.connect(move |_, _| f.set(f.get() + 1));

    sim.run().unwrap();

    assert_eq!(fired.get(), 5);
    assert!(sim.end_of_simulation());
}
