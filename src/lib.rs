//!
//! A discrete event simulation engine.
//!
//! The engine drives a simulated system forward by firing events in
//! non-decreasing simulated time. Models subscribe sinks to event sources
//! (the six engine-owned ones or their own) and schedule events to describe
//! the system's dynamics; a [`RunPolicy`](crate::engine::RunPolicy) decides
//! how complete experiments are executed and when the run terminates,
//! optionally driven by the precision of monitored statistics.
//!
//! # Example
//!
//! ```
//! use desim::prelude::*;
//!
//! let mut sim = Builder::new().quiet().build(SingleRun::default());
//!
//! // A model: a customer arrives every second, for ten seconds.
//! let arrivals = EventSource::new("arrival");
//! let src = arrivals.clone();
//! sim.system_initialization_source().connect(move |_, ctx| {
//!     for i in 1..=10 {
//!         ctx.schedule(&src, SimTime::from(f64::from(i)));
//!     }
//! });
//!
//! let seen = std::rc::Rc::new(std::cell::Cell::new(0));
//! let counter = seen.clone();
//! arrivals.connect(move |_, _| counter.set(counter.get() + 1));
//!
//! sim.run().unwrap();
//! assert_eq!(seen.get(), 10);
//! assert_eq!(sim.simulated_time(), SimTime::from(10.0));
//! ```
//!

pub mod prelude;

pub mod engine;
pub mod logger;
pub mod qn;
pub mod stats;
pub mod time;
