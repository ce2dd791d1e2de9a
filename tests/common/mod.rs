//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use call_guard::combinators::Completion;
use call_guard::{Scheduler, Uint};
use proptest::test_runner::Config as ProptestConfig;

static INIT_LOGGING: Once = Once::new();

/// Installs a trace-level subscriber writing through the test harness.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Proptest configuration with a fixed case count.
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}

/// Records every invocation of a target with the tick it happened at.
#[derive(Clone)]
pub struct Recorder<T> {
    log: Rc<RefCell<Vec<(Uint, Vec<T>)>>>,
    clock: Scheduler,
}

impl<T: Clone + 'static> Recorder<T> {
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            clock: scheduler.clone(),
        }
    }

    /// A target that records its arguments.
    pub fn target(&self) -> impl Fn(&(), Vec<T>) + 'static {
        let log = self.log.clone();
        let clock = self.clock.clone();
        move |_: &(), args: Vec<T>| log.borrow_mut().push((clock.now(), args))
    }

    /// Every `(tick, args)` pair so far.
    pub fn calls(&self) -> Vec<(Uint, Vec<T>)> {
        self.log.borrow().clone()
    }

    /// Ticks of every invocation.
    pub fn ticks(&self) -> Vec<Uint> {
        self.log.borrow().iter().map(|(tick, _)| *tick).collect()
    }

    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }
}

/// Argument type for funnel tests: a job id or the injected completion.
#[derive(Clone, Debug)]
pub enum Arg {
    Job(u32),
    Done(Completion),
}

impl From<Completion> for Arg {
    fn from(done: Completion) -> Self {
        Arg::Done(done)
    }
}

impl Arg {
    pub fn job(&self) -> Option<u32> {
        match self {
            Arg::Job(id) => Some(*id),
            Arg::Done(_) => None,
        }
    }

    pub fn completion(&self) -> Option<&Completion> {
        match self {
            Arg::Done(done) => Some(done),
            Arg::Job(_) => None,
        }
    }
}

/// Splits funnel arguments into the job id and its completion.
pub fn job_and_completion(args: &[Arg]) -> (u32, Completion) {
    let id = args.iter().find_map(Arg::job).expect("job id argument");
    let done = args
        .iter()
        .find_map(Arg::completion)
        .cloned()
        .expect("completion argument");
    (id, done)
}
