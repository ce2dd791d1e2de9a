mod common;

use std::cell::RefCell;
use std::rc::Rc;

use call_guard::combinators::{nth, times, AllDone, Nth, NthConfig};
use call_guard::{Binding, Callable, CombinatorError, Scheduler, Spacing, Uint};
use common::{init_test_logging, Recorder};

fn collector<R: 'static>() -> (Rc<RefCell<Vec<Vec<R>>>>, AllDone<R>) {
    let batches = Rc::new(RefCell::new(Vec::new()));
    let sink = batches.clone();
    (batches, Box::new(move |results: Vec<R>| sink.borrow_mut().push(results)))
}

/// Target returning the tick it ran at.
fn tick_of(scheduler: &Scheduler) -> impl Fn(&(), Vec<()>) -> Uint + 'static {
    let clock = scheduler.clone();
    move |_: &(), _: Vec<()>| clock.now()
}

#[test]
fn test_spaced_runs_after_first_delay() {
    init_test_logging();
    let scheduler = Scheduler::new();
    let (batches, on_done) = collector();
    let poll = nth(
        &scheduler,
        tick_of(&scheduler),
        4,
        Spacing::Ticks(200),
        Spacing::Ticks(500),
        Some(on_done),
        None,
        None,
    );

    assert_eq!(poll.call(vec![]), Ok(()));
    assert!(poll.is_running());
    assert_eq!(poll.delivered(), 0);

    scheduler.advance_to(700);
    assert_eq!(poll.delivered(), 2);
    assert!(batches.borrow().is_empty());

    scheduler.advance_to(5_000);
    assert_eq!(*batches.borrow(), vec![vec![500, 700, 900, 1_100]]);
    assert!(!poll.is_running());
    assert!(scheduler.is_idle());
}

#[test]
fn test_immediate_runs_complete_synchronously() {
    let scheduler = Scheduler::new();
    let recorder = Recorder::new(&scheduler);
    let (batches, on_done) = collector();
    let burst = nth(
        &scheduler,
        recorder.target(),
        3,
        Spacing::Immediate,
        Spacing::Immediate,
        Some(on_done),
        None,
        Some(vec![7]),
    );

    burst.call(vec![1]).unwrap();

    assert_eq!(recorder.calls(), vec![(0, vec![7]), (0, vec![7]), (0, vec![7])]);
    assert_eq!(*batches.borrow(), vec![vec![(), (), ()]]);
    assert!(!burst.is_running());
    assert!(scheduler.is_idle());
}

#[test]
fn test_call_while_running_is_refused() {
    let scheduler = Scheduler::new();
    let recorder = Recorder::new(&scheduler);
    let seq = nth(
        &scheduler,
        recorder.target(),
        3,
        Spacing::Ticks(100),
        Spacing::Immediate,
        None,
        None,
        None,
    );

    seq.call(vec![1]).unwrap();
    assert_eq!(
        seq.call(vec![2]),
        Err(CombinatorError::SequenceInProgress {
            delivered: 1,
            total: 3
        })
    );

    scheduler.run_until_idle();
    assert_eq!(
        recorder.calls(),
        vec![(0, vec![1]), (100, vec![1]), (200, vec![1])]
    );
}

#[test]
fn test_call_after_completion_starts_fresh_sequence() {
    let scheduler = Scheduler::new();
    let (batches, on_done) = collector();
    let seq = nth(
        &scheduler,
        tick_of(&scheduler),
        2,
        Spacing::Ticks(10),
        Spacing::Immediate,
        Some(on_done),
        None,
        None,
    );

    seq.call(vec![]).unwrap();
    scheduler.run_until_idle();
    scheduler.advance_to(1_000);
    seq.call(vec![]).unwrap();
    scheduler.run_until_idle();

    assert_eq!(*batches.borrow(), vec![vec![0, 10], vec![1_000, 1_010]]);
}

#[test]
fn test_single_run_with_delay_arms_no_interval() {
    let scheduler = Scheduler::new();
    let (batches, on_done) = collector();
    let seq = nth(
        &scheduler,
        tick_of(&scheduler),
        1,
        Spacing::Ticks(100),
        Spacing::Immediate,
        Some(on_done),
        None,
        None,
    );

    seq.call(vec![]).unwrap();
    assert_eq!(*batches.borrow(), vec![vec![0]]);
    assert!(scheduler.is_idle());
}

#[test]
fn test_cancel_aborts_sequence_without_callback() {
    let scheduler = Scheduler::new();
    let (batches, on_done) = collector();
    let seq = nth(
        &scheduler,
        tick_of(&scheduler),
        5,
        Spacing::Ticks(100),
        Spacing::Ticks(50),
        Some(on_done),
        None,
        None,
    );

    seq.call(vec![]).unwrap();
    scheduler.advance_to(150);
    assert_eq!(seq.delivered(), 2);

    assert!(seq.cancel());
    assert!(!seq.cancel());
    assert!(scheduler.is_idle());

    scheduler.advance_by(1_000);
    assert!(batches.borrow().is_empty());
}

#[test]
fn test_cancel_before_first_run() {
    let scheduler = Scheduler::new();
    let recorder = Recorder::<()>::new(&scheduler);
    let seq = nth(
        &scheduler,
        recorder.target(),
        2,
        Spacing::Immediate,
        Spacing::Ticks(500),
        None,
        None,
        None,
    );

    seq.call(vec![]).unwrap();
    assert!(seq.cancel());
    scheduler.advance_by(1_000);
    assert_eq!(recorder.len(), 0);
}

#[test]
fn test_sequence_outlives_handle() {
    let scheduler = Scheduler::new();
    let (batches, on_done) = collector();
    let seq = nth(
        &scheduler,
        tick_of(&scheduler),
        3,
        Spacing::Ticks(10),
        Spacing::Immediate,
        Some(on_done),
        None,
        None,
    );

    seq.call(vec![]).unwrap();
    drop(seq);
    scheduler.run_until_idle();
    assert_eq!(*batches.borrow(), vec![vec![0, 10, 20]]);
}

#[test]
#[should_panic(expected = "ntimes must be greater than 0")]
fn test_zero_runs_panics() {
    let scheduler = Scheduler::new();
    let _ = nth(
        &scheduler,
        |_: &(), _: Vec<()>| (),
        0,
        Spacing::Immediate,
        Spacing::Immediate,
        None,
        None,
        None,
    );
}

#[test]
fn test_from_config() {
    let config: NthConfig =
        serde_json::from_str(r#"{ "ntimes": 2, "delay": { "ticks": 30 } }"#).unwrap();
    assert_eq!(
        config,
        NthConfig::new(2, Spacing::Ticks(30), Spacing::Immediate)
    );

    let scheduler = Scheduler::new();
    let (batches, on_done) = collector();
    let seq = Nth::from_config(
        &scheduler,
        tick_of(&scheduler),
        config,
        Some(on_done),
        Binding::none(),
    );
    seq.call(vec![]).unwrap();
    scheduler.run_until_idle();
    assert_eq!(*batches.borrow(), vec![vec![0, 30]]);
}

#[test]
fn test_times_passes_run_index() {
    let scheduler = Scheduler::new();
    let (batches, on_done) = collector();
    let clock = scheduler.clone();
    let seq = times(
        &scheduler,
        move |i| (i, clock.now()),
        Some(on_done),
        3,
        Spacing::Ticks(40),
    );

    assert!(seq.is_running());
    scheduler.run_until_idle();
    assert_eq!(*batches.borrow(), vec![vec![(0, 0), (1, 40), (2, 80)]]);
}

#[test]
fn test_times_immediate() {
    let scheduler = Scheduler::new();
    let (batches, on_done) = collector();
    let seq = times(&scheduler, |i| i * i, Some(on_done), 4, Spacing::Immediate);

    assert!(!seq.is_running());
    assert_eq!(*batches.borrow(), vec![vec![0, 1, 4, 9]]);
}

#[test]
fn test_times_handle_cancels_remaining_runs() {
    let scheduler = Scheduler::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let (batches, on_done) = collector();
    let seq = times(
        &scheduler,
        move |i| sink.borrow_mut().push(i),
        Some(on_done),
        5,
        Spacing::Ticks(10),
    );

    scheduler.advance_to(20);
    assert_eq!(seq.delivered(), 3);
    assert!(seq.cancel());
    assert!(!seq.is_running());

    scheduler.advance_by(1_000);
    assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    assert!(batches.borrow().is_empty());
    assert!(scheduler.is_idle());
}
