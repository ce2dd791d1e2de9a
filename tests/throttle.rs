mod common;

use std::cell::RefCell;
use std::rc::Rc;

use call_guard::combinators::{periodical, throttle, Throttle, ThrottleConfig};
use call_guard::{Binding, Callable, Scheduler};
use common::{init_test_logging, Recorder};

#[test]
fn test_leading_edge_runs_immediately() {
    init_test_logging();
    let scheduler = Scheduler::new();
    let recorder = Recorder::new(&scheduler);
    let throttled = throttle(&scheduler, recorder.target(), 100, None, None);

    assert_eq!(throttled.call(vec![1]), Some(()));
    assert_eq!(recorder.calls(), vec![(0, vec![1])]);
    assert!(throttled.is_throttling());
}

#[test]
fn test_burst_delivers_leading_and_latest_trailing() {
    init_test_logging();
    let scheduler = Scheduler::new();
    let recorder = Recorder::new(&scheduler);
    let throttled = throttle(&scheduler, recorder.target(), 100, None, None);

    throttled.call(vec![1]);
    scheduler.advance_to(10);
    assert_eq!(throttled.call(vec![2]), None);
    scheduler.advance_to(50);
    assert_eq!(throttled.call(vec![3]), None);
    assert!(throttled.has_trailing());

    // Nothing more until the window closes
    scheduler.advance_to(99);
    assert_eq!(recorder.len(), 1);

    // Trailing edge carries the latest arguments
    scheduler.advance_to(100);
    assert_eq!(recorder.calls(), vec![(0, vec![1]), (100, vec![3])]);

    // Quiet afterwards: no third run
    scheduler.advance_to(1_000);
    assert_eq!(recorder.len(), 2);
    assert!(!throttled.is_throttling());
}

#[test]
fn test_single_call_has_no_trailing_edge() {
    let scheduler = Scheduler::new();
    let recorder = Recorder::new(&scheduler);
    let throttled = throttle(&scheduler, recorder.target(), 100, None, None);

    throttled.call(vec![1]);
    scheduler.advance_to(100);
    assert!(!throttled.is_throttling());

    scheduler.advance_to(500);
    assert_eq!(recorder.calls(), vec![(0, vec![1])]);
    assert!(scheduler.is_idle());
}

#[test]
fn test_periodical_stream_runs_twice_in_first_window_and_a_half() {
    init_test_logging();
    let scheduler = Scheduler::new();
    let count = Rc::new(RefCell::new(0));
    let c = count.clone();
    let throttled = throttle(
        &scheduler,
        move |_: &(), _: Vec<()>| *c.borrow_mut() += 1,
        1_000,
        None,
        None,
    );

    // Called every 50 ticks: leading at 50, trailing when the window closes at 1050
    let ticker = periodical(&scheduler, throttled.clone(), 50, None, None);
    scheduler.advance_to(1_500);
    assert_eq!(*count.borrow(), 2);

    ticker.cancel();
}

#[test]
fn test_continuous_stream_is_spaced_by_wait() {
    let scheduler = Scheduler::new();
    let recorder = Recorder::new(&scheduler);
    let throttled = throttle(&scheduler, recorder.target(), 100, None, None);

    for tick in (0..=1_000u64).step_by(10) {
        scheduler.advance_to(tick);
        throttled.call(vec![tick]);
    }
    scheduler.run_until_idle();

    let ticks = recorder.ticks();
    assert_eq!(ticks, (0..=1_100u64).step_by(100).collect::<Vec<_>>());
    for pair in ticks.windows(2) {
        assert!(pair[1] - pair[0] >= 100);
    }

    // The last call is the last delivery
    let calls = recorder.calls();
    assert_eq!(calls.last().map(|(_, args)| args.clone()), Some(vec![1_000]));
}

#[test]
fn test_returns_to_idle_after_quiet_period() {
    let scheduler = Scheduler::new();
    let recorder = Recorder::new(&scheduler);
    let throttled = throttle(&scheduler, recorder.target(), 100, None, None);

    throttled.call(vec![1]);
    scheduler.advance_to(10);
    throttled.call(vec![2]);

    // Trailing at 100 re-arms the idle reset until 200
    scheduler.advance_to(150);
    assert!(throttled.is_throttling());
    scheduler.advance_to(200);
    assert!(!throttled.is_throttling());

    // A new burst starts with a fresh leading edge
    scheduler.advance_to(250);
    assert_eq!(throttled.call(vec![3]), Some(()));
    assert_eq!(recorder.ticks(), vec![0, 100, 250]);
}

#[test]
fn test_bound_receiver_and_args_replace_call_site() {
    let scheduler = Scheduler::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let throttled = throttle(
        &scheduler,
        move |ctx: &&str, args: Vec<u32>| sink.borrow_mut().push((ctx.to_string(), args)),
        100,
        Some("bound"),
        Some(vec![7]),
    );

    throttled.invoke(&"caller", vec![1]);
    throttled.invoke(&"caller", vec![2]);
    scheduler.advance_by(100);

    assert_eq!(
        *seen.borrow(),
        vec![("bound".to_string(), vec![7]), ("bound".to_string(), vec![7])]
    );
}

#[test]
fn test_from_config() {
    let scheduler = Scheduler::new();
    let recorder = Recorder::<u32>::new(&scheduler);
    let config: ThrottleConfig = serde_json::from_str(r#"{ "wait": 250 }"#).unwrap();
    let throttled = Throttle::from_config(&scheduler, recorder.target(), config, Binding::none());

    assert_eq!(throttled.wait(), 250);
}

#[test]
fn test_dropping_throttle_cancels_its_timers() {
    let scheduler = Scheduler::new();
    let recorder = Recorder::new(&scheduler);
    let throttled = throttle(&scheduler, recorder.target(), 100, None, None);

    throttled.call(vec![1]);
    throttled.call(vec![2]);
    assert!(!scheduler.is_idle());

    drop(throttled);
    assert!(scheduler.is_idle());
    scheduler.advance_by(1_000);
    assert_eq!(recorder.len(), 1);
}
