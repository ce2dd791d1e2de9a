mod common;

use std::cell::Cell;
use std::rc::Rc;

use call_guard::combinators::wait_events;
use call_guard::{CombinatorError, Scheduler};
use common::init_test_logging;

fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
    let fired = Rc::new(Cell::new(0));
    let f = fired.clone();
    (fired, move || f.set(f.get() + 1))
}

#[test]
fn test_fires_once_all_events_are_done() {
    init_test_logging();
    let (fired, on_all) = counter();
    let group = wait_events(on_all);

    let a = group.event().unwrap();
    let b = group.event().unwrap();
    let c = group.event().unwrap();
    assert_eq!(group.pending(), 3);

    b.done();
    a.done();
    assert_eq!(fired.get(), 0);

    c.done();
    assert_eq!(fired.get(), 1);
    assert!(group.is_fired());
    assert_eq!(group.registered(), 3);
}

#[test]
fn test_events_registered_while_others_pend() {
    let (fired, on_all) = counter();
    let group = wait_events(on_all);

    let first = group.event().unwrap();
    let second = group.event().unwrap();
    first.done();
    let third = group.event().unwrap();
    second.done();
    assert_eq!(fired.get(), 0);

    third.done();
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_group_closes_after_firing() {
    let (fired, on_all) = counter();
    let group = wait_events(on_all);

    group.event().unwrap().done();
    assert_eq!(fired.get(), 1);
    assert_eq!(group.event().unwrap_err(), CombinatorError::WaitGroupClosed);
}

#[test]
fn test_never_fires_without_events() {
    let (fired, on_all) = counter();
    let group = wait_events(on_all);

    assert_eq!(group.pending(), 0);
    assert!(!group.is_fired());
    assert_eq!(fired.get(), 0);
}

#[test]
fn test_events_completed_by_timers() {
    let scheduler = Scheduler::new();
    let done_at = Rc::new(Cell::new(None));
    let d = done_at.clone();
    let clock = scheduler.clone();
    let group = wait_events(move || d.set(Some(clock.now())));

    for delay in [300, 100, 200] {
        let event = group.event().unwrap();
        let mut event = Some(event);
        scheduler.set_timeout(delay, move || {
            if let Some(event) = event.take() {
                event.done();
            }
        });
    }

    scheduler.advance_to(250);
    assert_eq!(done_at.get(), None);
    assert_eq!(group.pending(), 1);

    scheduler.run_until_idle();
    assert_eq!(done_at.get(), Some(300));
}
