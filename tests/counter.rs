mod common;

use std::cell::Cell;
use std::rc::Rc;

use call_guard::combinators::{after, every, once, Every, EveryConfig};
use call_guard::{Binding, Callable};
use common::init_test_logging;

#[test]
fn test_every_fires_on_each_multiple() {
    init_test_logging();
    let fifth = every(|_: &(), args: Vec<u32>| args[0], 5, None, None, None);

    let fired: Vec<u32> = (1..=23).filter_map(|i| fifth.call(vec![i])).collect();
    assert_eq!(fired, vec![5, 10, 15, 20]);
    assert_eq!(fifth.executions(), 4);
    assert_eq!(fifth.calls(), 3);
}

#[test]
fn test_every_one_forwards_each_call() {
    let each = every(|_: &(), args: Vec<u32>| args[0] * 2, 1, None, None, None);

    assert_eq!(each.call(vec![1]), Some(2));
    assert_eq!(each.call(vec![2]), Some(4));
}

#[test]
fn test_every_respects_execution_cap() {
    let runs = Rc::new(Cell::new(0));
    let r = runs.clone();
    let capped = every(move |_: &(), _: Vec<()>| r.set(r.get() + 1), 2, Some(3), None, None);

    for _ in 0..20 {
        capped.call(vec![]);
    }
    assert_eq!(runs.get(), 3);
    assert!(capped.is_exhausted());
}

#[test]
fn test_after_fires_exactly_once() {
    let runs = Rc::new(Cell::new(0));
    let r = runs.clone();
    let ready = after(move |_: &(), _: Vec<()>| r.set(r.get() + 1), 3, None, None);

    let fired: Vec<bool> = (0..10).map(|_| ready.call(vec![]).is_some()).collect();
    assert_eq!(
        fired,
        vec![false, false, true, false, false, false, false, false, false, false]
    );
    assert_eq!(runs.get(), 1);
}

#[test]
fn test_every_with_bound_args_and_receiver() {
    let tagged = every(
        |tag: &&str, args: Vec<u32>| format!("{}:{:?}", tag, args),
        2,
        None,
        Some("bound"),
        Some(vec![9]),
    );

    assert_eq!(tagged.invoke(&"call", vec![1]), None);
    assert_eq!(tagged.invoke(&"call", vec![2]), Some("bound:[9]".to_string()));
}

#[test]
#[should_panic(expected = "ntimes must be greater than 0")]
fn test_every_zero_panics() {
    every(|_: &(), _: Vec<()>| (), 0, None, None, None);
}

#[test]
fn test_every_from_config() {
    let config: EveryConfig = serde_json::from_str(r#"{ "ntimes": 4 }"#).unwrap();
    assert_eq!(config, EveryConfig::new(4, None));

    let gate = Every::from_config(|_: &(), _: Vec<()>| 1, config, Binding::none());
    let fired: Vec<_> = (0..8).map(|_| gate.call(vec![])).collect();
    assert_eq!(
        fired,
        vec![None, None, None, Some(1), None, None, None, Some(1)]
    );
}

#[test]
fn test_once_returns_first_result_forever() {
    let runs = Rc::new(Cell::new(0));
    let r = runs.clone();
    let init = once(
        move |_: &(), args: Vec<u32>| {
            r.set(r.get() + 1);
            args[0] * 100
        },
        None,
        None,
    );

    assert!(!init.has_run());
    assert_eq!(init.call(vec![1]), 100);
    assert_eq!(init.call(vec![2]), 100);
    assert_eq!(init.call(vec![3]), 100);
    assert_eq!(runs.get(), 1);
    assert!(init.has_run());
}

#[test]
fn test_once_with_bound_args() {
    let init = once(|_: &(), args: Vec<u32>| args.iter().sum::<u32>(), None, Some(vec![1, 2, 3]));

    assert_eq!(init.call(vec![100]), 6);
}
