use std::cell::{Cell, RefCell};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::callable::{Binding, Callable};

/// Count-gated wrapper: runs the target on every `ntimes`-th call, at most
/// `max_executions` times.
///
/// # Algorithm Behavior
///
/// - Each call increments the call counter.
/// - When the counter reaches `ntimes` the target runs, the counter resets to
///   zero and the execution counter increments.
/// - Once the execution counter reaches the cap, every later call is a no-op.
///
/// # Example
///
/// ```rust
/// use call_guard::Callable;
/// use call_guard::combinators::every;
///
/// let third = every(|_: &(), args: Vec<u32>| args[0], 3, None, None, None);
///
/// let fired: Vec<_> = (1..=7).map(|i| third.call(vec![i])).collect();
/// assert_eq!(fired, vec![None, None, Some(3), None, None, Some(6), None]);
/// ```
pub struct Every<F, C, A> {
    target: F,
    ntimes: u64,
    max_executions: Option<u64>,
    binding: Binding<C, A>,
    calls: Cell<u64>,
    executions: Cell<u64>,
}

impl<F, C, A> Every<F, C, A>
where
    F: Callable<C, A>,
    A: Clone,
{
    /// Creates a wrapper firing on every `ntimes`-th call.
    ///
    /// `max_executions == None` means no cap.
    ///
    /// # Panics
    ///
    /// Panics if `ntimes` is zero.
    pub fn new(target: F, ntimes: u64, max_executions: Option<u64>, binding: Binding<C, A>) -> Self {
        assert!(ntimes > 0, "ntimes must be greater than 0");

        Self {
            target,
            ntimes,
            max_executions,
            binding,
            calls: Cell::new(0),
            executions: Cell::new(0),
        }
    }

    /// Creates a wrapper from an [`EveryConfig`].
    ///
    /// # Panics
    ///
    /// Panics if `config.ntimes` is zero.
    pub fn from_config(target: F, config: EveryConfig, binding: Binding<C, A>) -> Self {
        Self::new(target, config.ntimes, config.max_executions, binding)
    }
}

impl<F, C, A> Every<F, C, A> {
    /// Returns the number of calls counted toward the next execution.
    pub fn calls(&self) -> u64 {
        self.calls.get()
    }

    /// Returns how many times the target ran.
    pub fn executions(&self) -> u64 {
        self.executions.get()
    }

    /// Returns `true` once the execution cap is reached.
    pub fn is_exhausted(&self) -> bool {
        self.max_executions
            .map_or(false, |cap| self.executions.get() >= cap)
    }
}

impl<F, C, A> Callable<C, A> for Every<F, C, A>
where
    F: Callable<C, A>,
    A: Clone,
{
    type Output = Option<F::Output>;

    fn invoke(&self, receiver: &C, args: Vec<A>) -> Option<F::Output> {
        let calls = self.calls.get().saturating_add(1);
        self.calls.set(calls);
        if calls < self.ntimes || self.is_exhausted() {
            return None;
        }

        self.calls.set(0);
        self.executions.set(self.executions.get() + 1);
        trace!(
            ntimes = self.ntimes,
            executions = self.executions.get(),
            "count threshold reached"
        );
        Some(self.binding.forward(&self.target, receiver, args))
    }
}

/// Configuration structure for creating an [`Every`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EveryConfig {
    /// Number of calls per execution.
    pub ntimes: u64,
    /// Cap on executions; `None` is unbounded.
    #[serde(default)]
    pub max_executions: Option<u64>,
}

impl EveryConfig {
    /// Creates a new configuration instance.
    pub fn new(ntimes: u64, max_executions: Option<u64>) -> Self {
        Self {
            ntimes,
            max_executions,
        }
    }
}

/// Returns `target` run on every `ntimes`-th call, at most `max_executions` times.
///
/// # Panics
///
/// Panics if `ntimes` is zero.
pub fn every<F, C, A>(
    target: F,
    ntimes: u64,
    max_executions: Option<u64>,
    bind: Option<C>,
    args: Option<Vec<A>>,
) -> Every<F, C, A>
where
    F: Callable<C, A>,
    A: Clone,
{
    Every::new(
        target,
        ntimes,
        max_executions,
        Binding::new().with_receiver(bind).with_args(args),
    )
}

/// Returns `target` run exactly once, on the `ntimes`-th call.
///
/// # Panics
///
/// Panics if `ntimes` is zero.
pub fn after<F, C, A>(target: F, ntimes: u64, bind: Option<C>, args: Option<Vec<A>>) -> Every<F, C, A>
where
    F: Callable<C, A>,
    A: Clone,
{
    every(target, ntimes, Some(1), bind, args)
}

/// Wrapper that runs the target on its first call and returns that result
/// on every call after.
///
/// A call made from inside the target while the first call is still running
/// runs the target again; the first result to finish is the one kept.
pub struct Once<F, C, A>
where
    F: Callable<C, A>,
{
    target: F,
    binding: Binding<C, A>,
    memo: RefCell<Option<F::Output>>,
}

impl<F, C, A> Once<F, C, A>
where
    F: Callable<C, A>,
{
    /// Creates a new wrapper.
    pub fn new(target: F, binding: Binding<C, A>) -> Self {
        Self {
            target,
            binding,
            memo: RefCell::new(None),
        }
    }

    /// Returns `true` once the target has run.
    pub fn has_run(&self) -> bool {
        self.memo.borrow().is_some()
    }
}

impl<F, C, A> Callable<C, A> for Once<F, C, A>
where
    F: Callable<C, A>,
    F::Output: Clone,
    A: Clone,
{
    type Output = F::Output;

    fn invoke(&self, receiver: &C, args: Vec<A>) -> F::Output {
        if let Some(memo) = self.memo.borrow().as_ref() {
            return memo.clone();
        }

        let value = self.binding.forward(&self.target, receiver, args);
        let mut memo = self.memo.borrow_mut();
        match memo.as_ref() {
            Some(first) => first.clone(),
            None => {
                *memo = Some(value.clone());
                value
            }
        }
    }
}

/// Returns `target` run at most once; later calls return the first result.
pub fn once<F, C, A>(target: F, bind: Option<C>, args: Option<Vec<A>>) -> Once<F, C, A>
where
    F: Callable<C, A>,
{
    Once::new(target, Binding::new().with_receiver(bind).with_args(args))
}
