use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::callable::{Binding, Callable, Invocation};
use crate::error::{CombinatorError, CombinatorResult};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::types::Spacing;

/// Callback receiving every result of a finished sequence, in order.
pub type AllDone<R> = Box<dyn Fn(Vec<R>)>;

/// Bounded repetition: one call runs the target `ntimes` times.
///
/// # Algorithm Behavior
///
/// - A call starts a sequence. After `first_delay` (or synchronously for
///   [`Spacing::Immediate`]) the target runs once, then `ntimes - 1` more
///   times, back-to-back or `delay` ticks apart on a periodic timer.
/// - Every result is appended to the sequence's result list.
/// - After the last run the periodic timer is cancelled and `on_all_done`
///   receives the full list.
/// - Calling while a sequence runs is refused with
///   [`CombinatorError::SequenceInProgress`]. Calling after it finished
///   starts a fresh sequence with an empty result list.
///
/// A running sequence keeps its own state alive through the scheduler, so
/// dropping the `Nth` handle does not stop it; use [`Nth::cancel`].
///
/// # Example
///
/// ```rust
/// use call_guard::{Callable, Scheduler, Spacing};
/// use call_guard::combinators::nth;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let scheduler = Scheduler::new();
/// let collected = Rc::new(RefCell::new(Vec::new()));
/// let sink = collected.clone();
/// let clock = scheduler.clone();
///
/// let poll = nth(
///     &scheduler,
///     move |_: &(), _: Vec<()>| clock.now(),
///     3,
///     Spacing::Ticks(200),
///     Spacing::Ticks(500),
///     Some(Box::new(move |results| *sink.borrow_mut() = results)),
///     None,
///     None,
/// );
///
/// poll.call(vec![]).unwrap();
/// assert!(poll.call(vec![]).is_err());
///
/// scheduler.advance_by(1_000);
/// assert_eq!(*collected.borrow(), vec![500, 700, 900]);
/// ```
pub struct Nth<F, C, A>
where
    F: Callable<C, A>,
{
    inner: Rc<NthInner<F, C, A>>,
}

struct NthInner<F, C, A>
where
    F: Callable<C, A>,
{
    target: F,
    ntimes: usize,
    delay: Spacing,
    first_delay: Spacing,
    on_all_done: Option<AllDone<F::Output>>,
    binding: Binding<C, A>,
    scheduler: Scheduler,
    run: RefCell<Option<NthRun<C, A, F::Output>>>,
}

struct NthRun<C, A, R> {
    invocation: Invocation<C, A>,
    results: Vec<R>,
    first: Option<TimerHandle>,
    interval: Option<TimerHandle>,
}

impl<F, C, A> Clone for Nth<F, C, A>
where
    F: Callable<C, A>,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<F, C, A> NthInner<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + 'static,
{
    fn begin(self: &Rc<Self>) {
        if !self.step() {
            return;
        }

        match self.delay.ticks() {
            None => while self.step() {},
            Some(delay) => {
                let inner = self.clone();
                let interval = self.scheduler.set_interval(delay, move || {
                    inner.step();
                });
                if let Some(run) = self.run.borrow_mut().as_mut() {
                    run.interval = Some(interval);
                }
            }
        }
    }

    /// Runs the target once. Returns `true` while more runs remain.
    fn step(&self) -> bool {
        let invocation = match self.run.borrow().as_ref() {
            Some(run) => run.invocation.clone(),
            None => return false,
        };
        let value = invocation.deliver(&self.target);

        let mut slot = self.run.borrow_mut();
        let complete = match slot.as_mut() {
            Some(run) => {
                run.results.push(value);
                run.results.len() >= self.ntimes
            }
            None => return false,
        };
        if !complete {
            return true;
        }
        let finished = slot.take();
        drop(slot);

        if let Some(run) = finished {
            if let Some(interval) = run.interval {
                interval.cancel();
            }
            debug!(ntimes = self.ntimes, "nth sequence complete");
            if let Some(on_all_done) = &self.on_all_done {
                on_all_done(run.results);
            }
        }
        false
    }
}

impl<F, C, A> Nth<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + 'static,
{
    /// Creates a repetition wrapper.
    ///
    /// # Panics
    ///
    /// Panics if `ntimes` is zero.
    pub fn new(
        scheduler: &Scheduler,
        target: F,
        ntimes: usize,
        delay: Spacing,
        first_delay: Spacing,
        on_all_done: Option<AllDone<F::Output>>,
        binding: Binding<C, A>,
    ) -> Self {
        assert!(ntimes > 0, "ntimes must be greater than 0");

        Self {
            inner: Rc::new(NthInner {
                target,
                ntimes,
                delay,
                first_delay,
                on_all_done,
                binding,
                scheduler: scheduler.clone(),
                run: RefCell::new(None),
            }),
        }
    }

    /// Creates a repetition wrapper from an [`NthConfig`].
    ///
    /// # Panics
    ///
    /// Panics if `config.ntimes` is zero.
    pub fn from_config(
        scheduler: &Scheduler,
        target: F,
        config: NthConfig,
        on_all_done: Option<AllDone<F::Output>>,
        binding: Binding<C, A>,
    ) -> Self {
        Self::new(
            scheduler,
            target,
            config.ntimes,
            config.delay,
            config.first_delay,
            on_all_done,
            binding,
        )
    }
}

impl<F, C, A> Nth<F, C, A>
where
    F: Callable<C, A>,
{
    /// Returns `true` while a sequence is running.
    pub fn is_running(&self) -> bool {
        self.inner.run.borrow().is_some()
    }

    /// Returns how many runs the current sequence has delivered.
    pub fn delivered(&self) -> usize {
        self.inner
            .run
            .borrow()
            .as_ref()
            .map_or(0, |run| run.results.len())
    }

    /// Aborts the running sequence without calling `on_all_done`.
    ///
    /// Returns `true` if a sequence was running.
    pub fn cancel(&self) -> bool {
        let Some(run) = self.inner.run.borrow_mut().take() else {
            return false;
        };
        for timer in [run.first, run.interval].into_iter().flatten() {
            timer.cancel();
        }
        debug!(delivered = run.results.len(), "nth sequence cancelled");
        true
    }
}

impl<F, C, A> Callable<C, A> for Nth<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + 'static,
{
    type Output = CombinatorResult<()>;

    fn invoke(&self, receiver: &C, args: Vec<A>) -> CombinatorResult<()> {
        if let Some(run) = self.inner.run.borrow().as_ref() {
            return Err(CombinatorError::SequenceInProgress {
                delivered: run.results.len(),
                total: self.inner.ntimes,
            });
        }

        *self.inner.run.borrow_mut() = Some(NthRun {
            invocation: self.inner.binding.resolve(receiver, args),
            results: Vec::with_capacity(self.inner.ntimes),
            first: None,
            interval: None,
        });
        debug!(
            ntimes = self.inner.ntimes,
            delay = ?self.inner.delay,
            first_delay = ?self.inner.first_delay,
            "nth sequence started"
        );

        match self.inner.first_delay.ticks() {
            None => self.inner.begin(),
            Some(first_delay) => {
                let inner = self.inner.clone();
                let first = self.inner.scheduler.set_timeout(first_delay, move || {
                    if let Some(run) = inner.run.borrow_mut().as_mut() {
                        run.first = None;
                    }
                    inner.begin();
                });
                if let Some(run) = self.inner.run.borrow_mut().as_mut() {
                    run.first = Some(first);
                }
            }
        }
        Ok(())
    }
}

/// Configuration structure for creating an [`Nth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NthConfig {
    /// Number of runs per sequence.
    pub ntimes: usize,
    /// Spacing between consecutive runs.
    #[serde(default)]
    pub delay: Spacing,
    /// Spacing between the call and the first run.
    #[serde(default)]
    pub first_delay: Spacing,
}

impl NthConfig {
    /// Creates a new configuration instance.
    pub fn new(ntimes: usize, delay: Spacing, first_delay: Spacing) -> Self {
        Self {
            ntimes,
            delay,
            first_delay,
        }
    }
}

/// Returns a wrapper whose every call runs `target` `ntimes` times.
///
/// # Panics
///
/// Panics if `ntimes` is zero.
#[allow(clippy::too_many_arguments)]
pub fn nth<F, C, A>(
    scheduler: &Scheduler,
    target: F,
    ntimes: usize,
    delay: Spacing,
    first_delay: Spacing,
    on_all_done: Option<AllDone<F::Output>>,
    bind: Option<C>,
    args: Option<Vec<A>>,
) -> Nth<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + 'static,
{
    Nth::new(
        scheduler,
        target,
        ntimes,
        delay,
        first_delay,
        on_all_done,
        Binding::new().with_receiver(bind).with_args(args),
    )
}

/// Handle to a sequence started by [`times`].
///
/// It can observe or cancel the sequence but not start another one, so the
/// run index seen by the target always counts from zero.
pub struct Times<F>
where
    F: Callable<(), ()>,
{
    sequence: Nth<F, (), ()>,
}

impl<F> Times<F>
where
    F: Callable<(), ()>,
{
    /// Returns `true` until the last run has happened or the sequence was
    /// cancelled.
    pub fn is_running(&self) -> bool {
        self.sequence.is_running()
    }

    /// Returns how many runs have happened so far.
    pub fn delivered(&self) -> usize {
        self.sequence.delivered()
    }

    /// Stops the sequence without calling `on_done`.
    ///
    /// Returns `true` if it was still running.
    pub fn cancel(&self) -> bool {
        self.sequence.cancel()
    }
}

/// Runs `target` `n` times starting right away, passing the zero-based run
/// index, back-to-back or `delay` apart; `on_done` receives every result.
///
/// # Panics
///
/// Panics if `n` is zero.
pub fn times<T, R>(
    scheduler: &Scheduler,
    target: T,
    on_done: Option<AllDone<R>>,
    n: usize,
    delay: Spacing,
) -> Times<impl Fn(&(), Vec<()>) -> R>
where
    T: Fn(usize) -> R + 'static,
    R: 'static,
{
    let index = Cell::new(0usize);
    let step = move |_: &(), _: Vec<()>| {
        let i = index.get();
        index.set(i + 1);
        target(i)
    };

    let sequence = Nth::new(
        scheduler,
        step,
        n,
        delay,
        Spacing::Immediate,
        on_done,
        Binding::none(),
    );
    if let Err(err) = sequence.invoke(&(), Vec::new()) {
        warn!(%err, "times sequence refused to start");
    }
    Times { sequence }
}
