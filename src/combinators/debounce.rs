use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::callable::{Binding, Callable};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::types::Uint;

/// Trailing-edge debouncer.
///
/// Every call cancels the pending invocation, if any, and schedules a new one
/// `wait` ticks later with that call's receiver and arguments (or the bound
/// ones). A stream of calls spaced closer than `wait` therefore never reaches
/// the target until the stream pauses; then the target runs once, with the
/// latest call's arguments.
///
/// Cloning a `Debounce` yields another handle to the same state. Once every
/// handle is dropped the pending invocation is cancelled.
///
/// # Example
///
/// ```rust
/// use call_guard::{Callable, Scheduler};
/// use call_guard::combinators::debounce;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let scheduler = Scheduler::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// let save = debounce(&scheduler, move |_: &(), args: Vec<u32>| sink.borrow_mut().extend(args), 100, None, None);
///
/// save.call(vec![1]);
/// scheduler.advance_by(50);
/// save.call(vec![2]);
/// scheduler.advance_by(99);
/// assert!(seen.borrow().is_empty());
///
/// scheduler.advance_by(1);
/// assert_eq!(*seen.borrow(), vec![2]);
/// ```
pub struct Debounce<F, C, A> {
    inner: Rc<DebounceInner<F, C, A>>,
}

struct DebounceInner<F, C, A> {
    target: F,
    wait: Uint,
    binding: Binding<C, A>,
    scheduler: Scheduler,
    timer: RefCell<Option<TimerHandle>>,
}

impl<F, C, A> Drop for DebounceInner<F, C, A> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.cancel();
        }
    }
}

impl<F, C, A> Clone for Debounce<F, C, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<F, C, A> Debounce<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + 'static,
{
    /// Creates a debouncer delaying each invocation by `wait` ticks.
    pub fn new(scheduler: &Scheduler, target: F, wait: Uint, binding: Binding<C, A>) -> Self {
        Self {
            inner: Rc::new(DebounceInner {
                target,
                wait,
                binding,
                scheduler: scheduler.clone(),
                timer: RefCell::new(None),
            }),
        }
    }

    /// Creates a debouncer from a [`DebounceConfig`].
    pub fn from_config(
        scheduler: &Scheduler,
        target: F,
        config: DebounceConfig,
        binding: Binding<C, A>,
    ) -> Self {
        Self::new(scheduler, target, config.wait, binding)
    }
}

impl<F, C, A> Debounce<F, C, A> {
    /// Returns the quiet period in ticks.
    pub fn wait(&self) -> Uint {
        self.inner.wait
    }

    /// Returns `true` while an invocation is scheduled.
    pub fn is_pending(&self) -> bool {
        self.inner
            .timer
            .borrow()
            .as_ref()
            .map(TimerHandle::is_pending)
            .unwrap_or(false)
    }

    /// Drops the scheduled invocation. Returns `true` if one was pending.
    pub fn cancel(&self) -> bool {
        match self.inner.timer.borrow_mut().take() {
            Some(timer) => timer.cancel(),
            None => false,
        }
    }
}

impl<F, C, A> Callable<C, A> for Debounce<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + 'static,
{
    type Output = ();

    fn invoke(&self, receiver: &C, args: Vec<A>) {
        let invocation = self.inner.binding.resolve(receiver, args);
        if let Some(previous) = self.inner.timer.borrow_mut().take() {
            previous.cancel();
        }

        let weak = Rc::downgrade(&self.inner);
        let mut pending = Some(invocation);
        let timer = self.inner.scheduler.set_timeout(self.inner.wait, move || {
            let (Some(inner), Some(invocation)) = (weak.upgrade(), pending.take()) else {
                return;
            };
            inner.timer.borrow_mut().take();
            trace!(wait = inner.wait, "debounced invocation delivered");
            let _ = invocation.deliver(&inner.target);
        });
        *self.inner.timer.borrow_mut() = Some(timer);
    }
}

/// Configuration structure for creating a [`Debounce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Quiet period, in ticks, that must follow the last call.
    pub wait: Uint,
}

impl DebounceConfig {
    /// Creates a new configuration instance.
    pub fn new(wait: Uint) -> Self {
        Self { wait }
    }
}

/// Returns a trailing-edge debounced version of `target`.
///
/// `args` and `bind`, when set, replace the arguments and receiver of every
/// call.
pub fn debounce<F, C, A>(
    scheduler: &Scheduler,
    target: F,
    wait: Uint,
    args: Option<Vec<A>>,
    bind: Option<C>,
) -> Debounce<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + 'static,
{
    Debounce::new(
        scheduler,
        target,
        wait,
        Binding::new().with_receiver(bind).with_args(args),
    )
}
