use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::callable::{Binding, Callable, Invocation};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::types::Uint;

/// Leading + trailing edge throttle.
///
/// # Algorithm Behavior
///
/// - Idle: the first call runs the target immediately (leading edge), enters
///   the throttling state and arms a `wait`-tick window timer.
/// - While throttling: calls do not run the target. They set the "more" flag
///   and replace the captured invocation with their own.
/// - Window expiry: with "more" set, the captured (latest) invocation runs
///   (trailing edge) and the idle reset is re-armed for another `wait`;
///   otherwise the throttle goes idle.
/// - Idle reset: every call while throttling, and every trailing delivery,
///   re-arms a `wait`-tick debounce that returns the throttle to idle.
///
/// The target never runs more than once per `wait` ticks, and both the first
/// and the last call of a burst are delivered.
///
/// # Example
///
/// ```rust
/// use call_guard::{Callable, Scheduler};
/// use call_guard::combinators::throttle;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let scheduler = Scheduler::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// let track = throttle(&scheduler, move |_: &(), args: Vec<u32>| sink.borrow_mut().push(args[0]), 100, None, None);
///
/// assert_eq!(track.call(vec![1]), Some(()));   // leading edge
/// assert_eq!(track.call(vec![2]), None);       // absorbed
/// assert_eq!(track.call(vec![3]), None);       // absorbed, replaces 2
///
/// scheduler.advance_by(100);                    // trailing edge
/// assert_eq!(*seen.borrow(), vec![1, 3]);
/// ```
pub struct Throttle<F, C, A> {
    inner: Rc<ThrottleInner<F, C, A>>,
}

struct ThrottleInner<F, C, A> {
    target: F,
    wait: Uint,
    binding: Binding<C, A>,
    scheduler: Scheduler,
    state: RefCell<ThrottleState<C, A>>,
}

struct ThrottleState<C, A> {
    /// Window timer; `None` when no window is open.
    timer: Option<TimerHandle>,
    /// Idle-reset debounce.
    reset: Option<TimerHandle>,
    throttling: bool,
    more: bool,
    last: Option<Invocation<C, A>>,
}

impl<F, C, A> Drop for ThrottleInner<F, C, A> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for timer in [state.timer.take(), state.reset.take()].into_iter().flatten() {
            timer.cancel();
        }
    }
}

impl<F, C, A> Clone for Throttle<F, C, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<F, C, A> Throttle<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + 'static,
{
    /// Creates a throttle allowing one invocation per `wait` ticks.
    pub fn new(scheduler: &Scheduler, target: F, wait: Uint, binding: Binding<C, A>) -> Self {
        Self {
            inner: Rc::new(ThrottleInner {
                target,
                wait,
                binding,
                scheduler: scheduler.clone(),
                state: RefCell::new(ThrottleState {
                    timer: None,
                    reset: None,
                    throttling: false,
                    more: false,
                    last: None,
                }),
            }),
        }
    }

    /// Creates a throttle from a [`ThrottleConfig`].
    pub fn from_config(
        scheduler: &Scheduler,
        target: F,
        config: ThrottleConfig,
        binding: Binding<C, A>,
    ) -> Self {
        Self::new(scheduler, target, config.wait, binding)
    }
}

impl<F, C, A> Throttle<F, C, A> {
    /// Returns the window length in ticks.
    pub fn wait(&self) -> Uint {
        self.inner.wait
    }

    /// Returns `true` while calls are being absorbed.
    pub fn is_throttling(&self) -> bool {
        self.inner.state.borrow().throttling
    }

    /// Returns `true` if a trailing invocation is waiting for the window to close.
    pub fn has_trailing(&self) -> bool {
        let state = self.inner.state.borrow();
        state.more && state.last.is_some()
    }
}

impl<F, C, A> ThrottleInner<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + 'static,
{
    fn arm_window(self: &Rc<Self>) -> TimerHandle {
        let weak = Rc::downgrade(self);
        self.scheduler.set_timeout(self.wait, move || {
            if let Some(inner) = weak.upgrade() {
                inner.close_window();
            }
        })
    }

    fn close_window(self: &Rc<Self>) {
        let trailing = {
            let mut state = self.state.borrow_mut();
            state.timer = None;
            if state.more {
                state.last.take()
            } else {
                state.throttling = false;
                state.last = None;
                if let Some(reset) = state.reset.take() {
                    reset.cancel();
                }
                None
            }
        };

        if let Some(invocation) = trailing {
            trace!(wait = self.wait, "throttle trailing edge");
            let _ = invocation.deliver(&self.target);
            self.rearm_reset();
        }
    }

    fn rearm_reset(self: &Rc<Self>) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let mut state = self.state.borrow_mut();
        if let Some(reset) = state.reset.take() {
            reset.cancel();
        }
        state.reset = Some(self.scheduler.set_timeout(self.wait, move || {
            if let Some(inner) = weak.upgrade() {
                let mut state = inner.state.borrow_mut();
                state.reset = None;
                state.throttling = false;
                state.more = false;
                state.last = None;
            }
        }));
    }
}

impl<F, C, A> Callable<C, A> for Throttle<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + 'static,
{
    type Output = Option<F::Output>;

    fn invoke(&self, receiver: &C, args: Vec<A>) -> Option<F::Output> {
        let invocation = self.inner.binding.resolve(receiver, args);
        let leading = {
            let mut state = self.inner.state.borrow_mut();
            if state.timer.is_none() {
                state.timer = Some(self.inner.arm_window());
            }
            if state.throttling {
                state.more = true;
                state.last = Some(invocation);
                None
            } else {
                state.throttling = true;
                Some(invocation)
            }
        };
        self.inner.rearm_reset();

        match leading {
            Some(invocation) => {
                trace!(wait = self.inner.wait, "throttle leading edge");
                Some(invocation.deliver(&self.inner.target))
            }
            None => {
                trace!(wait = self.inner.wait, "throttle absorbed call");
                None
            }
        }
    }
}

/// Configuration structure for creating a [`Throttle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Minimum spacing, in ticks, between two invocations.
    pub wait: Uint,
}

impl ThrottleConfig {
    /// Creates a new configuration instance.
    pub fn new(wait: Uint) -> Self {
        Self { wait }
    }
}

/// Returns a leading + trailing edge throttled version of `target`.
pub fn throttle<F, C, A>(
    scheduler: &Scheduler,
    target: F,
    wait: Uint,
    bind: Option<C>,
    args: Option<Vec<A>>,
) -> Throttle<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + 'static,
{
    Throttle::new(
        scheduler,
        target,
        wait,
        Binding::new().with_receiver(bind).with_args(args),
    )
}
