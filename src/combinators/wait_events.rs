use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::{CombinatorError, CombinatorResult};

trait Settle {
    fn settle(&self);
}

/// Fan-in over a number of events not known in advance.
///
/// Each [`WaitEvents::event`] registers one pending event and hands back its
/// [`EventDone`]. When the last pending event is done the callback fires,
/// exactly once. Events may keep being registered while others are pending;
/// once the callback has fired the group is closed and further registrations
/// fail with [`CombinatorError::WaitGroupClosed`].
///
/// # Example
///
/// ```rust
/// use call_guard::combinators::wait_events;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let fired = Rc::new(Cell::new(false));
/// let flag = fired.clone();
/// let group = wait_events(move || flag.set(true));
///
/// let a = group.event().unwrap();
/// let b = group.event().unwrap();
/// a.done();
/// let c = group.event().unwrap();
/// b.done();
/// assert!(!fired.get());
/// c.done();
/// assert!(fired.get());
/// assert!(group.event().is_err());
/// ```
pub struct WaitEvents<F> {
    inner: Rc<WaitInner<F>>,
}

struct WaitInner<F> {
    on_all: F,
    pending: Cell<usize>,
    registered: Cell<usize>,
    fired: Cell<bool>,
}

impl<F> Clone for WaitEvents<F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<F> Settle for WaitInner<F>
where
    F: Fn(),
{
    fn settle(&self) {
        let pending = self.pending.get().saturating_sub(1);
        self.pending.set(pending);
        if pending == 0 && !self.fired.replace(true) {
            debug!(registered = self.registered.get(), "all events done");
            (self.on_all)();
        }
    }
}

impl<F> WaitEvents<F>
where
    F: Fn() + 'static,
{
    /// Creates an empty group that calls `on_all` when its events are done.
    pub fn new(on_all: F) -> Self {
        Self {
            inner: Rc::new(WaitInner {
                on_all,
                pending: Cell::new(0),
                registered: Cell::new(0),
                fired: Cell::new(false),
            }),
        }
    }

    /// Registers one more pending event.
    pub fn event(&self) -> CombinatorResult<EventDone> {
        if self.inner.fired.get() {
            return Err(CombinatorError::WaitGroupClosed);
        }
        self.inner.pending.set(self.inner.pending.get() + 1);
        self.inner.registered.set(self.inner.registered.get() + 1);
        let group: Rc<dyn Settle> = self.inner.clone();
        Ok(EventDone { group })
    }
}

impl<F> WaitEvents<F> {
    /// Returns the number of registered events not yet done.
    pub fn pending(&self) -> usize {
        self.inner.pending.get()
    }

    /// Returns the number of events registered so far.
    pub fn registered(&self) -> usize {
        self.inner.registered.get()
    }

    /// Returns `true` once the callback has fired.
    pub fn is_fired(&self) -> bool {
        self.inner.fired.get()
    }
}

/// Completion handle of one registered event.
///
/// Dropping it without calling [`EventDone::done`] leaves the event pending
/// forever.
#[must_use = "an event that is never marked done keeps the group from firing"]
pub struct EventDone {
    group: Rc<dyn Settle>,
}

impl EventDone {
    /// Marks the event done.
    pub fn done(self) {
        self.group.settle();
    }
}

impl fmt::Debug for EventDone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDone").finish_non_exhaustive()
    }
}

/// Returns a fan-in group calling `on_all` once every registered event is done.
pub fn wait_events<F>(on_all: F) -> WaitEvents<F>
where
    F: Fn() + 'static,
{
    WaitEvents::new(on_all)
}
