//! Single-threaded, tick-driven timer facility.
//!
//! Combinators that defer work (debounce, throttle, nth, delay, periodical)
//! arm timers on a [`Scheduler`]. The scheduler keeps a virtual clock and a
//! min-heap of deadlines; nothing fires until the owner advances time, either
//! explicitly with [`Scheduler::advance_by`] / [`Scheduler::advance_to`] or in
//! real time with [`Scheduler::run_blocking`].
//!
//! # Determinism
//!
//! - Timers fire ordered by deadline, then by the order they were armed.
//! - A timer armed by a firing task for a deadline inside the current advance
//!   fires within that same advance.
//! - Cancellation is lazy: a cancelled timer stays in the heap and is skipped
//!   when its deadline is reached.
//!
//! # Example
//!
//! ```rust
//! use call_guard::Scheduler;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let scheduler = Scheduler::new();
//! let hits = Rc::new(Cell::new(0));
//!
//! let h = hits.clone();
//! scheduler.set_timeout(50, move || h.set(h.get() + 1));
//!
//! scheduler.advance_by(49);
//! assert_eq!(hits.get(), 0);
//! scheduler.advance_by(1);
//! assert_eq!(hits.get(), 1);
//! ```

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::trace;

use crate::types::Uint;

/// Source of the current tick.
pub trait Clock {
    /// Returns the current tick.
    fn now(&self) -> Uint;
}

impl<T: Clock + ?Sized> Clock for &T {
    #[inline(always)]
    fn now(&self) -> Uint {
        (**self).now()
    }
}

impl<T: Clock + ?Sized> Clock for Rc<T> {
    #[inline(always)]
    fn now(&self) -> Uint {
        (**self).now()
    }
}

/// Wall clock reporting milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Uint {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Uint)
            .unwrap_or(0)
    }
}

type Task = Box<dyn FnMut()>;

/// Heap entry; the heap is a min-heap on `(deadline, seq)`.
struct Pending {
    deadline: Uint,
    seq: u64,
    timer_id: u64,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct TimerSlot {
    /// `None` while a periodic task is running.
    task: Option<Task>,
    period: Option<Uint>,
}

struct SchedulerState {
    now: Uint,
    next_timer_id: u64,
    next_seq: u64,
    heap: BinaryHeap<Pending>,
    timers: HashMap<u64, TimerSlot>,
}

impl SchedulerState {
    fn push(&mut self, timer_id: u64, deadline: Uint) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Pending { deadline, seq, timer_id });
    }

    /// Drops cancelled entries sitting at the top of the heap.
    fn prune_head(&mut self) {
        while let Some(head) = self.heap.peek() {
            if self.timers.contains_key(&head.timer_id) {
                break;
            }
            self.heap.pop();
        }
    }
}

/// Handle to an armed timer, used to cancel it.
///
/// The handle does not keep the scheduler alive. Cancelling after the
/// scheduler is gone, or after a one-shot timer fired, is a no-op.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    timer_id: u64,
    deadline: Uint,
    scheduler: Weak<RefCell<SchedulerState>>,
}

impl TimerHandle {
    /// Returns the timer ID.
    pub fn timer_id(&self) -> u64 {
        self.timer_id
    }

    /// Returns the first deadline the timer was armed for.
    pub fn deadline(&self) -> Uint {
        self.deadline
    }

    /// Cancels the timer. Returns `true` if it was still armed.
    pub fn cancel(&self) -> bool {
        match self.scheduler.upgrade() {
            Some(state) => state.borrow_mut().timers.remove(&self.timer_id).is_some(),
            None => false,
        }
    }

    /// Returns `true` while the timer can still fire.
    pub fn is_pending(&self) -> bool {
        self.scheduler
            .upgrade()
            .map(|state| state.borrow().timers.contains_key(&self.timer_id))
            .unwrap_or(false)
    }
}

/// Cooperative timer facility over a virtual tick clock.
///
/// `Scheduler` is a cheap handle; clones share the same clock and timers.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerState>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("now", &state.now)
            .field("pending", &state.timers.len())
            .finish()
    }
}

impl Clock for Scheduler {
    #[inline]
    fn now(&self) -> Uint {
        self.inner.borrow().now
    }
}

impl Scheduler {
    /// Creates a scheduler whose clock starts at tick 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a scheduler whose clock starts at `tick`.
    pub fn starting_at(tick: Uint) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerState {
                now: tick,
                next_timer_id: 0,
                next_seq: 0,
                heap: BinaryHeap::new(),
                timers: HashMap::new(),
            })),
        }
    }

    /// Returns the current tick.
    pub fn now(&self) -> Uint {
        Clock::now(self)
    }

    /// Returns the number of armed timers.
    pub fn pending(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Returns `true` if no timer is armed.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Returns the deadline of the next armed timer, if any.
    pub fn next_deadline(&self) -> Option<Uint> {
        let mut state = self.inner.borrow_mut();
        state.prune_head();
        state.heap.peek().map(|p| p.deadline)
    }

    /// Arms a one-shot timer firing `delay` ticks from now.
    pub fn set_timeout<T>(&self, delay: Uint, task: T) -> TimerHandle
    where
        T: FnMut() + 'static,
    {
        self.arm(delay, None, Box::new(task))
    }

    /// Arms a periodic timer firing every `period` ticks until cancelled.
    ///
    /// A period of zero is treated as one tick so the timer cannot spin.
    pub fn set_interval<T>(&self, period: Uint, task: T) -> TimerHandle
    where
        T: FnMut() + 'static,
    {
        let period = period.max(1);
        self.arm(period, Some(period), Box::new(task))
    }

    /// Cancels the timer behind `handle`. Returns `true` if it was armed.
    pub fn cancel(&self, handle: &TimerHandle) -> bool {
        self.inner.borrow_mut().timers.remove(&handle.timer_id).is_some()
    }

    fn arm(&self, delay: Uint, period: Option<Uint>, task: Task) -> TimerHandle {
        let mut state = self.inner.borrow_mut();
        let timer_id = state.next_timer_id;
        state.next_timer_id += 1;
        let deadline = state.now.saturating_add(delay);
        state.timers.insert(timer_id, TimerSlot { task: Some(task), period });
        state.push(timer_id, deadline);
        trace!(timer_id, deadline, periodic = period.is_some(), "timer armed");

        TimerHandle {
            timer_id,
            deadline,
            scheduler: Rc::downgrade(&self.inner),
        }
    }

    /// Advances the clock by `ticks`, firing every timer that comes due.
    ///
    /// Returns the number of timer firings.
    pub fn advance_by(&self, ticks: Uint) -> usize {
        let target = self.now().saturating_add(ticks);
        self.advance_to(target)
    }

    /// Advances the clock to `tick`, firing every timer that comes due.
    ///
    /// Time never moves backwards: a `tick` in the past fires whatever is
    /// already due and leaves the clock where it is.
    pub fn advance_to(&self, tick: Uint) -> usize {
        let fired = self.fire_due(tick, usize::MAX);
        let mut state = self.inner.borrow_mut();
        if tick > state.now {
            state.now = tick;
        }
        fired
    }

    /// Jumps to the next deadline and fires what is due there.
    pub fn advance_to_next(&self) -> usize {
        match self.next_deadline() {
            Some(deadline) => self.advance_to(deadline),
            None => 0,
        }
    }

    /// Fires timers until none remain armed.
    ///
    /// An uncancelled periodic timer never lets the scheduler go idle; use
    /// [`Scheduler::run_until_idle_bounded`] when one may be armed.
    pub fn run_until_idle(&self) -> usize {
        self.run_until_idle_bounded(usize::MAX)
    }

    /// Fires at most `max_firings` timers, stopping early once idle.
    pub fn run_until_idle_bounded(&self, max_firings: usize) -> usize {
        let mut fired = 0;
        while fired < max_firings {
            let Some(deadline) = self.next_deadline() else {
                break;
            };
            fired += self.fire_due(deadline, max_firings - fired);
        }
        fired
    }

    /// Drives the timers in real time, sleeping `tick_len` per tick, until idle.
    pub fn run_blocking(&self, tick_len: Duration) -> usize {
        let mut fired = 0;
        while let Some(deadline) = self.next_deadline() {
            let wait = deadline.saturating_sub(self.now());
            if wait > 0 {
                let factor = u32::try_from(wait).unwrap_or(u32::MAX);
                std::thread::sleep(tick_len.saturating_mul(factor));
            }
            fired += self.advance_to(deadline);
        }
        fired
    }

    fn fire_due(&self, target: Uint, limit: usize) -> usize {
        let mut fired = 0;
        while fired < limit {
            let (timer_id, deadline, period, mut task) = {
                let mut state = self.inner.borrow_mut();
                state.prune_head();
                match state.heap.peek() {
                    Some(head) if head.deadline <= target => {}
                    _ => break,
                }
                let Some(next) = state.heap.pop() else {
                    break;
                };
                if next.deadline > state.now {
                    state.now = next.deadline;
                }
                let period = match state.timers.get(&next.timer_id) {
                    Some(slot) => slot.period,
                    None => continue,
                };
                // One-shot timers leave the table before they run.
                let task = match period {
                    Some(_) => state
                        .timers
                        .get_mut(&next.timer_id)
                        .and_then(|slot| slot.task.take()),
                    None => state
                        .timers
                        .remove(&next.timer_id)
                        .and_then(|slot| slot.task),
                };
                let Some(task) = task else {
                    continue;
                };
                (next.timer_id, next.deadline, period, task)
            };

            trace!(timer_id, deadline, "timer fired");
            let mut guard = UnwindGuard {
                state: &self.inner,
                timer_id,
                armed: period.is_some(),
            };
            task();
            guard.armed = false;
            fired += 1;

            let Some(period) = period else {
                continue;
            };
            let mut state = self.inner.borrow_mut();
            match state.timers.get_mut(&timer_id) {
                Some(slot) => slot.task = Some(task),
                // Cancelled by its own task.
                None => continue,
            }
            state.push(timer_id, deadline.saturating_add(period));
        }
        fired
    }
}

/// Drops a periodic timer whose task unwound, so the table never keeps a
/// slot without a task.
struct UnwindGuard<'a> {
    state: &'a RefCell<SchedulerState>,
    timer_id: u64,
    armed: bool,
}

impl Drop for UnwindGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.timers.remove(&self.timer_id);
        }
    }
}
