//! Execution-control combinators for Rust applications.
//!
//! This library wraps any callable in a policy that decides *when* and *how
//! often* it really runs: delayed, rate-limited, concurrency-bounded,
//! memoized or count-gated. The target function is never rewritten; the
//! wrapper exposes the same call interface and owns all policy state.
//!
//! # Quick Start
//!
//! ```rust
//! use call_guard::{Callable, Scheduler};
//! use call_guard::combinators::throttle;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let scheduler = Scheduler::new();
//! let runs = Rc::new(Cell::new(0));
//! let r = runs.clone();
//!
//! // At most one run per 100 ticks, first and last call of a burst delivered
//! let save = throttle(&scheduler, move |_: &(), _: Vec<()>| r.set(r.get() + 1), 100, None, None);
//!
//! for _ in 0..10 {
//!     save.call(vec![]);
//! }
//! scheduler.advance_by(100);
//! assert_eq!(runs.get(), 2);
//! ```
//!
//! # Available Combinators
//!
//! ## [Debounce](combinators::Debounce)
//! Runs once the calls have stopped for `wait` ticks:
//! ```rust
//! # use call_guard::Scheduler;
//! # use call_guard::combinators::debounce;
//! # let scheduler = Scheduler::new();
//! let resize = debounce(&scheduler, |_: &(), _: Vec<u32>| {}, 250, None, None);
//! ```
//!
//! ## [Throttle](combinators::Throttle)
//! Leading and trailing edge, at most one run per window:
//! ```rust
//! # use call_guard::Scheduler;
//! # use call_guard::combinators::throttle;
//! # let scheduler = Scheduler::new();
//! let track = throttle(&scheduler, |_: &(), _: Vec<u32>| {}, 1_000, None, None);
//! ```
//!
//! ## [Funnel](combinators::Funnel)
//! At most `max` invocations in flight, the rest queued FIFO. See
//! [`combinators::funnel()`] for the completion protocol.
//!
//! ## [Cache](combinators::Cache)
//! Memoizes results per argument list until they expire:
//! ```rust
//! # use call_guard::SystemClock;
//! # use call_guard::combinators::{cache, Expiry};
//! let lookup = cache(SystemClock, |_: &(), args: Vec<u32>| args[0] * 2, Expiry::After(500), None);
//! ```
//!
//! ## [Every](combinators::Every) and [Nth](combinators::Nth)
//! Count-gated and repeated invocation:
//! ```rust
//! # use call_guard::combinators::{after, every};
//! let tenth = every(|_: &(), _: Vec<()>| (), 10, None, None, None);
//! let ready = after(|_: &(), _: Vec<()>| (), 3, None, None);
//! ```
//!
//! # Core Concepts
//!
//! ## Time Representation
//! All combinators use abstract "ticks" ([`Uint`]) for time. The
//! [`Scheduler`] advances a virtual tick clock and fires timers; map your own
//! time source onto ticks, or drive the scheduler in real time with
//! [`Scheduler::run_blocking`].
//!
//! ## Calls
//! A call is an explicit receiver `&C` plus an ordered argument list
//! `Vec<A>`. Targets are anything implementing [`Callable`], including every
//! closure `Fn(&C, Vec<A>) -> R`; wrappers implement it too, so they nest.
//! A [`Binding`] fixes the receiver and/or arguments a wrapper delivers.
//!
//! ## Error Handling
//! Fallible operations return [`CombinatorResult`]:
//! - **[`SequenceInProgress`](CombinatorError::SequenceInProgress)** - An `nth` sequence is running
//! - **[`AlreadyCompleted`](CombinatorError::AlreadyCompleted)** - A funnel slot was released twice
//! - **[`WaitGroupClosed`](CombinatorError::WaitGroupClosed)** - A fan-in group already fired
//! - **[`InvalidTtl`](CombinatorError::InvalidTtl)** - A negative ttl other than `-1`
//! - **[`KeySerialization`](CombinatorError::KeySerialization)** - No cache key for the arguments
//!
//! A panic raised by a target propagates to whoever triggered the call:
//! the wrapper's caller, or the code advancing the scheduler for timer-driven
//! calls.
//!
//! ## Threading
//! Everything here is single-threaded and cooperative. Wrapper state is
//! private to each wrapper; no state is shared across wrappers.

pub mod callable;
pub mod combinators;
pub mod error;
pub mod scheduler;
pub mod types;

pub use callable::{Binding, Callable, Invocation};
pub use error::{CombinatorError, CombinatorResult};
pub use scheduler::{Clock, Scheduler, SystemClock, TimerHandle};
pub use types::{Spacing, Uint};
