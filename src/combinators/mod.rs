//! Execution-control combinators.
//!
//! Each combinator takes a [`Callable`](crate::Callable) and returns a
//! wrapper with the same call interface and a different invocation policy.
//!
//! # Available Combinators
//!
//! - **[`Bound`]** ([`pass`], [`prepend`], [`append`]) - Fixed arguments and receiver
//! - **[`delay`] / [`periodical`]** - One-shot and repeating timers
//! - **[`Debounce`]** - Trailing edge: runs once the calls stop for `wait` ticks
//! - **[`Throttle`]** - Leading + trailing edge: at most one run per `wait` ticks
//! - **[`Funnel`]** ([`funnel`], [`single`]) - Bounded in-flight invocations, FIFO queue
//! - **[`Cache`]** - Memoization with per-entry expiry
//! - **[`Every`]** ([`every`], [`after`]) - Count-gated invocation
//! - **[`Once`]** - First result, forever
//! - **[`Nth`]** ([`nth`], [`times`]) - Bounded repetition sequences
//! - **[`Compose`] / [`Sequence`]** - Synchronous pipelines
//! - **[`WaitEvents`]** - Fan-in over a dynamic set of events
//!
//! # Policy Comparison
//!
//! | Combinator | State | Needs Scheduler | Call Output |
//! |------------|-------|-----------------|-------------|
//! | Debounce | pending timer | yes | `()` |
//! | Throttle | window + reset timers | yes | `Option<R>` |
//! | Funnel | in-flight count + queue | no | `Admission<R>` |
//! | Cache | keyed entries | clock only | `R` |
//! | Every | call + execution counts | no | `Option<R>` |
//! | Nth | running sequence | yes | `CombinatorResult<()>` |

pub mod bind;
pub use bind::{append, pass, prepend, Bound};

pub mod timer;
pub use timer::{delay, periodical};

pub mod debounce;
pub use debounce::{debounce, Debounce, DebounceConfig};

pub mod throttle;
pub use throttle::{throttle, Throttle, ThrottleConfig};

pub mod funnel;
pub use funnel::{funnel, single, Admission, Completion, Funnel, FunnelConfig, Placement};

pub mod cache;
pub use cache::{cache, cache_with_hasher, string_hash, ArgsHasher, Cache, CacheConfig, Expiry, JsonHasher};

pub mod counter;
pub use counter::{after, every, once, Every, EveryConfig, Once};

pub mod nth;
pub use nth::{nth, times, AllDone, Nth, NthConfig, Times};

pub mod compose;
pub use compose::{compose, sequencial, Compose, Sequence, Source, Stage};

pub mod wait_events;
pub use wait_events::{wait_events, EventDone, WaitEvents};
