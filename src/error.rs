//! error.rs
//! Error and result types shared by every combinator.

use thiserror::Error;

/// Errors reported by combinators whose calls can be refused or misused.
///
/// Most wrappers never fail: a throttled or funnelled call that cannot run
/// right away is absorbed or queued, not rejected. The variants below cover
/// the few places where a call genuinely cannot proceed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombinatorError {
    /// An `nth` repetition sequence is still running.
    #[error("sequence in progress: {delivered} of {total} invocation(s) delivered")]
    SequenceInProgress {
        delivered: usize,
        total: usize,
    },

    /// A funnel completion was signalled more than once for one admission.
    #[error("completion already signalled for this admission")]
    AlreadyCompleted,

    /// The wait group already fired its callback and accepts no more events.
    #[error("wait group already fired; no further events can be registered")]
    WaitGroupClosed,

    /// A ttl below the `-1` never-expire sentinel.
    #[error("invalid ttl {0}: expected -1 (never expire) or a non-negative tick count")]
    InvalidTtl(i64),

    /// The argument list could not be turned into a cache key.
    #[error("failed to compute cache key: {0}")]
    KeySerialization(String),
}

/// Result type for fallible combinator operations.
pub type CombinatorResult<T> = Result<T, CombinatorError>;
