//! Tick type used for every duration, deadline and timestamp in the crate.
//!
//! Time is an abstract, monotonically increasing count of ticks. A tick can
//! stand for a millisecond, a frame, a simulation step or anything else the
//! application maps onto it. The [`Scheduler`](crate::Scheduler) advances its
//! virtual clock in ticks, and [`SystemClock`](crate::SystemClock) reports
//! wall-clock milliseconds as ticks.
//!
//! # Features
//! - `tick-u64` (default): uses [`u64`] as `Uint`
//! - `tick-u128`: uses [`u128`] as `Uint`
//!   (Both features cannot be enabled at the same time.)
//! - If neither feature is enabled, `u64` is used as the default type.

/// Alias for the unsigned integer type used for ticks.
///
/// The type is selected at compile time using feature flags:
/// - **`tick-u64`** (default): uses [`u64`]
/// - **`tick-u128`**: uses [`u128`]
///
/// > **Note:** Enabling both `tick-u64` and `tick-u128` at the same time
///   will result in a compile error. If neither is enabled, [`u64`] is used.
#[cfg(all(feature = "tick-u64", feature = "tick-u128"))]
compile_error!("You cannot enable both `tick-u64` and `tick-u128` features at the same time");

#[cfg(all(feature = "tick-u64", not(feature = "tick-u128")))]
pub type Uint = u64;

#[cfg(all(feature = "tick-u128", not(feature = "tick-u64")))]
pub type Uint = u128;

#[cfg(not(any(feature = "tick-u64", feature = "tick-u128")))]
pub type Uint = u64;

/// Spacing between consecutive invocations of a repeated sequence.
///
/// `Immediate` runs the next invocation synchronously, back-to-back with the
/// previous one. `Ticks(n)` waits `n` ticks on the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spacing {
    /// Run without yielding to the scheduler.
    #[default]
    Immediate,
    /// Wait the given number of ticks.
    Ticks(Uint),
}

impl Spacing {
    /// Returns the tick count, or `None` for [`Spacing::Immediate`].
    #[inline]
    pub fn ticks(self) -> Option<Uint> {
        match self {
            Spacing::Immediate => None,
            Spacing::Ticks(n) => Some(n),
        }
    }
}

impl From<Uint> for Spacing {
    fn from(ticks: Uint) -> Self {
        Spacing::Ticks(ticks)
    }
}
