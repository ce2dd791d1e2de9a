use std::cell::RefCell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::callable::Callable;
use crate::error::{CombinatorError, CombinatorResult};
use crate::scheduler::Clock;
use crate::types::Uint;

/// How long a cached value stays valid.
///
/// Serialized as a signed tick count where `-1` means never expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Expiry {
    /// The value never expires.
    Never,
    /// The value expires this many ticks after it was computed.
    After(Uint),
}

impl Expiry {
    /// Returns the tick at which a value computed at `now` expires.
    #[inline]
    pub fn deadline(self, now: Uint) -> Option<Uint> {
        match self {
            Expiry::Never => None,
            Expiry::After(ttl) => Some(now.saturating_add(ttl)),
        }
    }
}

impl TryFrom<i64> for Expiry {
    type Error = CombinatorError;

    /// Maps `-1` to [`Expiry::Never`] and non-negative values to
    /// [`Expiry::After`].
    fn try_from(ttl: i64) -> Result<Self, Self::Error> {
        match ttl {
            -1 => Ok(Expiry::Never),
            n if n >= 0 => Ok(Expiry::After(n as Uint)),
            n => Err(CombinatorError::InvalidTtl(n)),
        }
    }
}

impl From<Expiry> for i64 {
    fn from(expiry: Expiry) -> Self {
        match expiry {
            Expiry::Never => -1,
            Expiry::After(ttl) => i64::try_from(ttl).unwrap_or(i64::MAX),
        }
    }
}

impl From<Uint> for Expiry {
    fn from(ttl: Uint) -> Self {
        Expiry::After(ttl)
    }
}

/// Computes the cache key of an argument list.
///
/// Any `Fn(&[A]) -> u64` is a hasher. Argument lists that hash to the same
/// key share one cache slot.
pub trait ArgsHasher<A> {
    /// Returns the key for `args`.
    fn hash_args(&self, args: &[A]) -> CombinatorResult<u64>;
}

impl<A, F> ArgsHasher<A> for F
where
    F: Fn(&[A]) -> u64,
{
    #[inline]
    fn hash_args(&self, args: &[A]) -> CombinatorResult<u64> {
        Ok(self(args))
    }
}

/// Default hasher: the JSON text of the argument list folded with
/// [`string_hash`].
///
/// Deterministic across runs and sensitive to argument order.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHasher;

impl<A: Serialize> ArgsHasher<A> for JsonHasher {
    fn hash_args(&self, args: &[A]) -> CombinatorResult<u64> {
        let text = serde_json::to_string(args)
            .map_err(|err| CombinatorError::KeySerialization(err.to_string()))?;
        Ok(string_hash(&text))
    }
}

/// `h = 31 * h + unit` over the UTF-16 code units of `text`, wrapping at 64 bits.
pub fn string_hash(text: &str) -> u64 {
    text.encode_utf16()
        .fold(0u64, |hash, unit| hash.wrapping_mul(31).wrapping_add(u64::from(unit)))
}

struct CacheEntry<R> {
    value: R,
    /// `None` never expires.
    expires_at: Option<Uint>,
}

impl<R> CacheEntry<R> {
    #[inline]
    fn is_valid(&self, now: Uint) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }
}

/// Memoizing wrapper with per-entry expiry.
///
/// A call whose key maps to a valid entry returns a clone of the stored
/// value without running the target. Otherwise the target runs and its
/// result is stored until `now + ttl`. Expired entries are evicted lazily,
/// the next time their key is looked up, or in bulk by
/// [`Cache::purge_expired`].
///
/// If the key cannot be computed the call goes straight to the target and
/// nothing is stored.
///
/// # Example
///
/// ```rust
/// use call_guard::{Callable, Scheduler};
/// use call_guard::combinators::{cache, Expiry};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let scheduler = Scheduler::new();
/// let runs = Rc::new(Cell::new(0));
/// let r = runs.clone();
/// let lookup = cache(
///     scheduler.clone(),
///     move |_: &(), args: Vec<&str>| {
///         r.set(r.get() + 1);
///         format!("{}#{}", args[0], r.get())
///     },
///     Expiry::After(500),
///     None,
/// );
///
/// assert_eq!(lookup.call(vec!["a"]), "a#1");
/// scheduler.advance_by(499);
/// assert_eq!(lookup.call(vec!["a"]), "a#1");
/// scheduler.advance_by(1);
/// assert_eq!(lookup.call(vec!["a"]), "a#2");
/// ```
pub struct Cache<F, C, A, K, H = JsonHasher>
where
    F: Callable<C, A>,
{
    target: F,
    ttl: Expiry,
    receiver: Option<C>,
    hasher: H,
    clock: K,
    entries: RefCell<HashMap<u64, CacheEntry<F::Output>>>,
    _args: std::marker::PhantomData<fn(A)>,
}

impl<F, C, A, K> Cache<F, C, A, K, JsonHasher>
where
    F: Callable<C, A>,
    A: Serialize,
    K: Clock,
{
    /// Creates a cache keyed by [`JsonHasher`].
    pub fn new(clock: K, target: F, ttl: Expiry, bind: Option<C>) -> Self {
        Self::with_hasher(clock, target, ttl, bind, JsonHasher)
    }

    /// Creates a cache from a [`CacheConfig`].
    pub fn from_config(clock: K, target: F, config: CacheConfig, bind: Option<C>) -> Self {
        Self::new(clock, target, config.ttl, bind)
    }
}

impl<F, C, A, K, H> Cache<F, C, A, K, H>
where
    F: Callable<C, A>,
    K: Clock,
    H: ArgsHasher<A>,
{
    /// Creates a cache keyed by a custom hasher.
    pub fn with_hasher(clock: K, target: F, ttl: Expiry, bind: Option<C>, hasher: H) -> Self {
        Self {
            target,
            ttl,
            receiver: bind,
            hasher,
            clock,
            entries: RefCell::new(HashMap::new()),
            _args: std::marker::PhantomData,
        }
    }

    /// Returns the configured expiry.
    pub fn ttl(&self) -> Expiry {
        self.ttl
    }

    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Evicts every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid(now));
        before - entries.len()
    }

    /// Evicts the entry for `args`. Returns `true` if one was stored.
    pub fn invalidate(&self, args: &[A]) -> CombinatorResult<bool> {
        let key = self.hasher.hash_args(args)?;
        Ok(self.entries.borrow_mut().remove(&key).is_some())
    }

    /// Evicts every entry.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl<F, C, A, K, H> Callable<C, A> for Cache<F, C, A, K, H>
where
    F: Callable<C, A>,
    F::Output: Clone,
    K: Clock,
    H: ArgsHasher<A>,
{
    type Output = F::Output;

    fn invoke(&self, receiver: &C, args: Vec<A>) -> F::Output {
        let receiver = self.receiver.as_ref().unwrap_or(receiver);
        let key = match self.hasher.hash_args(&args) {
            Ok(key) => key,
            Err(err) => {
                warn!(%err, "cache key unavailable; calling through");
                return self.target.invoke(receiver, args);
            }
        };

        let now = self.clock.now();
        {
            let mut entries = self.entries.borrow_mut();
            if let Some(entry) = entries.get(&key) {
                if entry.is_valid(now) {
                    trace!(key, "cache hit");
                    return entry.value.clone();
                }
            }
            if entries.remove(&key).is_some() {
                trace!(key, "cache entry expired");
            }
        }

        trace!(key, "cache miss");
        let value = self.target.invoke(receiver, args);
        self.entries.borrow_mut().insert(
            key,
            CacheEntry {
                value: value.clone(),
                expires_at: self.ttl.deadline(now),
            },
        );
        value
    }
}

/// Configuration structure for creating a [`Cache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of each entry; `-1` in serialized form means never expire.
    pub ttl: Expiry,
}

impl CacheConfig {
    /// Creates a new configuration instance.
    pub fn new(ttl: Expiry) -> Self {
        Self { ttl }
    }
}

/// Returns a memoized version of `target` keyed by [`JsonHasher`].
pub fn cache<F, C, A, K>(clock: K, target: F, ttl: Expiry, bind: Option<C>) -> Cache<F, C, A, K>
where
    F: Callable<C, A>,
    A: Serialize,
    K: Clock,
{
    Cache::new(clock, target, ttl, bind)
}

/// Returns a memoized version of `target` keyed by `hasher`.
pub fn cache_with_hasher<F, C, A, K, H>(
    clock: K,
    target: F,
    ttl: Expiry,
    bind: Option<C>,
    hasher: H,
) -> Cache<F, C, A, K, H>
where
    F: Callable<C, A>,
    K: Clock,
    H: ArgsHasher<A>,
{
    Cache::with_hasher(clock, target, ttl, bind, hasher)
}
