use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use super::bind::{splice_back, splice_front};
use crate::callable::{Binding, Callable, Invocation};
use crate::error::{CombinatorError, CombinatorResult};

/// Where the [`Completion`] goes in the argument list of each invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// After the call's arguments.
    #[default]
    Append,
    /// Before the call's arguments.
    Prepend,
}

impl Placement {
    fn inject<A>(self, completion: A, args: Vec<A>) -> Vec<A> {
        match self {
            Placement::Append => splice_back(args, vec![completion]),
            Placement::Prepend => splice_front(vec![completion], args),
        }
    }
}

trait ReleaseSlot {
    fn release(self: Rc<Self>);
}

/// Completion callback handed to every invocation admitted by a [`Funnel`].
///
/// The target must call [`Completion::done`] exactly once when its work is
/// finished, synchronously or later. Until then the invocation holds its
/// slot; a completion that is never signalled stalls the funnel for good.
#[derive(Clone)]
pub struct Completion {
    gate: Rc<dyn ReleaseSlot>,
    fired: Rc<Cell<bool>>,
}

impl Completion {
    /// Releases the slot, starting the next queued call if there is one.
    ///
    /// Returns [`CombinatorError::AlreadyCompleted`] and does nothing if this
    /// admission was already completed, through this handle or a clone.
    pub fn done(&self) -> CombinatorResult<()> {
        if self.fired.replace(true) {
            warn!("funnel completion signalled twice; ignoring");
            return Err(CombinatorError::AlreadyCompleted);
        }
        self.gate.clone().release();
        Ok(())
    }

    /// Returns `true` once [`Completion::done`] has been called.
    pub fn is_done(&self) -> bool {
        self.fired.get()
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("done", &self.fired.get())
            .finish()
    }
}

impl PartialEq for Completion {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.fired, &other.fired)
    }
}

/// What happened to one call of a [`Funnel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission<R> {
    /// A slot was free; the target ran and returned this value.
    Started(R),
    /// Every slot was busy; the call waits at this 1-based queue position.
    Queued { position: usize },
}

impl<R> Admission<R> {
    /// Returns `true` if the call ran immediately.
    pub fn is_started(&self) -> bool {
        matches!(self, Admission::Started(_))
    }

    /// Returns the target's output if the call ran immediately.
    pub fn started(self) -> Option<R> {
        match self {
            Admission::Started(value) => Some(value),
            Admission::Queued { .. } => None,
        }
    }
}

/// Concurrency gate bounding how many invocations are in flight at once.
///
/// Each admitted invocation receives a synthetic [`Completion`] argument,
/// converted into the argument type through `A: From<Completion>` and placed
/// according to the configured [`Placement`]. Calls that find every slot busy
/// wait in a FIFO queue; each completion either hands its slot to the head of
/// the queue or frees it.
///
/// # Invariants
///
/// - `0 <= in_flight <= capacity`
/// - queued calls start in the order they arrived
///
/// # Example
///
/// ```rust
/// use call_guard::Callable;
/// use call_guard::combinators::{single, Admission, Completion, Placement};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// #[derive(Clone, Debug)]
/// enum Arg {
///     Job(u32),
///     Done(Completion),
/// }
///
/// impl From<Completion> for Arg {
///     fn from(done: Completion) -> Self {
///         Arg::Done(done)
///     }
/// }
///
/// let pending = Rc::new(RefCell::new(Vec::new()));
/// let sink = pending.clone();
/// let worker = single(
///     move |_: &(), args: Vec<Arg>| {
///         if let [Arg::Job(id), Arg::Done(done)] = args.as_slice() {
///             sink.borrow_mut().push((*id, done.clone()));
///         }
///     },
///     None,
///     None,
///     Placement::Append,
/// );
///
/// assert!(worker.call(vec![Arg::Job(1)]).is_started());
/// assert_eq!(worker.call(vec![Arg::Job(2)]), Admission::Queued { position: 1 });
///
/// let (_, done) = pending.borrow_mut().remove(0);
/// done.done().unwrap();
/// assert_eq!(pending.borrow()[0].0, 2);
/// ```
pub struct Funnel<F, C, A> {
    inner: Rc<FunnelInner<F, C, A>>,
}

struct FunnelInner<F, C, A> {
    target: F,
    capacity: usize,
    placement: Placement,
    binding: Binding<C, A>,
    state: RefCell<FunnelState<C, A>>,
}

struct FunnelState<C, A> {
    in_flight: usize,
    queue: VecDeque<Invocation<C, A>>,
    /// A `release` further up the stack is handing out slots.
    draining: bool,
    /// Slots freed but not yet handed out by the draining `release`.
    released: usize,
}

/// Clears the draining flag when the drain loop exits, target panics included.
struct DrainGuard<'a, C, A> {
    state: &'a RefCell<FunnelState<C, A>>,
}

impl<C, A> Drop for DrainGuard<'_, C, A> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.draining = false;
        }
    }
}

impl<F, C, A> Clone for Funnel<F, C, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<F, C, A> FunnelInner<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: 'static,
    A: From<Completion> + 'static,
{
    fn start(self: &Rc<Self>, invocation: Invocation<C, A>) -> F::Output {
        let gate: Rc<dyn ReleaseSlot> = self.clone();
        let completion = Completion {
            gate,
            fired: Rc::new(Cell::new(false)),
        };
        let args = self.placement.inject(A::from(completion), invocation.args);
        self.target.invoke(&invocation.receiver, args)
    }
}

impl<F, C, A> ReleaseSlot for FunnelInner<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: 'static,
    A: From<Completion> + 'static,
{
    fn release(self: Rc<Self>) {
        {
            let mut state = self.state.borrow_mut();
            state.released += 1;
            if state.draining {
                // Completed synchronously inside a call this loop started.
                return;
            }
            state.draining = true;
        }

        let _guard = DrainGuard { state: &self.state };
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                if state.released == 0 {
                    break;
                }
                state.released -= 1;
                match state.queue.pop_front() {
                    Some(invocation) => Some(invocation),
                    None => {
                        state.in_flight = state.in_flight.saturating_sub(1);
                        None
                    }
                }
            };

            match next {
                Some(invocation) => {
                    trace!(capacity = self.capacity, "funnel slot handed to queued call");
                    let _ = self.start(invocation);
                }
                None => trace!(capacity = self.capacity, "funnel slot freed"),
            }
        }
    }
}

impl<F, C, A> Funnel<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + From<Completion> + 'static,
{
    /// Creates a funnel admitting at most `capacity` concurrent invocations.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(target: F, capacity: usize, placement: Placement, binding: Binding<C, A>) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");

        Self {
            inner: Rc::new(FunnelInner {
                target,
                capacity,
                placement,
                binding,
                state: RefCell::new(FunnelState {
                    in_flight: 0,
                    queue: VecDeque::new(),
                    draining: false,
                    released: 0,
                }),
            }),
        }
    }

    /// Creates a funnel from a [`FunnelConfig`].
    ///
    /// # Panics
    ///
    /// Panics if `config.capacity` is zero.
    pub fn from_config(target: F, config: FunnelConfig, binding: Binding<C, A>) -> Self {
        Self::new(target, config.capacity, config.placement, binding)
    }
}

impl<F, C, A> Funnel<F, C, A> {
    /// Returns the maximum number of invocations in flight.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns where the completion is injected.
    pub fn placement(&self) -> Placement {
        self.inner.placement
    }

    /// Returns the number of admitted, not yet completed invocations.
    pub fn in_flight(&self) -> usize {
        self.inner.state.borrow().in_flight
    }

    /// Returns the number of calls waiting for a slot.
    pub fn queued(&self) -> usize {
        self.inner.state.borrow().queue.len()
    }
}

impl<F, C, A> Callable<C, A> for Funnel<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + From<Completion> + 'static,
{
    type Output = Admission<F::Output>;

    fn invoke(&self, receiver: &C, args: Vec<A>) -> Admission<F::Output> {
        let invocation = self.inner.binding.resolve(receiver, args);
        let admitted = {
            let mut state = self.inner.state.borrow_mut();
            if state.in_flight < self.inner.capacity {
                state.in_flight += 1;
                trace!(in_flight = state.in_flight, capacity = self.inner.capacity, "funnel admitted call");
                Ok(invocation)
            } else {
                state.queue.push_back(invocation);
                trace!(queued = state.queue.len(), capacity = self.inner.capacity, "funnel queued call");
                Err(state.queue.len())
            }
        };

        match admitted {
            Ok(invocation) => Admission::Started(self.inner.start(invocation)),
            Err(position) => Admission::Queued { position },
        }
    }
}

/// Configuration structure for creating a [`Funnel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelConfig {
    /// Maximum number of invocations in flight.
    pub capacity: usize,
    /// Where the completion is injected.
    #[serde(default)]
    pub placement: Placement,
}

impl FunnelConfig {
    /// Creates a new configuration instance.
    pub fn new(capacity: usize, placement: Placement) -> Self {
        Self { capacity, placement }
    }
}

/// Returns `target` gated to at most `max` concurrent invocations.
///
/// # Panics
///
/// Panics if `max` is zero.
pub fn funnel<F, C, A>(
    target: F,
    max: usize,
    bind: Option<C>,
    args: Option<Vec<A>>,
    placement: Placement,
) -> Funnel<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + From<Completion> + 'static,
{
    Funnel::new(
        target,
        max,
        placement,
        Binding::new().with_receiver(bind).with_args(args),
    )
}

/// Returns `target` serialized: each call starts only after the previous
/// one's completion is signalled. Same as `funnel(target, 1, ..)`.
pub fn single<F, C, A>(
    target: F,
    bind: Option<C>,
    args: Option<Vec<A>>,
    placement: Placement,
) -> Funnel<F, C, A>
where
    F: Callable<C, A> + 'static,
    C: Clone + 'static,
    A: Clone + From<Completion> + 'static,
{
    funnel(target, 1, bind, args, placement)
}
