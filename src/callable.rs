//! Core trait for callables and the call data threaded through combinators.
//!
//! Every combinator consumes something that implements [`Callable`] and
//! produces a wrapper that implements it again, so policies stack: a
//! [`Funnel`](crate::combinators::Funnel) can gate a
//! [`Bound`](crate::combinators::Bound) callable, a
//! [`Cache`](crate::combinators::Cache) can sit in front of a
//! [`Once`](crate::combinators::Once), and so on.
//!
//! A call is made of an explicit receiver `&C` (the value the target acts
//! upon) and an ordered argument list `Vec<A>`. Plain closures of shape
//! `Fn(&C, Vec<A>) -> R` are callables out of the box.

/// The core trait implemented by targets and by every wrapper.
///
/// # Example
///
/// ```rust
/// use call_guard::Callable;
///
/// let add = |base: &i32, args: Vec<i32>| base + args.iter().sum::<i32>();
/// assert_eq!(add.invoke(&10, vec![1, 2, 3]), 16);
/// assert_eq!(add.call(vec![4, 5]), 9);
/// ```
pub trait Callable<C, A> {
    /// Value produced by one call.
    type Output;

    /// Calls with an explicit receiver and argument list.
    fn invoke(&self, receiver: &C, args: Vec<A>) -> Self::Output;

    /// Calls with the default receiver.
    #[inline]
    fn call(&self, args: Vec<A>) -> Self::Output
    where
        C: Default,
    {
        self.invoke(&C::default(), args)
    }
}

impl<C, A, R, F> Callable<C, A> for F
where
    F: Fn(&C, Vec<A>) -> R,
{
    type Output = R;

    #[inline(always)]
    fn invoke(&self, receiver: &C, args: Vec<A>) -> R {
        self(receiver, args)
    }
}

/// One call captured for later delivery: its receiver and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<C, A> {
    /// Receiver the target will be invoked on.
    pub receiver: C,
    /// Ordered argument list.
    pub args: Vec<A>,
}

impl<C, A> Invocation<C, A> {
    /// Creates a new invocation.
    pub fn new(receiver: C, args: Vec<A>) -> Self {
        Self { receiver, args }
    }

    /// Delivers this invocation to `target`.
    #[inline]
    pub fn deliver<F>(self, target: &F) -> F::Output
    where
        F: Callable<C, A> + ?Sized,
    {
        target.invoke(&self.receiver, self.args)
    }
}

/// Fixed receiver and arguments a wrapper substitutes for the call site's.
///
/// A bound receiver replaces whatever receiver the wrapper is called with;
/// bound arguments replace the call's own argument list. Either may be left
/// unset, in which case the call site's value is used.
///
/// # Example
///
/// ```rust
/// use call_guard::Binding;
///
/// let binding = Binding::new().receiver("ctx").args(vec![1, 2]);
/// let inv = binding.resolve(&"caller", vec![9]);
/// assert_eq!(inv.receiver, "ctx");
/// assert_eq!(inv.args, vec![1, 2]);
///
/// let open: Binding<&str, i32> = Binding::none();
/// let inv = open.resolve(&"caller", vec![9]);
/// assert_eq!(inv.receiver, "caller");
/// assert_eq!(inv.args, vec![9]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding<C, A> {
    receiver: Option<C>,
    args: Option<Vec<A>>,
}

impl<C, A> Default for Binding<C, A> {
    fn default() -> Self {
        Self::none()
    }
}

impl<C, A> Binding<C, A> {
    /// A binding that forwards the call site's receiver and arguments.
    pub fn none() -> Self {
        Self { receiver: None, args: None }
    }

    /// Same as [`Binding::none`]; reads better at the head of a builder chain.
    pub fn new() -> Self {
        Self::none()
    }

    /// Fixes the receiver.
    pub fn receiver(mut self, receiver: C) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Fixes the argument list.
    pub fn args(mut self, args: Vec<A>) -> Self {
        self.args = Some(args);
        self
    }

    /// Sets or clears the receiver from an `Option`.
    pub fn with_receiver(mut self, receiver: Option<C>) -> Self {
        self.receiver = receiver;
        self
    }

    /// Sets or clears the arguments from an `Option`.
    pub fn with_args(mut self, args: Option<Vec<A>>) -> Self {
        self.args = args;
        self
    }

    /// Returns the bound receiver, if any.
    pub fn bound_receiver(&self) -> Option<&C> {
        self.receiver.as_ref()
    }

    /// Returns the bound arguments, if any.
    pub fn bound_args(&self) -> Option<&[A]> {
        self.args.as_deref()
    }
}

impl<C, A: Clone> Binding<C, A> {
    /// Calls `target` right away with the binding applied, borrowing the
    /// receiver instead of cloning it.
    #[inline]
    pub fn forward<F>(&self, target: &F, receiver: &C, args: Vec<A>) -> F::Output
    where
        F: Callable<C, A> + ?Sized,
    {
        let receiver = self.receiver.as_ref().unwrap_or(receiver);
        let args = self.args.clone().unwrap_or(args);
        target.invoke(receiver, args)
    }
}

impl<C: Clone, A: Clone> Binding<C, A> {
    /// Applies the binding to one call, producing an owned invocation.
    pub fn resolve(&self, receiver: &C, args: Vec<A>) -> Invocation<C, A> {
        Invocation {
            receiver: self.receiver.as_ref().unwrap_or(receiver).clone(),
            args: self.args.clone().unwrap_or(args),
        }
    }

    /// Builds the invocation used when no call site exists, as for a timer.
    pub fn detached(&self) -> Invocation<C, A>
    where
        C: Default,
    {
        Invocation {
            receiver: self.receiver.clone().unwrap_or_default(),
            args: self.args.clone().unwrap_or_default(),
        }
    }
}
