use crate::callable::Callable;

/// How a [`Bound`] callable combines its fixed arguments with the call's.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Splice<A> {
    /// Use the fixed list instead of the call's, when one is set.
    Replace(Option<Vec<A>>),
    /// Fixed arguments first, then the call's.
    Prepend(Vec<A>),
    /// The call's arguments first, then the fixed ones.
    Append(Vec<A>),
}

/// Places `front` before `rest`.
#[inline]
pub(crate) fn splice_front<A>(mut front: Vec<A>, rest: Vec<A>) -> Vec<A> {
    front.extend(rest);
    front
}

/// Places `tail` after `args`.
#[inline]
pub(crate) fn splice_back<A>(mut args: Vec<A>, tail: Vec<A>) -> Vec<A> {
    args.extend(tail);
    args
}

/// A callable with fixed arguments and, optionally, a fixed receiver.
///
/// Built by [`pass`], [`prepend`] and [`append`].
///
/// # Example
///
/// ```rust
/// use call_guard::Callable;
/// use call_guard::combinators::prepend;
///
/// let join = |sep: &&str, words: Vec<&str>| words.join(*sep);
/// let greet = prepend(join, vec!["say", "hello"], Some(" "));
///
/// assert_eq!(greet.invoke(&",", vec!["world"]), "say hello world");
/// ```
#[derive(Debug, Clone)]
pub struct Bound<F, C, A> {
    target: F,
    splice: Splice<A>,
    receiver: Option<C>,
}

impl<F, C, A> Bound<F, C, A> {
    /// Returns the wrapped target.
    pub fn target(&self) -> &F {
        &self.target
    }

    /// Returns the bound receiver, if any.
    pub fn receiver(&self) -> Option<&C> {
        self.receiver.as_ref()
    }
}

impl<F, C, A> Callable<C, A> for Bound<F, C, A>
where
    F: Callable<C, A>,
    A: Clone,
{
    type Output = F::Output;

    fn invoke(&self, receiver: &C, args: Vec<A>) -> F::Output {
        let receiver = self.receiver.as_ref().unwrap_or(receiver);
        let args = match &self.splice {
            Splice::Replace(Some(fixed)) => fixed.clone(),
            Splice::Replace(None) => args,
            Splice::Prepend(fixed) => splice_front(fixed.clone(), args),
            Splice::Append(fixed) => splice_back(args, fixed.clone()),
        };
        self.target.invoke(receiver, args)
    }
}

/// Returns a callable that always runs with `args` and `bind`, whatever it
/// is called with.
///
/// With `args == None` the call's own arguments are forwarded; with
/// `bind == None` the call's own receiver is.
pub fn pass<F, C, A>(target: F, args: Option<Vec<A>>, bind: Option<C>) -> Bound<F, C, A>
where
    F: Callable<C, A>,
{
    Bound {
        target,
        splice: Splice::Replace(args),
        receiver: bind,
    }
}

/// Returns a callable that places `args` before the call's arguments.
pub fn prepend<F, C, A>(target: F, args: Vec<A>, bind: Option<C>) -> Bound<F, C, A>
where
    F: Callable<C, A>,
{
    Bound {
        target,
        splice: Splice::Prepend(args),
        receiver: bind,
    }
}

/// Returns a callable that places `args` after the call's arguments.
pub fn append<F, C, A>(target: F, args: Vec<A>, bind: Option<C>) -> Bound<F, C, A>
where
    F: Callable<C, A>,
{
    Bound {
        target,
        splice: Splice::Append(args),
        receiver: bind,
    }
}
