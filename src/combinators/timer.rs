use crate::callable::{Binding, Callable};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::types::Uint;

/// Runs `target` once, `ticks` from now.
///
/// The receiver is `bind` or `C::default()`; the arguments are `args` or an
/// empty list. The returned handle cancels the call while it is pending.
pub fn delay<F, C, A>(
    scheduler: &Scheduler,
    target: F,
    ticks: Uint,
    bind: Option<C>,
    args: Option<Vec<A>>,
) -> TimerHandle
where
    F: Callable<C, A> + 'static,
    C: Clone + Default + 'static,
    A: Clone + 'static,
{
    let mut invocation = Some(Binding::new().with_receiver(bind).with_args(args).detached());
    scheduler.set_timeout(ticks, move || {
        if let Some(invocation) = invocation.take() {
            let _ = invocation.deliver(&target);
        }
    })
}

/// Runs `target` every `ticks` until the returned handle is cancelled.
pub fn periodical<F, C, A>(
    scheduler: &Scheduler,
    target: F,
    ticks: Uint,
    bind: Option<C>,
    args: Option<Vec<A>>,
) -> TimerHandle
where
    F: Callable<C, A> + 'static,
    C: Clone + Default + 'static,
    A: Clone + 'static,
{
    let invocation = Binding::new().with_receiver(bind).with_args(args).detached();
    scheduler.set_interval(ticks, move || {
        let _ = invocation.clone().deliver(&target);
    })
}
