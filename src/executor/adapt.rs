use crate::executor::{Executor, Job};

/// An executor built from a plain submission function.
///
/// Every call to [`execute`](Executor::execute) boxes the callable as a
/// [`Job`] and forwards it to the wrapped function. This is how external
/// schedulers are plugged in without implementing [`Executor`] themselves.
///
/// Two adapted executors are never considered equal, not even an adapter and
/// its clone: nothing identifies the scheduling target behind an arbitrary
/// closure, so the conservative answer is "different".
#[derive(Debug, Clone)]
pub struct AdaptedExecutor<F> {
    submit: F,
}

impl<F> PartialEq for AdaptedExecutor<F> {
    fn eq(&self, _: &Self) -> bool {
        false
    }
}

impl<F> Executor for AdaptedExecutor<F>
where
    F: Fn(Job) + Clone + Send + Sync + 'static,
{
    fn execute<G>(&self, job: G)
    where
        G: FnOnce() + Send + 'static,
    {
        (self.submit)(Box::new(job));
    }
}

/// Adapts a submission function into an [`Executor`].
///
/// `submit` receives each job and is expected to hand it to the real
/// scheduler. It must be cloneable, since executor handles are copied into
/// every waiter record that names them.
///
/// # Example
/// ```
/// use concordis::executor::{Executor, ManualExecutor, adapt};
///
/// let queue = ManualExecutor::new();
/// let q = queue.clone();
/// let exec = adapt(move |job| q.execute(job));
///
/// exec.execute(|| println!("deferred"));
/// assert_eq!(queue.run(), 1);
/// ```
pub fn adapt<F>(submit: F) -> AdaptedExecutor<F>
where
    F: Fn(Job) + Clone + Send + Sync + 'static,
{
    AdaptedExecutor { submit }
}
