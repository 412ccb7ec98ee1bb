use crate::executor::Executor;

/// An executor that runs every submission synchronously in the caller.
///
/// `execute` returns only after the callable has finished. Code that submits
/// wake callables must therefore tolerate reentrancy when this variant is in
/// play: the wake runs inside the submitting call, on the submitting thread.
/// The primitives in this crate release their internal locks before
/// submitting for exactly this reason.
///
/// All `ImmediateExecutor` values are interchangeable, so they all compare
/// equal.
///
/// # Example
/// ```
/// use concordis::executor::{Executor, ImmediateExecutor};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// let ran = Arc::new(AtomicBool::new(false));
/// let flag = ran.clone();
/// ImmediateExecutor.execute(move || flag.store(true, Ordering::Release));
/// assert!(ran.load(Ordering::Acquire));
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImmediateExecutor;

impl Executor for ImmediateExecutor {
    fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        job();
    }
}
