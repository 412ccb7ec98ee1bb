use crate::executor::{Executor, Job};

use std::fmt;
use std::sync::Arc;

/// Object-safe shim behind [`AnyExecutor`].
///
/// [`Executor::execute`] is generic over the callable, so the trait itself
/// cannot be made into an object; this shim fixes the callable to [`Job`].
trait DynExecutor: Send + Sync {
    fn execute_job(&self, job: Job);
}

impl<E: Executor> DynExecutor for E {
    fn execute_job(&self, job: Job) {
        self.execute(job);
    }
}

/// A type-erased executor handle.
///
/// `AnyExecutor` stores any [`Executor`] behind a shared vtable so that
/// differently typed contexts can live in one field. The waiter records of
/// the mutex and the channel need this: their type is fixed when the waiter
/// is defined, long before they learn which concrete context a task will
/// name.
///
/// Cloning shares the erased object. Equality is identity of that object:
/// a handle equals itself and its clones, and nothing else.
#[derive(Clone)]
pub struct AnyExecutor {
    inner: Arc<dyn DynExecutor>,
}

impl AnyExecutor {
    /// Erases `exec` behind a uniform interface.
    pub fn new<E: Executor>(exec: E) -> Self {
        Self {
            inner: Arc::new(exec),
        }
    }
}

impl PartialEq for AnyExecutor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for AnyExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyExecutor").finish_non_exhaustive()
    }
}

impl Executor for AnyExecutor {
    fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.execute_job(Box::new(job));
    }
}
