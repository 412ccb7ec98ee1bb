//! Synchronization primitives for cooperating tasks.
//!
//! Both primitives here follow the same coordination pattern: a suspending
//! operation registers a reference-counted waiter record against the shared
//! structure, the structure holds the record weakly, and matching events
//! resume the task by submitting a wake callable to the execution context
//! the waiter named. Records whose task has been dropped turn stale and are
//! skipped on wake.

pub mod mpmc;

mod mutex;

pub use mutex::{LockFuture, Mutex, MutexGuard};
