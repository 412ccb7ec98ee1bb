//! Execution-context abstraction.
//!
//! An executor is a value through which a nullary callable can be submitted
//! for execution by some host scheduler. The primitives in this crate never
//! run tasks themselves; whenever one of them needs to resume a suspended
//! task it submits a wake callable to the executor the task named when it
//! suspended. The abstraction imposes no ordering or parallelism guarantees
//! of its own; the backing scheduler's policy governs.
//!
//! Four variants are bundled:
//!
//! - [`ImmediateExecutor`] runs every submission synchronously in the caller
//! - [`adapt`] turns any submit-a-callable function into an executor
//! - [`AnyExecutor`] type-erases an arbitrary executor so differently typed
//!   contexts can be stored uniformly
//! - [`ManualExecutor`] queues submissions until explicitly driven, which
//!   makes interleavings deterministic in tests

mod adapt;
mod any;
mod immediate;
mod manual;

pub use adapt::{AdaptedExecutor, adapt};
pub use any::AnyExecutor;
pub use immediate::ImmediateExecutor;
pub use manual::ManualExecutor;

/// A boxed nullary callable, the unit of work submitted to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A handle through which nullary callables are submitted to a host
/// scheduler.
///
/// Implementations are cheap, non-panicking to copy and comparable:
/// equality must be reflexive for contexts that are interchangeable and must
/// distinguish distinct scheduling targets. Submission hands the callable to
/// the scheduler exactly once; whether it runs inline, later on this thread
/// or on another thread is the scheduler's business.
pub trait Executor: Clone + PartialEq + Send + Sync + 'static {
    /// Submits `job` for execution.
    fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}
