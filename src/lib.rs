//! # Concordis
//!
//! **Concordis** is a small library of cooperative-concurrency primitives for
//! the **Nebula** ecosystem: an asynchronous multi-producer/multi-consumer
//! channel, an asynchronous mutex and a cooperative yield, all of which
//! schedule their wake-ups through a pluggable execution context instead of a
//! built-in runtime.
//!
//! Unlike a full runtime, Concordis never spawns or drives tasks itself. Every
//! suspending operation takes an [`Executor`](executor::Executor) — a handle
//! through which a nullary callable can be submitted to whatever scheduler the
//! host application already runs — and resumes the suspended task by
//! submitting a wake callable to that context. This makes the primitives
//! usable from any runtime, from hand-rolled event loops, or from plain
//! threads, offering:
//!
//! - An **executor abstraction** with an immediate (inline) variant, an
//!   adapter for any submit-a-callable function, a type-erased handle and a
//!   manually driven queue for deterministic tests
//! - An **unbounded MPMC channel** whose close semantics are driven by
//!   endpoint lifetimes: dropping the last sender or the last receiver closes
//!   the respective direction
//! - An **async mutex** that owns its guarded value and hands out scoped
//!   guards
//! - A **yield primitive** that reschedules the current task onto a chosen
//!   context
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use concordis::executor::ImmediateExecutor;
//! use concordis::sync::mpmc;
//!
//! let (sender, receiver) = mpmc::channel::<u32>();
//!
//! // Inside some task, driven by the scheduler of your choice:
//! sender.send(ImmediateExecutor, 42).await.unwrap();
//! assert_eq!(receiver.receive(ImmediateExecutor).await, Some(42));
//! ```
//!
//! ## Modules
//!
//! - [`executor`] — Execution-context abstraction and the bundled variants
//! - [`sync`] — Async mutex and the MPMC channel
//!
//! ## Cancellation
//!
//! There are no cancellation tokens or timeouts. A suspended operation is
//! cancelled by dropping its future; the primitives hold waiters weakly and
//! skip records whose task has gone away, so a wake callable never resumes a
//! dropped task.

pub mod executor;
pub mod sync;

mod yield_now;

pub use yield_now::{YieldNow, yield_now};
