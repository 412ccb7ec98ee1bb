//! Minimal task harness for driving the crate's futures in tests.
//!
//! The library under test never runs tasks itself, so the tests need a host:
//! [`spawn_on`] boxes a future and polls it through executor submissions.
//! The waker re-polls the task inline on whichever context executes the
//! wake, so a wake callable submitted to a given executor resumes the task
//! on exactly that executor. That is what makes the step-by-step
//! `ManualExecutor::run` choreography in the tests deterministic.

use concordis::executor::Executor;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake, Waker};

const IDLE: u8 = 0;
const SCHEDULED: u8 = 1;
const RUNNING: u8 = 2;
const NOTIFIED: u8 = 3;
const DONE: u8 = 4;

struct TaskCore {
    /// The future being driven. `None` once the task finished or its handle
    /// was dropped.
    future: Mutex<Option<Pin<Box<dyn Future<Output = ()> + Send>>>>,

    /// Lifecycle state (IDLE / SCHEDULED / RUNNING / NOTIFIED / DONE).
    state: AtomicU8,
}

impl TaskCore {
    /// Polls the future until it is pending and unnotified, or done.
    fn run(self: Arc<Self>) {
        let mut slot = self.future.lock().unwrap();
        loop {
            self.state.store(RUNNING, Ordering::Release);

            let waker = Waker::from(Arc::clone(&self));
            let mut cx = Context::from_waker(&waker);
            let poll = {
                let Some(future) = slot.as_mut() else {
                    // Handle dropped the future; nothing left to poll.
                    return;
                };
                future.as_mut().poll(&mut cx)
            };

            match poll {
                Poll::Ready(()) => {
                    *slot = None;
                    self.state.store(DONE, Ordering::Release);
                    return;
                }
                Poll::Pending => {
                    if self
                        .state
                        .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                    // A wake arrived while polling (NOTIFIED); poll again.
                }
            }
        }
    }
}

impl Wake for TaskCore {
    /// Resumes the task on the calling context.
    ///
    /// An idle task is polled right here, so the task continues on whatever
    /// executor ran the wake callable. A wake that lands mid-poll only flags
    /// the task for another round.
    fn wake(self: Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, SCHEDULED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.run();
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                // Already scheduled, notified or finished.
                _ => return,
            }
        }
    }
}

/// Handle to a spawned task.
///
/// Dropping the handle cancels the task: the future is destroyed, any
/// waiter records it held collapse, and later wake-ups observe stale
/// entries instead of a task.
pub struct TaskHandle {
    core: Arc<TaskCore>,
}

impl TaskHandle {
    /// Whether the task ran to completion.
    pub fn is_done(&self) -> bool {
        self.core.state.load(Ordering::Acquire) == DONE
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.core.future.lock().unwrap().take();
    }
}

/// Spawns `future` as a task whose initial poll is submitted to `exec`.
pub fn spawn_on<E, F>(exec: &E, future: F) -> TaskHandle
where
    E: Executor,
    F: Future<Output = ()> + Send + 'static,
{
    let core = Arc::new(TaskCore {
        future: Mutex::new(Some(Box::pin(future))),
        state: AtomicU8::new(SCHEDULED),
    });
    let task = core.clone();
    exec.execute(move || task.run());
    TaskHandle { core }
}
