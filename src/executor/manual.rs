use crate::executor::{Executor, Job};

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex};

/// An executor that queues submissions until explicitly driven.
///
/// Nothing runs until [`run`](ManualExecutor::run) is called, which makes
/// interleavings fully deterministic: a test submits work, drives the queue
/// one pass at a time and asserts on the state in between. This is the
/// executor the integration tests of this crate are written against.
///
/// Clones share the queue. Equality is queue identity.
#[derive(Clone)]
pub struct ManualExecutor {
    queue: Arc<Mutex<VecDeque<Job>>>,
}

impl ManualExecutor {
    /// Creates an executor with an empty queue.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Runs the jobs that were enqueued when the call was made and returns
    /// how many ran.
    ///
    /// Jobs submitted while the pass is running (wake callables are the
    /// usual culprits) stay queued for the next pass. Repeatedly calling
    /// `run` until it returns `0` drains every transitively scheduled job.
    pub fn run(&self) -> usize {
        let batch = mem::take(&mut *self.queue.lock().unwrap());
        let count = batch.len();
        for job in batch {
            job();
        }
        count
    }

    /// Returns the number of jobs currently queued.
    ///
    /// A snapshot; concurrent submissions can change it immediately.
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

impl Default for ManualExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ManualExecutor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.queue, &other.queue)
    }
}

impl fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Executor for ManualExecutor {
    fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.lock().unwrap().push_back(Box::new(job));
    }
}
