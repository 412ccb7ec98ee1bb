use crate::executor::{AnyExecutor, Executor};

use std::cell::UnsafeCell;
use std::future::Future;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::sync::{Arc, Mutex as Mutex_std, Weak};
use std::task::{Context, Poll, Waker};

/// An asynchronous mutex that owns its guarded value.
///
/// `Mutex<T>` provides mutual exclusion between tasks. Unlike a standard
/// `std::sync::Mutex`, it never blocks the thread: a task that cannot
/// acquire the lock suspends, and is resumed through the execution context
/// it named when it called [`lock`](Mutex::lock).
///
/// The guarded value lives inside the mutex; [`MutexGuard`] re-borrows it
/// for as long as the guard exists, and releasing the guard wakes the
/// waiting tasks.
pub struct Mutex<T> {
    /// Locked flag and waiter list, shared with in-flight wake callables.
    ///
    /// Lives behind its own `Arc` so that wake callables, which must be
    /// `'static`, can reach the lock state without borrowing the mutex.
    state: Arc<LockState>,

    /// The underlying data protected by the mutex.
    ///
    /// `UnsafeCell` allows mutable access through shared references, which
    /// is safe because the `locked` flag guarantees mutual exclusion.
    data: UnsafeCell<T>,
}

// Safety: `Mutex<T>` can be sent across threads if `T` is Send.
unsafe impl<T: Send> Send for Mutex<T> {}
// Safety: `Mutex<T>` can be shared across threads if `T` is Send, because
// access to the value goes through the guard and the `locked` flag
// serializes guards.
unsafe impl<T: Send> Sync for Mutex<T> {}

/// Lock flag and waiter list behind the mutex.
struct LockState {
    queue: Mutex_std<LockQueue>,
}

struct LockQueue {
    /// Indicates whether a guard is currently outstanding.
    locked: bool,

    /// Waiter records of suspended `lock` calls.
    ///
    /// Held weakly: a record whose task has been dropped turns stale and is
    /// skipped on wake-up.
    waiters: Vec<Weak<LockWaiter>>,
}

/// A suspended `lock` call.
///
/// Strongly co-owned by the in-flight [`LockFuture`] and, transiently, by
/// the wake callable running on its executor; the lock state only holds it
/// weakly.
struct LockWaiter {
    /// Back-pointer to the owning lock state.
    state: Arc<LockState>,

    /// The context the task must be resumed through.
    exec: AnyExecutor,

    slot: Mutex_std<WaiterSlot>,
}

struct WaiterSlot {
    waker: Option<Waker>,

    /// Set by a wake callable that won the lock on this waiter's behalf.
    acquired: bool,

    /// Set when the `LockFuture` is dropped; a wake callable that observes
    /// it must not hand the lock to this record.
    abandoned: bool,
}

impl LockState {
    /// Marks the mutex unlocked and wakes every waiter.
    ///
    /// The waiter list is drained under the lock and the wake callables are
    /// submitted outside it, so an immediate executor re-entering `lock`
    /// from inside a wake does not deadlock.
    fn unlock(&self) {
        let waiters = {
            let mut queue = self.queue.lock().unwrap();
            queue.locked = false;
            mem::take(&mut queue.waiters)
        };

        // Wake all waiters and let them race to re-acquire; losers put
        // themselves back on the list.
        for weak in waiters {
            if let Some(waiter) = weak.upgrade() {
                Self::wakeup(waiter, weak);
            } else {
                log::trace!("mutex: skipping stale waiter");
            }
        }
    }

    /// Submits the poll-on-wake callable for one waiter.
    fn wakeup(waiter: Arc<LockWaiter>, weak: Weak<LockWaiter>) {
        let exec = waiter.exec.clone();
        // The callable's weak upgrade must be the only liveness decision
        // point; our strong reference may not outlive the submission.
        drop(waiter);

        exec.execute(move || {
            let Some(waiter) = weak.upgrade() else {
                log::trace!("mutex: waiter dropped before wake-up");
                return;
            };

            let mut queue = waiter.state.queue.lock().unwrap();
            let mut slot = waiter.slot.lock().unwrap();
            if slot.abandoned {
                return;
            }
            if !queue.locked {
                queue.locked = true;
                slot.acquired = true;
                let waker = slot.waker.take();
                drop(slot);
                drop(queue);
                if let Some(waker) = waker {
                    waker.wake();
                }
            } else {
                // Lost the race; wait for the next unlock.
                drop(slot);
                queue.waiters.push(weak);
            }
        });
    }
}

impl<T> Mutex<T> {
    /// Creates a new mutex wrapping the given value.
    ///
    /// The mutex starts unlocked with no waiters.
    pub fn new(value: T) -> Mutex<T> {
        Self {
            state: Arc::new(LockState {
                queue: Mutex_std::new(LockQueue {
                    locked: false,
                    waiters: Vec::new(),
                }),
            }),
            data: UnsafeCell::new(value),
        }
    }

    /// Attempts to acquire the lock without suspending.
    ///
    /// Returns `None` if a guard is currently outstanding.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        let mut queue = self.state.queue.lock().unwrap();
        if queue.locked {
            return None;
        }
        queue.locked = true;
        Some(MutexGuard {
            mutex: self,
            _not_auto: PhantomData,
        })
    }

    /// Acquires the lock, suspending the task while a guard is outstanding.
    ///
    /// `exec` is the context the task will be resumed through when the lock
    /// is released by another guard. If the mutex is free the future
    /// completes on its first poll without suspending.
    ///
    /// Waiters are woken in no particular order and race for the lock;
    /// fairness is not guaranteed.
    ///
    /// # Examples
    /// ```rust,ignore
    /// let guard = mutex.lock(exec).await;
    /// // This task now has exclusive access to the value.
    /// *guard += 1;
    /// ```
    pub fn lock<E: Executor>(&self, exec: E) -> LockFuture<'_, T> {
        LockFuture {
            mutex: self,
            waiter: Arc::new(LockWaiter {
                state: self.state.clone(),
                exec: AnyExecutor::new(exec),
                slot: Mutex_std::new(WaiterSlot {
                    waker: None,
                    acquired: false,
                    abandoned: false,
                }),
            }),
            registered: false,
            taken: false,
        }
    }

    /// Returns a mutable reference to the value.
    ///
    /// No locking is needed; the exclusive borrow of the mutex guarantees
    /// no guard exists.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consumes the mutex and returns the value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

/// Future returned by [`Mutex::lock`].
///
/// Resolves to a [`MutexGuard`] once the lock is acquired. Dropping the
/// future cancels the lock attempt; if a wake callable had already handed
/// the lock over, the drop releases it again so other waiters can proceed.
pub struct LockFuture<'a, T> {
    mutex: &'a Mutex<T>,
    waiter: Arc<LockWaiter>,
    registered: bool,
    taken: bool,
}

impl<'a, T> Future for LockFuture<'a, T> {
    type Output = MutexGuard<'a, T>;

    /// Polls the future to attempt acquiring the mutex.
    ///
    /// The first poll either acquires immediately or parks the waiter
    /// record. Later polls observe whether a wake callable has transferred
    /// the lock to this waiter.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.taken {
            panic!("LockFuture polled after completion");
        }

        if !this.registered {
            let mut queue = this.mutex.state.queue.lock().unwrap();
            if !queue.locked {
                // Lock acquired without suspending.
                queue.locked = true;
                this.taken = true;
                return Poll::Ready(MutexGuard {
                    mutex: this.mutex,
                    _not_auto: PhantomData,
                });
            }
            this.waiter.slot.lock().unwrap().waker = Some(cx.waker().clone());
            queue.waiters.push(Arc::downgrade(&this.waiter));
            this.registered = true;
            return Poll::Pending;
        }

        let mut slot = this.waiter.slot.lock().unwrap();
        if slot.acquired {
            this.taken = true;
            Poll::Ready(MutexGuard {
                mutex: this.mutex,
                _not_auto: PhantomData,
            })
        } else {
            slot.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl<T> Drop for LockFuture<'_, T> {
    fn drop(&mut self) {
        if self.taken {
            return;
        }
        let acquired = {
            let mut slot = self.waiter.slot.lock().unwrap();
            slot.abandoned = true;
            slot.acquired
        };
        // A wake callable handed us the lock, but no task is left to claim
        // it; release it so the remaining waiters are not stranded.
        if acquired {
            self.waiter.state.unlock();
        }
    }
}

/// Guard granting exclusive access to the value of a [`Mutex`].
///
/// Releases the mutex when dropped; [`unlock`](MutexGuard::unlock) releases
/// it early. The guard is move-only.
pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
    // Opts out of the auto Send/Sync impls; the manual impls below carry
    // the correct bounds.
    _not_auto: PhantomData<*const ()>,
}

// Safety: the guard releases the lock on whatever thread drops it, and
// moving it moves exclusive access to the value, which needs `T: Send`.
unsafe impl<T: Send> Send for MutexGuard<'_, T> {}
// Safety: sharing the guard shares `&T`, which needs `T: Sync`.
unsafe impl<T: Send + Sync> Sync for MutexGuard<'_, T> {}

impl<T> MutexGuard<'_, T> {
    /// Releases the lock before the end of scope.
    pub fn unlock(self) {
        drop(self);
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    /// Unlocks the mutex and wakes the waiting tasks.
    fn drop(&mut self) {
        self.mutex.state.unlock();
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.mutex.data.get() }
    }
}
