//! Unbounded multi-producer/multi-consumer channel.
//!
//! A channel has two endpoints: a [`Sender`] and a [`Receiver`]. Both are
//! clonable, so any number of producers and consumers can share one channel.
//! The number of live endpoints on each side is tracked, and the channel
//! closes a direction when the last endpoint of the other side is dropped:
//! once every sender is gone, receivers drain the buffered values and are
//! then told the channel is closed; once every receiver is gone, sends fail
//! with [`SendError::Closed`].
//!
//! Values are buffered in an unbounded FIFO queue. Order is preserved per
//! producer; nothing is guaranteed about which of several consumers gets
//! which value, because parked consumers are woken all at once and race for
//! the queue.

use crate::executor::{AnyExecutor, Executor};
use crate::yield_now::{YieldNow, yield_now};

use std::collections::VecDeque;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll, Waker, ready};

use thiserror::Error;

/// Error returned by [`Sender::try_send`] and [`Sender::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// All receivers have been dropped; the value was not enqueued.
    #[error("sending on a closed channel")]
    Closed,
}

/// Error returned by [`Receiver::try_receive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryReceiveError {
    /// The buffer is empty but senders are still alive.
    #[error("receiving on an empty channel")]
    Empty,
    /// The buffer is empty and every sender has been dropped.
    #[error("receiving on a closed channel")]
    Closed,
}

/// Opaque endpoint marker.
///
/// Each side of the channel holds strong references to its ticket while the
/// state holds only a weak one, so the strong count mirrors the number of
/// live endpoints on that side without a hand-rolled counter.
struct Ticket;

/// A parked `receive` call.
///
/// Strongly co-owned by the in-flight [`ReceiveFuture`] and, transiently,
/// by the wake callable running on its executor; the channel state holds it
/// weakly and skips it once the future is gone.
struct ReceiveWaiter<T: Send + 'static> {
    /// The context the task must be resumed through.
    exec: AnyExecutor,

    slot: Mutex<ReceiveSlot<T>>,
}

enum ReceiveSlot<T> {
    /// Parked; holds the task's waker.
    Waiting(Option<Waker>),

    /// A wake callable delivered an outcome. `None` means the channel
    /// closed.
    Delivered(Option<T>),

    /// The future consumed the outcome.
    Claimed,
}

impl<T: Send + 'static> ReceiveWaiter<T> {
    /// Writes the receive outcome into the slot and wakes the task.
    ///
    /// Callers must not hold the channel lock: with an immediate executor
    /// the woken task can re-enter the channel from inside this call.
    fn deliver(&self, value: Option<T>) {
        let waker = {
            let mut slot = self.slot.lock().unwrap();
            let waker = match &mut *slot {
                ReceiveSlot::Waiting(waker) => waker.take(),
                _ => None,
            };
            *slot = ReceiveSlot::Delivered(value);
            waker
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// Shared channel state.
struct State<T: Send + 'static> {
    shared: Mutex<Shared<T>>,

    /// Alive while at least one `Sender` exists.
    sender_ticket: Weak<Ticket>,

    /// Alive while at least one `Receiver` exists.
    receiver_ticket: Weak<Ticket>,
}

struct Shared<T: Send + 'static> {
    /// Buffered values, oldest first.
    data: VecDeque<T>,

    /// Parked receivers, held weakly.
    ///
    /// Invariant: while senders are alive, a waiter is only parked when
    /// `data` is empty at the moment of parking.
    waiters: Vec<Weak<ReceiveWaiter<T>>>,
}

impl<T: Send + 'static> Shared<T> {
    fn pop_value(&mut self) -> Option<T> {
        self.data.pop_front()
    }
}

/// Wakes a batch of drained receiver waiters.
///
/// Each live waiter gets a callable submitted to its own executor. That
/// callable re-checks the channel: it pops a value or observes closure and
/// delivers, or, with an empty queue and senders still alive, parks the
/// waiter again. Waking every parked receiver on every publish costs some
/// spurious wake work, but no combination of receiver drops and races can
/// leave a value buffered with all receivers parked: each surviving
/// receiver re-enters the lock and observes the fresh state when its wake
/// runs.
fn wakeup_waiting_receivers<T: Send + 'static>(
    state: &Arc<State<T>>,
    waiters: Vec<Weak<ReceiveWaiter<T>>>,
) {
    for weak in waiters {
        let Some(waiter) = weak.upgrade() else {
            log::trace!("mpmc: skipping stale receiver waiter");
            continue;
        };
        let exec = waiter.exec.clone();
        // The callable's weak upgrade must be the only liveness decision
        // point; our strong reference may not outlive the submission.
        drop(waiter);

        let state = Arc::clone(state);
        exec.execute(move || {
            let Some(waiter) = weak.upgrade() else {
                log::trace!("mpmc: receiver dropped before wake-up");
                return;
            };
            let mut shared = state.shared.lock().unwrap();
            let value = shared.pop_value();
            let closed = state.sender_ticket.upgrade().is_none();
            if value.is_some() || closed {
                drop(shared);
                waiter.deliver(value);
            } else {
                // No data and senders are still alive; park again for a
                // future publish.
                shared.waiters.push(weak);
            }
        });
    }
}

/// The sending half of a channel.
///
/// Clonable; the channel stays open to receivers until every clone is
/// dropped.
pub struct Sender<T: Send + 'static> {
    state: Arc<State<T>>,

    /// `None` only transiently inside `drop`.
    ticket: Option<Arc<Ticket>>,
}

impl<T: Send + 'static> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            ticket: self.ticket.clone(),
        }
    }
}

impl<T: Send + 'static> Sender<T> {
    /// Enqueues `value` without suspending.
    ///
    /// Fails with [`SendError::Closed`] when every receiver has been
    /// dropped. On success any parked receivers are woken.
    pub fn try_send(&self, value: T) -> Result<(), SendError> {
        if self.state.receiver_ticket.upgrade().is_none() {
            return Err(SendError::Closed);
        }

        let waiters = {
            let mut shared = self.state.shared.lock().unwrap();
            shared.data.push_back(value);
            mem::take(&mut shared.waiters)
        };
        wakeup_waiting_receivers(&self.state, waiters);

        Ok(())
    }

    /// Sends `value`, then yields once to `exec`.
    ///
    /// Awaiting the future enqueues the value (waking parked receivers) and
    /// resumes the task through `exec`, completing with `Ok(())`. When every
    /// receiver has been dropped nothing is enqueued and the future
    /// completes with [`SendError::Closed`] after the same hop.
    ///
    /// The channel is unbounded, so a send never waits for a receiver; the
    /// suspension is exactly the one-hop reschedule onto `exec`.
    #[must_use = "futures do nothing unless awaited; the value is sent on first poll"]
    pub fn send<E: Executor>(&self, exec: E, value: T) -> SendFuture<E, T> {
        SendFuture {
            state: self.state.clone(),
            init: Some((exec, value)),
            closed: false,
            hop: None,
        }
    }
}

impl<T: Send + 'static> Drop for Sender<T> {
    /// Drops this sender's ticket and, when it was the last one, wakes
    /// every parked receiver so it can observe the closed channel.
    ///
    /// The ticket is released under the channel lock: concurrent sender
    /// drops serialize there, so exactly one of them observes itself to be
    /// last and drains the waiter list.
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        let mut shared = self.state.shared.lock().unwrap();
        let last = Arc::strong_count(&ticket) == 1;
        drop(ticket);
        if last {
            let waiters = mem::take(&mut shared.waiters);
            drop(shared);
            log::trace!(
                "mpmc: last sender dropped, waking {} parked receivers",
                waiters.len()
            );
            wakeup_waiting_receivers(&self.state, waiters);
        }
    }
}

/// Future returned by [`Sender::send`].
pub struct SendFuture<E: Executor, T: Send + 'static> {
    state: Arc<State<T>>,

    /// Context and value, consumed by the first poll.
    init: Option<(E, T)>,

    closed: bool,
    hop: Option<YieldNow<E>>,
}

// No field is ever pinned; the future moves freely between polls.
impl<E: Executor, T: Send + 'static> Unpin for SendFuture<E, T> {}

impl<E: Executor, T: Send + 'static> Future for SendFuture<E, T> {
    type Output = Result<(), SendError>;

    /// Polls the send.
    ///
    /// The first poll enqueues the value (or observes the closed channel)
    /// and starts the hop onto the target context; the future completes
    /// once the hop has run.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some((exec, value)) = this.init.take() {
            if this.state.receiver_ticket.upgrade().is_none() {
                this.closed = true;
            } else {
                let waiters = {
                    let mut shared = this.state.shared.lock().unwrap();
                    shared.data.push_back(value);
                    mem::take(&mut shared.waiters)
                };
                wakeup_waiting_receivers(&this.state, waiters);
            }

            this.hop = Some(yield_now(exec));
        }

        let hop = this.hop.as_mut().expect("hop initialized on first poll");
        ready!(Pin::new(hop).poll(cx));

        if this.closed {
            Poll::Ready(Err(SendError::Closed))
        } else {
            Poll::Ready(Ok(()))
        }
    }
}

/// The receiving half of a channel.
///
/// Clonable; the channel stays open to senders until every clone is
/// dropped.
pub struct Receiver<T: Send + 'static> {
    state: Arc<State<T>>,
    ticket: Arc<Ticket>,
}

impl<T: Send + 'static> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            ticket: self.ticket.clone(),
        }
    }
}

impl<T: Send + 'static> Receiver<T> {
    /// Returns the number of buffered values.
    ///
    /// A snapshot; concurrent sends and receives can change it immediately.
    pub fn available(&self) -> usize {
        self.state.shared.lock().unwrap().data.len()
    }

    /// Pops the oldest buffered value without suspending.
    ///
    /// Never waits for data. An empty buffer yields
    /// [`TryReceiveError::Empty`] while senders are alive and
    /// [`TryReceiveError::Closed`] once they are all gone, which makes this
    /// useful as an optimistic check before committing to a suspending
    /// [`receive`](Receiver::receive).
    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        let mut shared = self.state.shared.lock().unwrap();
        if let Some(value) = shared.pop_value() {
            return Ok(value);
        }
        if self.state.sender_ticket.upgrade().is_some() {
            Err(TryReceiveError::Empty)
        } else {
            Err(TryReceiveError::Closed)
        }
    }

    /// Receives the oldest value, suspending while the buffer is empty.
    ///
    /// `exec` is the context the task will be resumed through when a value
    /// arrives or the channel closes. The future resolves to `Some(value)`,
    /// or to `None` once every sender has been dropped and the buffer is
    /// drained. If a value is already buffered the future completes on its
    /// first poll without suspending.
    #[must_use = "futures do nothing unless awaited"]
    pub fn receive<E: Executor>(&self, exec: E) -> ReceiveFuture<T> {
        ReceiveFuture {
            state: self.state.clone(),
            waiter: Arc::new(ReceiveWaiter {
                exec: AnyExecutor::new(exec),
                slot: Mutex::new(ReceiveSlot::Waiting(None)),
            }),
            registered: false,
        }
    }
}

/// Future returned by [`Receiver::receive`].
///
/// Dropping it cancels the receive; a parked waiter record turns stale and
/// is skipped by later wake-ups.
pub struct ReceiveFuture<T: Send + 'static> {
    state: Arc<State<T>>,
    waiter: Arc<ReceiveWaiter<T>>,
    registered: bool,
}

impl<T: Send + 'static> Future for ReceiveFuture<T> {
    type Output = Option<T>;

    /// Polls the receive.
    ///
    /// The first poll pops a buffered value or observes closure, completing
    /// without suspending; otherwise it parks the waiter record. Later
    /// polls observe whether a wake callable has delivered into the slot.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if !this.registered {
            this.registered = true;
            let mut shared = this.state.shared.lock().unwrap();
            if let Some(value) = shared.pop_value() {
                *this.waiter.slot.lock().unwrap() = ReceiveSlot::Claimed;
                return Poll::Ready(Some(value));
            }
            if this.state.sender_ticket.upgrade().is_none() {
                *this.waiter.slot.lock().unwrap() = ReceiveSlot::Claimed;
                return Poll::Ready(None);
            }
            *this.waiter.slot.lock().unwrap() = ReceiveSlot::Waiting(Some(cx.waker().clone()));
            shared.waiters.push(Arc::downgrade(&this.waiter));
            return Poll::Pending;
        }

        let mut slot = this.waiter.slot.lock().unwrap();
        match &mut *slot {
            ReceiveSlot::Delivered(value) => {
                let value = value.take();
                *slot = ReceiveSlot::Claimed;
                Poll::Ready(value)
            }
            ReceiveSlot::Waiting(waker) => {
                *waker = Some(cx.waker().clone());
                Poll::Pending
            }
            ReceiveSlot::Claimed => panic!("ReceiveFuture polled after completion"),
        }
    }
}

/// Creates a channel, returning its sender and receiver.
///
/// Both endpoints start with a ticket strong count of one; cloning an
/// endpoint raises its side's count, dropping lowers it, and a side
/// reaching zero closes the channel for the other side.
pub fn channel<T: Send + 'static>() -> (Sender<T>, Receiver<T>) {
    let sender_ticket = Arc::new(Ticket);
    let receiver_ticket = Arc::new(Ticket);
    let state = Arc::new(State {
        shared: Mutex::new(Shared {
            data: VecDeque::new(),
            waiters: Vec::new(),
        }),
        sender_ticket: Arc::downgrade(&sender_ticket),
        receiver_ticket: Arc::downgrade(&receiver_ticket),
    });
    let sender = Sender {
        state: state.clone(),
        ticket: Some(sender_ticket),
    };
    let receiver = Receiver {
        state,
        ticket: receiver_ticket,
    };
    (sender, receiver)
}
