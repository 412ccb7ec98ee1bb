use crate::executor::Executor;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll, Waker};

/// Shared liveness token between a [`YieldNow`] future and the wake callable
/// it submitted.
///
/// The future owns the only strong reference; the callable captures a weak
/// one. Dropping the future therefore collapses the token, and a callable
/// that executes afterwards observes the dead weak reference and skips the
/// resumption instead of waking a task that no longer exists.
struct YieldToken {
    state: Mutex<TokenState>,
}

struct TokenState {
    woken: bool,
    waker: Option<Waker>,
}

/// Future returned by [`yield_now`].
pub struct YieldNow<E> {
    exec: E,
    token: Option<Arc<YieldToken>>,
}

// No field is ever pinned; the future moves freely between polls.
impl<E> Unpin for YieldNow<E> {}

impl<E: Executor> Future for YieldNow<E> {
    type Output = ();

    /// Polls the yield future.
    ///
    /// The first poll suspends unconditionally: it parks the task's waker in
    /// a fresh liveness token and submits a single wake callable to the
    /// target context. Later polls complete once that callable has run.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match &this.token {
            None => {
                let token = Arc::new(YieldToken {
                    state: Mutex::new(TokenState {
                        woken: false,
                        waker: Some(cx.waker().clone()),
                    }),
                });
                let weak: Weak<YieldToken> = Arc::downgrade(&token);
                this.token = Some(token);

                this.exec.execute(move || {
                    let Some(token) = weak.upgrade() else {
                        log::trace!("yield: task dropped before resumption, skipping");
                        return;
                    };
                    let waker = {
                        let mut state = token.state.lock().unwrap();
                        state.woken = true;
                        state.waker.take()
                    };
                    if let Some(waker) = waker {
                        waker.wake();
                    }
                });

                Poll::Pending
            }
            Some(token) => {
                let mut state = token.state.lock().unwrap();
                if state.woken {
                    Poll::Ready(())
                } else {
                    state.waker = Some(cx.waker().clone());
                    Poll::Pending
                }
            }
        }
    }
}

/// Yields the current task to `exec`.
///
/// Awaiting the returned future suspends the task unconditionally and
/// submits its resumption to `exec`; the task continues when the context
/// executes that submission. Yielding to the context the task is already
/// running on gives other ready submissions a chance to run first; yielding
/// to a different context hops the task over to it.
///
/// Dropping the future between submission and execution is safe: the
/// submitted callable holds only a weak liveness token and skips the
/// resumption when the future is gone.
///
/// # Examples
///
/// ```rust,ignore
/// async fn nice_task(exec: ManualExecutor) {
///     // Let everything already queued on `exec` run.
///     yield_now(exec).await;
/// }
/// ```
pub fn yield_now<E: Executor>(exec: E) -> YieldNow<E> {
    YieldNow { exec, token: None }
}
