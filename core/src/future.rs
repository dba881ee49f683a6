//! Bridge from [`Deferred`] to `async`/`.await`.
//!
//! Awaiting a deferred value does not drive its scheduler. The scheduler has
//! to keep turning somewhere else (a `LocalScheduler` on the same
//! `LocalSet`, or a test loop calling `run_ready`).

use crate::deferred::Deferred;
use crate::error::DeferredError;
use crate::{Payload, Reason};
use std::cell::Cell;
use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Future returned by `deferred.await`.
///
/// Resolves with `Ok(value)` or `Err(reason)`. If every handle to a pending
/// deferred value is dropped, the future resolves with
/// [`DeferredError::Abandoned`] converted into `E`.
pub struct Settled<T, E> {
    receiver: oneshot::Receiver<Result<T, E>>,
    _local: PhantomData<Rc<()>>,
}

impl<T, E: From<DeferredError>> Future for Settled<T, E> {
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(E::from(DeferredError::Abandoned))),
        }
    }
}

impl<T: Payload, E: Reason> IntoFuture for Deferred<T, E> {
    type Output = Result<T, E>;
    type IntoFuture = Settled<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        let (sender, receiver) = oneshot::channel();
        let sender = Rc::new(Cell::new(Some(sender)));
        let on_reason = Rc::clone(&sender);

        self.subscribe(
            Box::new(move |value| {
                if let Some(sender) = sender.take() {
                    let _ = sender.send(Ok(value));
                }
            }),
            Box::new(move |reason| {
                if let Some(sender) = on_reason.take() {
                    let _ = sender.send(Err(reason));
                }
            }),
        );

        Settled {
            receiver,
            _local: PhantomData,
        }
    }
}
