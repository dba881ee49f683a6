//! Deferred values that settle on the virtual clock of a [`TaskQueue`].

use pledge_core::{Deferred, Payload, Reason};
use pledge_runtime::TaskQueue;

/// Fulfils with `value` once `queue` has advanced `ticks`.
pub fn delayed<T: Payload, E: Reason>(queue: &TaskQueue, ticks: u64, value: T) -> Deferred<T, E> {
    let (deferred, resolve, _) = Deferred::channel(&queue.handle());
    queue.schedule_after(ticks, move || resolve.fulfill(value));
    deferred
}

/// Rejects with `reason` once `queue` has advanced `ticks`.
pub fn delayed_reject<T: Payload, E: Reason>(
    queue: &TaskQueue,
    ticks: u64,
    reason: E,
) -> Deferred<T, E> {
    let (deferred, _, reject) = Deferred::channel(&queue.handle());
    queue.schedule_after(ticks, move || reject.reject(reason));
    deferred
}
