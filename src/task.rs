//! Scheduling helpers on top of the ambient tokio runtime.

use std::future::Future;
use std::panic;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::runtime::Handle;
use tracing::warn;

use crate::observer::ObserverRegistry;

/// Spawn `task` on the current runtime, or drop it with a warning when
/// called outside of one.
pub(crate) fn spawn_detached<F>(task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
        }
        Err(_) => warn!("no tokio runtime available, background task dropped"),
    }
}

/// Whether the calling thread can spawn onto a tokio runtime.
pub(crate) fn has_runtime() -> bool {
    Handle::try_current().is_ok()
}

/// Run `task` independently of the returned future.
///
/// On a runtime the task is spawned right away and the returned future only
/// waits for it, so dropping that future does not cancel the task. Outside of
/// a runtime the task runs when the returned future is polled.
pub(crate) fn run_detached<F>(task: F) -> BoxFuture<'static, ()>
where
    F: Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            let task = handle.spawn(task);
            async move {
                if let Err(err) = task.await {
                    if err.is_panic() {
                        panic::resume_unwind(err.into_panic());
                    }
                }
            }
            .boxed()
        }
        Err(_) => task.boxed(),
    }
}

/// End notification for operations that are awaited.
pub(crate) async fn notify_after(observers: &ObserverRegistry, delay: Duration) {
    tokio::time::sleep(delay).await;
    observers.notify();
}

/// End notification for synchronous operations.
///
/// Outside of a runtime there is nothing to schedule on, so observers are
/// notified right away.
pub(crate) fn notify_later(observers: &ObserverRegistry, delay: Duration) {
    match Handle::try_current() {
        Ok(handle) => {
            let observers = observers.clone();
            handle.spawn(async move { notify_after(&observers, delay).await });
        }
        Err(_) => observers.notify(),
    }
}
