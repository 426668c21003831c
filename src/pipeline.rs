//! Bounded fan-out over a batch of independent jobs.
//!
//! `parallelism` workers share one queue. Each takes the next unclaimed item,
//! runs it and keeps going until the queue is empty. The first failure cancels
//! the batch: no worker claims another item afterwards, in-flight work is
//! dropped at its next await point, and that failure is what the batch returns.
//!
//! Workers are plain futures polled together on the caller's task, so the work
//! itself doesn't have to be `Send` (scraped documents aren't).

use std::{
    collections::VecDeque,
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
};

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs `work` for every item with at most `parallelism` in flight at once.
/// Output order is unspecified.
pub async fn run<I, O, E, F, Fut>(items: Vec<I>, parallelism: usize, work: F) -> Result<Vec<O>, E>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    let workers = parallelism.max(1);
    log::debug!("Running {} jobs on {} workers", items.len(), workers);

    let queue = Mutex::new(VecDeque::from(items));
    let failure = Mutex::new(None);
    let cancel = CancellationToken::new();

    let (queue, failure, cancel, work) = (&queue, &failure, &cancel, &work);
    let outputs = join_all((0..workers).map(|_| async move {
        let mut outputs = Vec::new();

        while !cancel.is_cancelled() {
            let Some(item) = lock(queue).pop_front() else {
                break;
            };

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = work(item) => result,
            };

            match result {
                Ok(output) => outputs.push(output),
                Err(e) => {
                    lock(failure).get_or_insert(e);
                    cancel.cancel();
                }
            }
        }

        outputs
    }))
    .await;

    if let Some(e) = lock(failure).take() {
        return Err(e);
    }

    Ok(outputs.into_iter().flatten().collect())
}
