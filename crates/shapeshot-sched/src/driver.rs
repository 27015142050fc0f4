//! Drain drivers for [`TaskQueue`].

use tracing::trace;

use crate::queue::{Flush, TaskQueue};

/// Progress notification passed to the tick callback before each batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchTick {
    /// 1-based index of the batch about to run.
    pub batch: u64,
    /// Items queued when the batch starts.
    pub pending: usize,
}

/// Summary of a completed drain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Batches flushed by this drain.
    pub batches: u64,
    /// Items executed by this drain.
    pub executed: u64,
}

/// Drain `queue` to completion, yielding to the tokio runtime between
/// batches.
///
/// `tick` runs before every batch. The returned future resolves once a batch
/// leaves the queue empty, including work enqueued by earlier items. The
/// first failing item aborts the drain; queued items are discarded.
pub async fn drain<T, E, F, K>(
    queue: &mut TaskQueue<T>,
    mut run: F,
    mut tick: K,
) -> Result<DrainReport, E>
where
    F: FnMut(T, &mut TaskQueue<T>) -> Result<(), E>,
    K: FnMut(BatchTick),
{
    let start = (queue.batches(), queue.executed());
    let mut batch = 0;
    loop {
        batch += 1;
        tick(BatchTick {
            batch,
            pending: queue.len(),
        });
        match queue.flush(&mut run) {
            Ok(Flush::Done) => break,
            Ok(Flush::Pending { remaining }) => {
                trace!(batch, remaining, "yielding between batches");
                tokio::task::yield_now().await;
            }
            Err(e) => {
                queue.clear();
                return Err(e);
            }
        }
    }
    Ok(report(queue, start))
}

/// Drain `queue` to completion on the current call stack, without yielding.
pub fn drain_blocking<T, E, F, K>(
    queue: &mut TaskQueue<T>,
    mut run: F,
    mut tick: K,
) -> Result<DrainReport, E>
where
    F: FnMut(T, &mut TaskQueue<T>) -> Result<(), E>,
    K: FnMut(BatchTick),
{
    let start = (queue.batches(), queue.executed());
    let mut batch = 0;
    loop {
        batch += 1;
        tick(BatchTick {
            batch,
            pending: queue.len(),
        });
        match queue.flush(&mut run) {
            Ok(Flush::Done) => break,
            Ok(Flush::Pending { .. }) => {}
            Err(e) => {
                queue.clear();
                return Err(e);
            }
        }
    }
    Ok(report(queue, start))
}

fn report<T>(queue: &TaskQueue<T>, (batches, executed): (u64, u64)) -> DrainReport {
    DrainReport {
        batches: queue.batches() - batches,
        executed: queue.executed() - executed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueConfig;
    use std::cell::RefCell;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[tokio::test]
    async fn drain_runs_everything_and_reports() {
        let mut q = TaskQueue::new(QueueConfig { batch_size: 3 });
        q.extend(0..10u32);
        let mut seen = Vec::new();
        let mut ticks = Vec::new();
        let report = drain(
            &mut q,
            |item, _| {
                seen.push(item);
                Ok::<_, Infallible>(())
            },
            |t| ticks.push(t),
        )
        .await
        .unwrap();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(report, DrainReport { batches: 4, executed: 10 });
        assert_eq!(ticks.len(), 4);
        assert_eq!(ticks[0], BatchTick { batch: 1, pending: 10 });
        assert_eq!(ticks[3], BatchTick { batch: 4, pending: 1 });
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn drain_yields_to_other_tasks() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut q = TaskQueue::new(QueueConfig { batch_size: 1 });
        q.extend(["a", "b"]);

        let capture_log = log.clone();
        let capture = async {
            drain(
                &mut q,
                |item, _| {
                    capture_log.borrow_mut().push(item);
                    Ok::<_, Infallible>(())
                },
                |_| {},
            )
            .await
            .unwrap()
        };
        let other_log = log.clone();
        let other = async move {
            other_log.borrow_mut().push("other");
        };
        tokio::join!(capture, other);

        // The second batch only runs after the drain yielded once.
        assert_eq!(*log.borrow(), vec!["a", "other", "b"]);
    }

    #[tokio::test]
    async fn drain_propagates_failure_and_clears() {
        let mut q = TaskQueue::new(QueueConfig { batch_size: 2 });
        q.extend([1u32, 2, 3, 4]);
        let result = drain(
            &mut q,
            |item, _| if item == 3 { Err(item) } else { Ok(()) },
            |_| {},
        )
        .await;
        assert_eq!(result, Err(3));
        assert!(q.is_empty());
    }

    #[test]
    fn blocking_drain_counts_only_its_own_work() {
        let mut q = TaskQueue::new(QueueConfig { batch_size: 2 });
        q.extend([1u32, 2, 3]);
        drain_blocking(&mut q, |_, _| Ok::<_, Infallible>(()), |_| {}).unwrap();
        q.enqueue(4);
        let report = drain_blocking(&mut q, |_, _| Ok::<_, Infallible>(()), |_| {}).unwrap();
        assert_eq!(report, DrainReport { batches: 1, executed: 1 });
    }

    #[test]
    fn blocking_drain_on_empty_queue_is_one_batch() {
        let mut q: TaskQueue<u32> = TaskQueue::default();
        let report = drain_blocking(&mut q, |_, _| Ok::<_, Infallible>(()), |_| {}).unwrap();
        assert_eq!(report, DrainReport { batches: 1, executed: 0 });
    }
}
