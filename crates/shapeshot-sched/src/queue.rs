use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Configuration for a [`TaskQueue`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of items executed per [`TaskQueue::flush`].
    pub batch_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { batch_size: 1000 }
    }
}

/// Outcome of one [`TaskQueue::flush`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flush {
    /// Items remain; another flush is needed.
    Pending {
        /// Items still queued.
        remaining: usize,
    },
    /// The batch left the queue empty.
    Done,
}

/// FIFO queue of deferred work items, drained in bounded batches.
///
/// Items are plain data; the caller supplies the function that executes them
/// at flush time. That function receives the queue itself, so executing one
/// item may enqueue more.
#[derive(Debug)]
pub struct TaskQueue<T> {
    items: VecDeque<T>,
    batch_size: usize,
    batches: u64,
    executed: u64,
}

impl<T> TaskQueue<T> {
    /// Create an empty queue.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            items: VecDeque::new(),
            batch_size: config.batch_size.max(1),
            batches: 0,
            executed: 0,
        }
    }

    /// Append a work item.
    pub fn enqueue(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Returns `true` if no work is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Effective batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Batches flushed so far.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Items executed so far.
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// Drop every queued item without running it.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Execute up to `batch_size` items in FIFO order.
    ///
    /// Stops at the first failing item and returns its error; the failed item
    /// is consumed, the rest stay queued.
    pub fn flush<E, F>(&mut self, mut run: F) -> Result<Flush, E>
    where
        F: FnMut(T, &mut Self) -> Result<(), E>,
    {
        self.batches += 1;
        let mut budget = self.batch_size;
        while budget > 0 {
            let Some(item) = self.items.pop_front() else {
                break;
            };
            budget -= 1;
            self.executed += 1;
            run(item, self)?;
        }

        if self.items.is_empty() {
            Ok(Flush::Done)
        } else {
            Ok(Flush::Pending {
                remaining: self.items.len(),
            })
        }
    }
}

impl<T> Extend<T> for TaskQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}
