//! Cooperative task scheduling for shapeshot.
//!
//! Capturing a large object graph is split into many small work items. A
//! [`TaskQueue`] runs them in FIFO order, a bounded batch at a time; the
//! [`drain`] driver hands control back to the tokio runtime between batches so
//! a capture never starves other work on the same thread.
//!
//! Guarantees relied on by the capture engine:
//! - Work items execute in enqueue order.
//! - Work enqueued while an item runs extends the same drain cycle.
//! - A drain completes exactly once, after a batch leaves the queue empty.

pub mod driver;
pub mod queue;

pub use driver::{drain, drain_blocking, BatchTick, DrainReport};
pub use queue::{Flush, QueueConfig, TaskQueue};
