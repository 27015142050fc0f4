//! A graph handle shared between tasks on one thread.

use std::rc::Rc;

use tokio::sync::{Mutex, MutexGuard};

use shapeshot_host::HostValue;

use crate::error::GraphResult;
use crate::graph::{CaptureOptions, CaptureReport, ObjectGraph};

/// Shared handle to an [`ObjectGraph`].
///
/// Captures started through the handle run one at a time, in the order they
/// were requested: a capture issued while another is in flight waits for it
/// to finish instead of interleaving with it. [`read`](Self::read) waits the
/// same way, so a reader always sees a completed capture.
#[derive(Clone, Default)]
pub struct SharedGraph {
    inner: Rc<Mutex<ObjectGraph>>,
}

impl SharedGraph {
    pub fn new(graph: ObjectGraph) -> Self {
        Self {
            inner: Rc::new(Mutex::new(graph)),
        }
    }

    /// Capture `root` once every earlier capture has completed.
    pub async fn capture(
        &self,
        root: &HostValue,
        options: CaptureOptions,
    ) -> GraphResult<CaptureReport> {
        let mut graph = self.inner.lock().await;
        graph.capture(root, options).await
    }

    /// Wait for in-flight captures and borrow the graph.
    pub async fn read(&self) -> MutexGuard<'_, ObjectGraph> {
        self.inner.lock().await
    }
}
