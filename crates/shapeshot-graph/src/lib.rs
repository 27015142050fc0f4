//! Object graph capture and queries for shapeshot.
//!
//! An [`ObjectGraph`] captures everything reachable from a root host object
//! into a compact, serializable form: every object gets a stable
//! [`NodeId`](shapeshot_types::NodeId), its own properties and their
//! attribute flags are recorded, its delegation parent is linked, and
//! primitive leaves fold into type sentinels.
//!
//! # Capture
//!
//! Visiting is two-phase. Identity assignment and storage allocation happen
//! synchronously; filling the storage is deferred as work items drained in
//! bounded batches through [`shapeshot_sched`], so a capture of a huge or
//! cyclic graph never recurses and never blocks the runtime for long.
//!
//! # Queries
//!
//! - [`ObjectGraph::lookup`] resolves a dotted path to an identity, falling
//!   back along the delegation chain for ordinary segments.
//! - [`ObjectGraph::get_keys`] reconstructs every path that resolves to an
//!   identity, shortest first, memoized until the next mutation.
//!
//! # Persistence
//!
//! [`GraphRecord`] is the transport form; [`ObjectGraph::to_json`] and
//! [`ObjectGraph::from_json`] round-trip it through JSON.

mod builder;
pub mod config;
pub mod error;
pub mod graph;
mod identity;
mod index;
pub mod query;
pub mod record;
pub mod shared;
pub mod store;

#[cfg(test)]
mod fixtures;

pub use config::{blacklist_by_default, GraphConfig};
pub use error::{GraphError, GraphResult};
pub use graph::{CaptureOptions, CaptureReport, DoneCallback, ObjectGraph};
pub use query::{join_path, split_path};
pub use record::GraphRecord;
pub use shared::SharedGraph;
pub use store::{Attributes, GraphStore, Properties};
