//! Shape diff for shapeshot graphs.
//!
//! Two captures of "the same" surface taken in different environments share
//! no identities, so they are compared by path instead. A [`Surface`] maps
//! every path of a graph to the [`Shape`] found there; [`diff_graphs`]
//! compares two surfaces.
//!
//! # Key Types
//!
//! - [`Surface`] / [`Shape`] / [`SurfaceMode`] -- Path-to-shape projection of one graph
//! - [`ShapeDiff`] / [`ShapeChange`] -- Added, removed and changed paths

pub mod shape_diff;
pub mod surface;

pub use shape_diff::{diff_graphs, diff_surfaces, ShapeChange, ShapeDiff};
pub use surface::{Shape, Surface, SurfaceMode};
