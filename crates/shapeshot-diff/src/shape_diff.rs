//! Shape-level diff: compare two surfaces path by path.

use serde::{Deserialize, Serialize};
use tracing::debug;

use shapeshot_graph::ObjectGraph;

use crate::surface::{Shape, Surface, SurfaceMode};

/// The result of comparing two surfaces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeDiff {
    /// Changes, sorted by path.
    pub changes: Vec<ShapeChange>,
}

impl ShapeDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the surfaces are identical.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Number of paths only present in the new surface.
    pub fn additions(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, ShapeChange::Added { .. }))
            .count()
    }

    /// Number of paths only present in the old surface.
    pub fn removals(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, ShapeChange::Removed { .. }))
            .count()
    }

    /// Number of paths whose shape differs.
    pub fn modifications(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, ShapeChange::Changed { .. }))
            .count()
    }
}

/// A single path-level change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "lowercase")]
pub enum ShapeChange {
    Added { path: String, shape: Shape },
    Removed { path: String, shape: Shape },
    Changed { path: String, old: Shape, new: Shape },
}

impl ShapeChange {
    pub fn path(&self) -> &str {
        match self {
            ShapeChange::Added { path, .. }
            | ShapeChange::Removed { path, .. }
            | ShapeChange::Changed { path, .. } => path,
        }
    }
}

/// Compare two surfaces.
///
/// Paths only in `new` are `Added`, paths only in `old` are `Removed`, and
/// paths in both with different shapes are `Changed`.
pub fn diff_surfaces(old: &Surface, new: &Surface) -> ShapeDiff {
    let mut changes = Vec::new();

    for (path, &old_shape) in &old.entries {
        match new.entries.get(path) {
            Some(&new_shape) if new_shape != old_shape => {
                changes.push(ShapeChange::Changed {
                    path: path.clone(),
                    old: old_shape,
                    new: new_shape,
                });
            }
            Some(_) => {}
            None => changes.push(ShapeChange::Removed {
                path: path.clone(),
                shape: old_shape,
            }),
        }
    }

    for (path, &shape) in &new.entries {
        if !old.entries.contains_key(path) {
            changes.push(ShapeChange::Added {
                path: path.clone(),
                shape,
            });
        }
    }

    changes.sort_by(|a, b| a.path().cmp(b.path()));
    ShapeDiff { changes }
}

/// Compare the surfaces of two graphs.
pub fn diff_graphs(old: &ObjectGraph, new: &ObjectGraph, mode: SurfaceMode) -> ShapeDiff {
    let old_surface = Surface::from_graph(old, mode);
    let new_surface = Surface::from_graph(new, mode);
    let diff = diff_surfaces(&old_surface, &new_surface);
    debug!(
        old_paths = old_surface.len(),
        new_paths = new_surface.len(),
        added = diff.additions(),
        removed = diff.removals(),
        changed = diff.modifications(),
        "computed shape diff"
    );
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use shapeshot_graph::CaptureOptions;
    use shapeshot_host::{HostValue, MemObject};
    use shapeshot_types::PrimitiveType;

    fn surface(pairs: &[(&str, Shape)]) -> Surface {
        Surface {
            entries: pairs
                .iter()
                .map(|(p, s)| (p.to_string(), *s))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    const NUM: Shape = Shape::Primitive(PrimitiveType::Number);
    const STR: Shape = Shape::Primitive(PrimitiveType::String);

    #[test]
    fn identical_surfaces_no_diff() {
        let s = surface(&[("a", Shape::Object), ("a.x", NUM)]);
        assert!(diff_surfaces(&s, &s).is_empty());
    }

    #[test]
    fn mixed_changes_sorted_by_path() {
        let old = surface(&[("w", Shape::Object), ("w.b", NUM), ("w.c", Shape::Object)]);
        let new = surface(&[("w", Shape::Object), ("w.a", STR), ("w.b", STR)]);
        let diff = diff_surfaces(&old, &new);

        assert_eq!(diff.len(), 3);
        assert_eq!(diff.additions(), 1);
        assert_eq!(diff.removals(), 1);
        assert_eq!(diff.modifications(), 1);
        let paths: Vec<&str> = diff.changes.iter().map(ShapeChange::path).collect();
        assert_eq!(paths, vec!["w.a", "w.b", "w.c"]);
        assert_eq!(
            diff.changes[1],
            ShapeChange::Changed {
                path: "w.b".into(),
                old: NUM,
                new: STR
            }
        );
    }

    fn capture(build: impl FnOnce(&MemObject)) -> ObjectGraph {
        let root = MemObject::new("Window");
        build(&root);
        let mut graph = ObjectGraph::new();
        graph
            .capture_blocking(&HostValue::object(root), CaptureOptions::with_key("window"))
            .unwrap();
        graph
    }

    #[test]
    fn graphs_are_compared_by_path_not_identity() {
        let old = capture(|w| {
            w.set_object("fetch", MemObject::function("Function"));
            w.set("devicePixelRatio", 1);
        });
        let new = capture(|w| {
            w.set("devicePixelRatio", 2);
            w.set_object("fetch", MemObject::function("Function"));
            w.set_object("crypto", MemObject::new("Crypto"));
        });

        let diff = diff_graphs(&old, &new, SurfaceMode::Shortest);
        assert_eq!(
            diff.changes,
            vec![ShapeChange::Added {
                path: "window.crypto".into(),
                shape: Shape::Object
            }]
        );
    }

    #[test]
    fn changes_serialize_with_a_tag() {
        let change = ShapeChange::Removed {
            path: "w.x".into(),
            shape: Shape::Function,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["change"], "removed");
        assert_eq!(json["path"], "w.x");
        assert_eq!(json["shape"]["kind"], "function");
    }
}
