//! Path-to-shape projection of a captured graph.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use shapeshot_graph::{join_path, ObjectGraph};
use shapeshot_types::PrimitiveType;

/// What a path resolves to, stripped of identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "type")]
pub enum Shape {
    Object,
    Function,
    Primitive(PrimitiveType),
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Object => f.write_str("object"),
            Shape::Function => f.write_str("function"),
            Shape::Primitive(ty) => f.write_str(ty.name()),
        }
    }
}

/// Which reverse paths contribute to a surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SurfaceMode {
    /// Only each object's shortest path.
    #[default]
    Shortest,
    /// Every reconstructed path.
    AllPaths,
}

/// Every path of a graph with the shape found at it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surface {
    pub entries: BTreeMap<String, Shape>,
}

impl Surface {
    /// Project `graph` onto its paths.
    ///
    /// Object paths come from the reverse-path index; each object path is
    /// extended with the object's primitive-valued members.
    pub fn from_graph(graph: &ObjectGraph, mode: SurfaceMode) -> Self {
        let mut entries = BTreeMap::new();

        for (id, mut paths) in graph.get_all_keys() {
            if mode == SurfaceMode::Shortest {
                paths.truncate(1);
            }
            let shape = if graph.is_function(id) {
                Shape::Function
            } else {
                Shape::Object
            };
            let leaves: Vec<(String, PrimitiveType)> = graph
                .get_object_keys(id)
                .into_iter()
                .filter_map(|key| {
                    let ty = graph.get_property(id, &key)?.primitive_type()?;
                    Some((key, ty))
                })
                .collect();

            for path in paths {
                for (key, ty) in &leaves {
                    entries.insert(join_path(&path, key), Shape::Primitive(*ty));
                }
                entries.insert(path, shape);
            }
        }

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<Shape> {
        self.entries.get(path).copied()
    }
}
