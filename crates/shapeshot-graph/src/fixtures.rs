//! Graph builders shared by the unit tests.

use std::rc::Rc;

use proptest::prelude::*;
use shapeshot_host::{HostValue, MemObject};

use crate::graph::{CaptureOptions, ObjectGraph};

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

/// Capture `root` under `key` with the default configuration.
pub(crate) fn capture(root: Rc<MemObject>, key: &str) -> ObjectGraph {
    let mut graph = ObjectGraph::new();
    graph
        .capture_blocking(&HostValue::object(root), CaptureOptions::with_key(key))
        .unwrap();
    graph
}

/// Build `size` objects wired by `edges` (from, to, name) and `protos`
/// (child, parent), rooted at object 0.
pub(crate) fn build(
    size: usize,
    edges: &[(usize, usize, usize)],
    protos: &[(usize, usize)],
) -> Rc<MemObject> {
    let objects: Vec<Rc<MemObject>> = (0..size)
        .map(|i| MemObject::new(format!("O{i}")))
        .collect();
    for &(from, to, name) in edges {
        let target = objects[to % size].clone();
        objects[from % size].set_object(NAMES[name % NAMES.len()], target);
    }
    for &(child, parent) in protos {
        let (child, parent) = (child % size, parent % size);
        // Delegation chains only point at higher indices, so they stay acyclic.
        if parent > child {
            objects[child].set_prototype(Some(objects[parent].clone()));
        }
    }
    objects[0].set("leaf", 0.5);
    objects[0].define_throwing("hostile", "denied");
    objects[0].clone()
}

/// Random captured graphs of up to eight objects, keyed `"g"`.
pub(crate) fn arb_graph() -> impl Strategy<Value = ObjectGraph> {
    (
        1usize..8,
        prop::collection::vec((0usize..8, 0usize..8, 0usize..4), 0..20),
        prop::collection::vec((0usize..8, 0usize..8), 0..6),
    )
        .prop_map(|(size, edges, protos)| capture(build(size, &edges, &protos), "g"))
}
