//! Forward and reverse path queries.
//!
//! A path is a dot-separated list of segments starting at the capture root's
//! key. Each segment is either a storage key or [`PROTO_SEGMENT`], which
//! moves to the delegation parent. Storage keys never contain a dot and are
//! never equal to [`PROTO_SEGMENT`], because the name rewriter escapes both.
//!
//! Reverse reconstruction ([`ObjectGraph::get_keys`]) walks referrers from
//! the target back towards the root without recursion. The seen set holds
//! exactly the identities on the current walk, so every simple path from the
//! root is produced once and cycles terminate.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use shapeshot_host::PROTO_SEGMENT;
use shapeshot_types::{NodeId, PrimitiveType, PropertyMeta};

use crate::graph::ObjectGraph;
use crate::index::DerivedIndices;

/// Append `segment` to `prefix`, treating an empty prefix as the root.
pub fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

/// Split a relative path into segments. The empty path has none.
pub fn split_path(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    }
}

/// Order paths by length, then lexicographically.
fn sort_paths(paths: &mut Vec<String>) {
    paths.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    paths.dedup();
}

/// One pending identity in a reverse reconstruction.
struct Frame<'a> {
    id: NodeId,
    /// Objects referring to this identity, each with the segments leading
    /// from it to this identity.
    referrers: Vec<(NodeId, Vec<&'a str>)>,
    next: usize,
    /// Segments leading from this identity to the frame below it.
    segments: Vec<&'a str>,
    paths: Vec<String>,
}

impl<'a> Frame<'a> {
    fn new(id: NodeId, segments: Vec<&'a str>, indices: &'a DerivedIndices) -> Self {
        let mut by_referrer: BTreeMap<NodeId, Vec<&'a str>> = BTreeMap::new();
        if let Some(referrers) = indices.referrers.get(&id) {
            for (&referrer, keys) in referrers {
                by_referrer
                    .entry(referrer)
                    .or_default()
                    .extend(keys.iter().map(String::as_str));
            }
        }
        if let Some(heirs) = indices.heirs.get(&id) {
            for &heir in heirs {
                by_referrer.entry(heir).or_default().push(PROTO_SEGMENT);
            }
        }
        Self {
            id,
            referrers: by_referrer.into_iter().collect(),
            next: 0,
            segments,
            paths: Vec::new(),
        }
    }
}

impl ObjectGraph {
    // ---------------------------------------------------------------
    // Types and functions
    // ---------------------------------------------------------------

    /// Returns `true` if `id` is a primitive-type sentinel.
    pub fn is_type(&self, id: NodeId) -> bool {
        id.is_type()
    }

    /// The primitive category `id` stands for, if it is a sentinel.
    pub fn get_type(&self, id: NodeId) -> Option<PrimitiveType> {
        id.primitive_type()
    }

    /// Returns `true` if `id` was captured as a callable object.
    pub fn is_function(&self, id: NodeId) -> bool {
        self.store.is_function(id)
    }

    /// Callable identities, in discovery order.
    pub fn get_functions(&self) -> &[NodeId] {
        &self.store.functions
    }

    // ---------------------------------------------------------------
    // Listings
    // ---------------------------------------------------------------

    /// Every stored identity, ascending.
    pub fn get_all_ids(&self) -> Vec<NodeId> {
        self.store.data.keys().copied().collect()
    }

    /// Sorted storage keys of `id`. Empty if `id` is not stored.
    pub fn get_object_keys(&self, id: NodeId) -> Vec<String> {
        self.get_object_keys_filtered(id, |_, _| true)
    }

    /// Sorted storage keys of `id` whose entry satisfies `predicate`.
    pub fn get_object_keys_filtered<P>(&self, id: NodeId, predicate: P) -> Vec<String>
    where
        P: Fn(&str, NodeId) -> bool,
    {
        self.store
            .data
            .get(&id)
            .map(|props| {
                props
                    .iter()
                    .filter(|(key, value)| predicate(key, **value))
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Objects that own a property stored under `key`, ascending.
    pub fn get_holders(&self, key: &str) -> Vec<NodeId> {
        self.indices()
            .holders
            .get(key)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The value stored under `key` on `id`.
    pub fn get_property(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.store.data.get(&id)?.get(key).copied()
    }

    /// Attribute flags captured for `key` on `id`.
    pub fn get_metadata(&self, id: NodeId, key: &str) -> Option<&PropertyMeta> {
        self.store.metadata.get(&id)?.get(key)
    }

    /// The delegation parent recorded for `id`.
    pub fn get_prototype(&self, id: NodeId) -> Option<NodeId> {
        self.store.protos.get(&id).copied()
    }

    /// The property name a storage key was rewritten from.
    pub fn original_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.store
            .key_names
            .get(key)
            .map(String::as_str)
            .unwrap_or(key)
    }

    // ---------------------------------------------------------------
    // Reverse paths
    // ---------------------------------------------------------------

    /// Every path that [`lookup`](Self::lookup) resolves to `id`, shortest
    /// first.
    ///
    /// The root's only path is the capture key. Identities unreachable from
    /// the root have no paths. Results are cached until the graph is next
    /// mutated.
    pub fn get_keys(&self, id: NodeId) -> Vec<String> {
        if let Some(hit) = self.keys_cache.borrow().get(&id) {
            return hit.clone();
        }
        let mut paths = self.reconstruct(id);
        sort_paths(&mut paths);
        self.keys_cache.borrow_mut().insert(id, paths.clone());
        paths
    }

    /// The first of [`get_keys`](Self::get_keys): shortest, then least.
    pub fn get_shortest_key(&self, id: NodeId) -> Option<String> {
        self.get_keys(id).into_iter().next()
    }

    /// Paths of every stored identity.
    pub fn get_all_keys(&self) -> BTreeMap<NodeId, Vec<String>> {
        self.store
            .data
            .keys()
            .map(|&id| (id, self.get_keys(id)))
            .collect()
    }

    /// Every distinct path in the graph, with the identity it resolves to.
    pub fn get_all_keys_map(&self) -> BTreeMap<String, NodeId> {
        let mut map = BTreeMap::new();
        for (id, paths) in self.get_all_keys() {
            for path in paths {
                map.insert(path, id);
            }
        }
        map
    }

    fn reconstruct(&self, target: NodeId) -> Vec<String> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        if target == root {
            return vec![self.key.clone()];
        }

        let indices = self.indices();
        let mut seen = HashSet::from([target]);
        let mut stack = vec![Frame::new(target, Vec::new(), indices)];
        let mut expanded = 1usize;

        loop {
            let Some(frame) = stack.last_mut() else {
                return Vec::new();
            };
            if let Some((referrer, segments)) = frame.referrers.get(frame.next) {
                let referrer = *referrer;
                frame.next += 1;
                if referrer == root {
                    let base = &self.key;
                    let found: Vec<String> =
                        segments.iter().map(|s| join_path(base, s)).collect();
                    frame.paths.extend(found);
                } else if seen.insert(referrer) {
                    let segments = segments.clone();
                    expanded += 1;
                    stack.push(Frame::new(referrer, segments, indices));
                }
                continue;
            }

            let Some(done) = stack.pop() else {
                return Vec::new();
            };
            // Other branches may pass through this identity again.
            seen.remove(&done.id);
            let Some(below) = stack.last_mut() else {
                debug!(node = %target, expanded, paths = done.paths.len(), "reconstructed paths");
                return done.paths;
            };
            for path in &done.paths {
                for segment in &done.segments {
                    below.paths.push(join_path(path, segment));
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Forward lookup
    // ---------------------------------------------------------------

    /// Resolve `path` to an identity or sentinel.
    ///
    /// Without `root`, the path is absolute: it must start with the capture
    /// key (unless that is empty). With `root`, the path is relative to it.
    /// Ordinary segments fall back along the delegation chain when the
    /// current object lacks the property. Returns `None` on a miss.
    pub fn lookup(&self, path: &str, root: Option<NodeId>) -> Option<NodeId> {
        let (start, relative) = match root {
            Some(start) => (start, path),
            None => (self.root?, self.strip_key(path)?),
        };

        let mut current = start;
        for segment in split_path(relative) {
            if current.is_type() {
                return None;
            }
            current = if segment == PROTO_SEGMENT {
                self.get_prototype(current)?
            } else {
                self.resolve_member(current, segment)?
            };
        }
        Some(current)
    }

    fn strip_key<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.key.is_empty() {
            return Some(path);
        }
        let rest = path.strip_prefix(self.key.as_str())?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('.')
        }
    }

    /// Find `key` on `id` or the nearest delegation ancestor that owns it.
    fn resolve_member(&self, id: NodeId, key: &str) -> Option<NodeId> {
        let mut current = id;
        let mut walked = HashSet::new();
        loop {
            if current.is_type() {
                return None;
            }
            if !walked.insert(current) {
                warn!(node = %id, key, "delegation chain loops; treating as a miss");
                return None;
            }
            let Some(props) = self.store.data.get(&current) else {
                warn!(node = %current, key, "lookup reached an identity with no storage");
                return None;
            };
            if let Some(&value) = props.get(key) {
                return Some(value);
            }
            current = self.get_prototype(current)?;
        }
    }
}
