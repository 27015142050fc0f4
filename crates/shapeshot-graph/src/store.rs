//! The captured maps of a graph.
//!
//! [`GraphStore`] is plain data: no live objects, no caches. It is what a
//! capture writes into, what removals edit, and what serialization projects.
//!
//! # Invariants
//!
//! - Every object identity used as a value in `data`, `protos` or `functions`
//!   is a key of `data`, or was removed together with the entries pointing at
//!   it.
//! - `data` and `metadata` have the same key set.
//! - `protos[id]` is written at most once per capture.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, error, warn};

use shapeshot_types::{NodeId, PropertyMeta};

use crate::error::{GraphError, GraphResult};

/// Storage key → value, for one object.
pub type Properties = BTreeMap<String, NodeId>;

/// Storage key → attribute flags, for one object.
pub type Attributes = BTreeMap<String, PropertyMeta>;

/// The captured maps of one graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphStore {
    pub(crate) data: BTreeMap<NodeId, Properties>,
    pub(crate) metadata: BTreeMap<NodeId, Attributes>,
    pub(crate) protos: BTreeMap<NodeId, NodeId>,
    pub(crate) functions: Vec<NodeId>,
    function_set: HashSet<NodeId>,
    /// Storage key → original name, for names the rewriter changed.
    pub(crate) key_names: BTreeMap<String, String>,
}

impl GraphStore {
    /// Rebuild a store from its persisted maps.
    pub(crate) fn from_parts(
        data: BTreeMap<NodeId, Properties>,
        metadata: BTreeMap<NodeId, Attributes>,
        protos: BTreeMap<NodeId, NodeId>,
        functions: Vec<NodeId>,
        key_names: BTreeMap<String, String>,
    ) -> Self {
        let function_set = functions.iter().copied().collect();
        Self {
            data,
            metadata,
            protos,
            functions,
            function_set,
            key_names,
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.data.contains_key(&id)
    }

    pub(crate) fn is_function(&self, id: NodeId) -> bool {
        self.function_set.contains(&id)
    }

    // ---------------------------------------------------------------
    // Capture-time writes
    // ---------------------------------------------------------------

    /// Allocate empty property and attribute maps for a new identity.
    pub(crate) fn allocate(&mut self, id: NodeId) -> GraphResult<()> {
        if self.data.contains_key(&id) || self.metadata.contains_key(&id) {
            error!(node = %id, "identity collision: storage already allocated");
            return Err(GraphError::DuplicateStorage(id));
        }
        self.data.insert(id, Properties::new());
        self.metadata.insert(id, Attributes::new());
        Ok(())
    }

    pub(crate) fn mark_function(&mut self, id: NodeId) {
        if self.function_set.insert(id) {
            self.functions.push(id);
        }
    }

    pub(crate) fn set_property(&mut self, id: NodeId, key: String, value: NodeId) {
        match self.data.get_mut(&id) {
            Some(props) => {
                props.insert(key, value);
            }
            None => warn!(node = %id, key = %key, "property write for unallocated node"),
        }
    }

    pub(crate) fn set_attributes(&mut self, id: NodeId, key: String, meta: PropertyMeta) {
        if let Some(attrs) = self.metadata.get_mut(&id) {
            attrs.insert(key, meta);
        }
    }

    /// Drop the attribute flags recorded for `key` on `id`.
    pub(crate) fn clear_attributes(&mut self, id: NodeId, key: &str) {
        if let Some(attrs) = self.metadata.get_mut(&id) {
            attrs.remove(key);
        }
    }

    /// Record the delegation parent of `id`, unless one is already recorded.
    pub(crate) fn set_proto(&mut self, id: NodeId, parent: NodeId) {
        if let Some(existing) = self.protos.get(&id) {
            warn!(node = %id, %existing, ignored = %parent, "delegation parent already recorded");
            return;
        }
        self.protos.insert(id, parent);
    }

    pub(crate) fn record_key_name(&mut self, key: &str, name: &str) {
        if key != name && !self.key_names.contains_key(key) {
            self.key_names.insert(key.to_string(), name.to_string());
        }
    }

    // ---------------------------------------------------------------
    // Removal
    // ---------------------------------------------------------------

    /// Excise the given identities.
    ///
    /// Removes their own entries from every map, the property entries of other
    /// objects that point at them, and delegation links to them. Returns the
    /// number of identities that were actually present.
    pub(crate) fn remove_ids(&mut self, ids: &BTreeSet<NodeId>) -> usize {
        let mut removed = 0;
        for id in ids {
            if self.data.remove(id).is_some() {
                removed += 1;
            }
            self.metadata.remove(id);
            self.protos.remove(id);
        }

        for (owner, props) in self.data.iter_mut() {
            let dangling: Vec<String> = props
                .iter()
                .filter(|(_, value)| ids.contains(value))
                .map(|(key, _)| key.clone())
                .collect();
            for key in dangling {
                props.remove(&key);
                if let Some(attrs) = self.metadata.get_mut(owner) {
                    attrs.remove(&key);
                }
            }
        }
        self.protos.retain(|_, parent| !ids.contains(parent));

        self.functions.retain(|id| !ids.contains(id));
        self.function_set.retain(|id| !ids.contains(id));

        debug!(requested = ids.len(), removed, "removed identities");
        removed
    }

    /// Delete a primitive-valued property entry.
    ///
    /// Fails if the entry is missing or holds an object reference.
    pub(crate) fn remove_primitive(&mut self, id: NodeId, key: &str) -> GraphResult<()> {
        let props = self.data.get_mut(&id).ok_or_else(|| GraphError::MissingEntry {
            id,
            key: key.to_string(),
        })?;
        let value = *props.get(key).ok_or_else(|| GraphError::MissingEntry {
            id,
            key: key.to_string(),
        })?;
        if !value.is_type() {
            error!(node = %id, key, %value, "refusing to remove an object reference as a primitive");
            return Err(GraphError::NotPrimitive {
                id,
                key: key.to_string(),
                value,
            });
        }
        props.remove(key);
        if let Some(attrs) = self.metadata.get_mut(&id) {
            attrs.remove(key);
        }
        Ok(())
    }
}
