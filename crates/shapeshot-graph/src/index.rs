//! Inverse indices derived from a [`GraphStore`].
//!
//! None of these are persisted. They are computed on first query after a
//! capture, removal or load, and thrown away on the next mutation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use shapeshot_types::NodeId;

use crate::store::GraphStore;

/// Reverse views over the forward maps of a store.
#[derive(Clone, Debug, Default)]
pub(crate) struct DerivedIndices {
    /// Value identity → referrer → storage keys the referrer holds it under.
    pub(crate) referrers: HashMap<NodeId, BTreeMap<NodeId, Vec<String>>>,
    /// Delegation parent → objects that delegate to it.
    pub(crate) heirs: HashMap<NodeId, BTreeSet<NodeId>>,
    /// Storage key → objects that own a property under it.
    pub(crate) holders: BTreeMap<String, BTreeSet<NodeId>>,
}

impl DerivedIndices {
    pub(crate) fn build(store: &GraphStore) -> Self {
        let mut indices = Self::default();

        for (&owner, props) in &store.data {
            for (key, &value) in props {
                indices
                    .holders
                    .entry(key.clone())
                    .or_default()
                    .insert(owner);
                if value.is_type() {
                    continue;
                }
                indices
                    .referrers
                    .entry(value)
                    .or_default()
                    .entry(owner)
                    .or_default()
                    .push(key.clone());
            }
        }

        for (&child, &parent) in &store.protos {
            if !parent.is_type() {
                indices.heirs.entry(parent).or_default().insert(child);
            }
        }

        debug!(
            referenced = indices.referrers.len(),
            delegated_to = indices.heirs.len(),
            names = indices.holders.len(),
            "rebuilt derived indices"
        );
        indices
    }
}
