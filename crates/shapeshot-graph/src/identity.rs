//! Identity side table.
//!
//! Inspected objects are never tagged. Instead the graph keeps a table from
//! object address to identity, holding a [`Weak`] handle next to each entry.
//! A hit only counts if the weak handle still upgrades to the same
//! allocation, so an address reused after its object was freed is never
//! mistaken for the old object.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use shapeshot_host::{same_object, HostObject, ObjectRef};
use shapeshot_types::NodeId;

#[derive(Clone)]
struct Entry {
    object: Weak<dyn HostObject>,
    id: NodeId,
}

/// Assigns stable identities to host objects by reference.
#[derive(Clone)]
pub(crate) struct IdentityTable {
    entries: HashMap<usize, Entry>,
    next: NodeId,
}

impl IdentityTable {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next: NodeId::FIRST_OBJECT,
        }
    }

    fn address(obj: &ObjectRef) -> usize {
        Rc::as_ptr(obj) as *const () as usize
    }

    /// The identity already assigned to `obj`, if any.
    pub(crate) fn get(&self, obj: &ObjectRef) -> Option<NodeId> {
        let entry = self.entries.get(&Self::address(obj))?;
        let live = entry.object.upgrade()?;
        same_object(&live, obj).then_some(entry.id)
    }

    /// The identity of `obj`, assigning a fresh one if needed.
    ///
    /// Returns the identity and whether it was freshly assigned.
    pub(crate) fn identify(&mut self, obj: &ObjectRef) -> (NodeId, bool) {
        if let Some(id) = self.get(obj) {
            return (id, false);
        }
        let id = self.next;
        self.next = id.next();
        self.entries.insert(
            Self::address(obj),
            Entry {
                object: Rc::downgrade(obj),
                id,
            },
        );
        (id, true)
    }

    /// Drop entries whose objects have been freed.
    pub(crate) fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.object.strong_count() > 0);
        before - self.entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for IdentityTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapeshot_host::MemObject;

    #[test]
    fn same_object_keeps_its_identity() {
        let mut table = IdentityTable::new();
        let obj: ObjectRef = MemObject::new("Object");
        let (first, fresh) = table.identify(&obj);
        assert!(fresh);
        assert_eq!(first, NodeId::FIRST_OBJECT);
        let (second, fresh) = table.identify(&obj);
        assert!(!fresh);
        assert_eq!(first, second);
        assert_eq!(table.get(&obj), Some(first));
    }

    #[test]
    fn distinct_objects_get_distinct_identities() {
        let mut table = IdentityTable::new();
        let a: ObjectRef = MemObject::new("A");
        let b: ObjectRef = MemObject::new("B");
        let (ia, _) = table.identify(&a);
        let (ib, _) = table.identify(&b);
        assert_ne!(ia, ib);
        assert!(!ia.is_type() && !ib.is_type());
    }

    #[test]
    fn freed_objects_are_forgotten() {
        let mut table = IdentityTable::new();
        let obj: ObjectRef = MemObject::new("Temp");
        table.identify(&obj);
        drop(obj);
        assert_eq!(table.prune(), 1);
        assert_eq!(table.len(), 0);

        // A fresh object never inherits a stale identity.
        let again: ObjectRef = MemObject::new("Temp");
        let (id, fresh) = table.identify(&again);
        assert!(fresh);
        assert_eq!(id, NodeId::new(NodeId::FIRST_OBJECT.get() + 1));
    }
}
