//! The visit algorithm.
//!
//! A visit is two-phase. Assigning an identity and allocating its storage
//! happens synchronously, so the identity can be handed back and stored by
//! the caller at once. Filling the storage is deferred: the visit enqueues
//! [`VisitTask`]s that the scheduler runs later, each writing into the slot
//! allocated for its object.
//!
//! Per object the deferred work is:
//! 1. [`VisitTask::Prototype`]: visit the delegation parent and record the link.
//! 2. [`VisitTask::Members`]: list and filter property names, record attribute
//!    metadata, then enqueue one [`VisitTask::Property`] per name.
//! 3. [`VisitTask::Property`]: read the value, visit it, record the result.

use std::fmt;

use tracing::{debug, warn};

use shapeshot_host::{HostValue, ObjectRef};
use shapeshot_sched::TaskQueue;
use shapeshot_types::{NodeId, PrimitiveType, PropertyMeta};

use crate::config::{Enumerators, GraphConfig};
use crate::error::GraphResult;
use crate::identity::IdentityTable;
use crate::store::GraphStore;

/// A deferred unit of capture work.
pub(crate) enum VisitTask {
    Prototype { id: NodeId, object: ObjectRef },
    Members { id: NodeId, object: ObjectRef },
    Property { id: NodeId, object: ObjectRef, name: String },
}

impl fmt::Debug for VisitTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitTask::Prototype { id, .. } => write!(f, "Prototype({id})"),
            VisitTask::Members { id, .. } => write!(f, "Members({id})"),
            VisitTask::Property { id, name, .. } => write!(f, "Property({id}, {name:?})"),
        }
    }
}

/// Mutable view of a graph while a capture runs.
pub(crate) struct Builder<'g> {
    pub(crate) store: &'g mut GraphStore,
    pub(crate) identities: &'g mut IdentityTable,
    pub(crate) config: &'g GraphConfig,
    pub(crate) enumerators: &'g Enumerators,
}

impl Builder<'_> {
    /// Return the identity or sentinel for `value`, scheduling a visit of
    /// everything reachable from it if it is a new object.
    pub(crate) fn visit(
        &mut self,
        value: &HostValue,
        queue: &mut TaskQueue<VisitTask>,
    ) -> GraphResult<NodeId> {
        let object = match value {
            HostValue::Object(object) => object,
            leaf => {
                let ty = leaf.primitive_type().unwrap_or(PrimitiveType::Undefined);
                return Ok(ty.sentinel());
            }
        };

        let (id, _) = self.identities.identify(object);
        if self.store.contains(id) {
            return Ok(id);
        }

        self.store.allocate(id)?;
        if object.is_callable() {
            self.store.mark_function(id);
        }

        queue.enqueue(VisitTask::Prototype {
            id,
            object: object.clone(),
        });
        queue.enqueue(VisitTask::Members {
            id,
            object: object.clone(),
        });
        Ok(id)
    }

    /// Execute one deferred task.
    pub(crate) fn run(
        &mut self,
        task: VisitTask,
        queue: &mut TaskQueue<VisitTask>,
    ) -> GraphResult<()> {
        match task {
            VisitTask::Prototype { id, object } => {
                let parent = object.prototype().unwrap_or_else(|e| {
                    warn!(node = %id, error = %e, "delegation parent unreadable; recording null");
                    HostValue::Null
                });
                if let HostValue::Object(parent) = &parent {
                    if self.config.is_blacklisted_object(parent) {
                        debug!(node = %id, "delegation parent is blacklisted; link not recorded");
                        return Ok(());
                    }
                }
                let parent = self.visit(&parent, queue)?;
                self.store.set_proto(id, parent);
            }
            VisitTask::Members { id, object } => {
                let names = self.member_names(id, &object);
                for name in &names {
                    self.capture_attributes(id, &object, name);
                }
                queue.extend(names.into_iter().map(|name| VisitTask::Property {
                    id,
                    object: object.clone(),
                    name,
                }));
            }
            VisitTask::Property { id, object, name } => {
                let key = self.config.rewriter.rewrite(&name).into_owned();
                let value = match object.get(&name) {
                    // The value may have changed since the member listing.
                    Ok(HostValue::Object(value)) if self.config.is_blacklisted_object(&value) => {
                        debug!(node = %id, name = %name, "member now holds a blacklisted object; skipping");
                        self.store.clear_attributes(id, &key);
                        return Ok(());
                    }
                    Ok(value) => self.visit(&value, queue)?,
                    Err(e) => {
                        debug!(node = %id, name = %name, error = %e, "property read threw");
                        PrimitiveType::Exception.sentinel()
                    }
                };
                self.store.record_key_name(&key, &name);
                self.store.set_property(id, key, value);
            }
        }
        Ok(())
    }

    /// Names to capture on `object`, with blacklisted keys and properties that
    /// hold blacklisted objects filtered out.
    fn member_names(&self, id: NodeId, object: &ObjectRef) -> Vec<String> {
        let strategy = self.enumerators.select(&**object);
        let names = strategy.property_names(&**object);
        let total = names.len();
        let kept: Vec<String> = names
            .into_iter()
            .filter(|name| !self.is_blacklisted_property(object, name))
            .collect();
        debug!(
            node = %id,
            class = object.class_name(),
            strategy = strategy.name(),
            total,
            kept = kept.len(),
            "enumerated members"
        );
        kept
    }

    fn is_blacklisted_property(&self, object: &ObjectRef, name: &str) -> bool {
        if self.config.is_blacklisted_key(name) {
            return true;
        }
        if self.config.blacklisted_objects.is_empty() {
            return false;
        }
        match object.get(name) {
            Ok(HostValue::Object(value)) => self.config.is_blacklisted_object(&value),
            // A failed read is not evidence of a blacklisted value.
            Ok(_) | Err(_) => false,
        }
    }

    fn capture_attributes(&mut self, id: NodeId, object: &ObjectRef, name: &str) {
        match object.own_property_descriptor(name) {
            Ok(Some(desc)) => {
                let key = self.config.rewriter.rewrite(name).into_owned();
                self.store.set_attributes(id, key, PropertyMeta::from(&desc));
            }
            Ok(None) => {
                warn!(node = %id, name, "no own descriptor; skipping metadata");
            }
            Err(e) => {
                warn!(node = %id, name, error = %e, "descriptor read failed; skipping metadata");
            }
        }
    }
}
