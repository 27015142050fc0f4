use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::AccessError;
use crate::object::{HostObject, ObjectRef};
use crate::value::{HostValue, PropertyDescriptor};

/// Getter body of an accessor property.
pub type Getter = Rc<dyn Fn() -> Result<HostValue, AccessError>>;

#[derive(Clone)]
enum SlotKind {
    Data { value: HostValue, writable: bool },
    Accessor { getter: Option<Getter>, has_setter: bool },
}

#[derive(Clone)]
struct Slot {
    kind: SlotKind,
    enumerable: bool,
    configurable: bool,
    /// Unlisted slots are readable but absent from `own_property_names`.
    listed: bool,
}

/// In-memory host object.
///
/// Own properties keep insertion order. Interior mutability lets a surface be
/// wired up after its objects are shared, including cycles (`a.self = a`).
/// Objects built this way are never freed while a cycle exists, which is fine
/// for the short-lived surfaces this type is meant for.
pub struct MemObject {
    class_name: String,
    callable: bool,
    proto: RefCell<Option<ObjectRef>>,
    slots: RefCell<IndexMap<String, Slot>>,
    descriptor_faults: RefCell<HashSet<String>>,
}

impl MemObject {
    /// Create a new plain object with no delegation parent.
    pub fn new(class_name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self::build(class_name.into(), false))
    }

    /// Create a new callable object.
    pub fn function(class_name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self::build(class_name.into(), true))
    }

    fn build(class_name: String, callable: bool) -> Self {
        Self {
            class_name,
            callable,
            proto: RefCell::new(None),
            slots: RefCell::new(IndexMap::new()),
            descriptor_faults: RefCell::new(HashSet::new()),
        }
    }

    /// Set the delegation parent.
    pub fn set_prototype(&self, proto: Option<ObjectRef>) {
        *self.proto.borrow_mut() = proto;
    }

    /// Define a writable, enumerable, configurable data property.
    pub fn set(&self, name: impl Into<String>, value: impl Into<HostValue>) {
        self.insert(
            name.into(),
            Slot {
                kind: SlotKind::Data {
                    value: value.into(),
                    writable: true,
                },
                enumerable: true,
                configurable: true,
                listed: true,
            },
        );
    }

    /// Define a data property holding another object.
    pub fn set_object<T: HostObject + 'static>(&self, name: impl Into<String>, value: Rc<T>) {
        self.set(name, HostValue::object(value));
    }

    /// Define a read-only, non-enumerable data property.
    pub fn define_constant(&self, name: impl Into<String>, value: impl Into<HostValue>) {
        self.insert(
            name.into(),
            Slot {
                kind: SlotKind::Data {
                    value: value.into(),
                    writable: false,
                },
                enumerable: false,
                configurable: false,
                listed: true,
            },
        );
    }

    /// Define an accessor property with the given getter and no setter.
    pub fn define_getter<F>(&self, name: impl Into<String>, getter: F)
    where
        F: Fn() -> Result<HostValue, AccessError> + 'static,
    {
        self.insert(
            name.into(),
            Slot {
                kind: SlotKind::Accessor {
                    getter: Some(Rc::new(getter)),
                    has_setter: false,
                },
                enumerable: true,
                configurable: true,
                listed: true,
            },
        );
    }

    /// Define an accessor property whose getter always throws.
    pub fn define_throwing(&self, name: impl Into<String>, message: impl Into<String>) {
        let name = name.into();
        let message = message.into();
        let prop = name.clone();
        self.define_getter(name, move || Err(AccessError::threw(prop.clone(), message.clone())));
    }

    /// Define a data property that is readable but not listed by
    /// [`HostObject::own_property_names`].
    pub fn define_hidden(&self, name: impl Into<String>, value: impl Into<HostValue>) {
        self.insert(
            name.into(),
            Slot {
                kind: SlotKind::Data {
                    value: value.into(),
                    writable: true,
                },
                enumerable: false,
                configurable: true,
                listed: false,
            },
        );
    }

    /// Define an unlisted accessor whose getter throws.
    pub fn define_hidden_throwing(&self, name: impl Into<String>, message: impl Into<String>) {
        let name = name.into();
        self.define_throwing(name.clone(), message);
        if let Some(slot) = self.slots.borrow_mut().get_mut(&name) {
            slot.listed = false;
        }
    }

    /// Make descriptor reads for `name` fail.
    pub fn fail_descriptor(&self, name: impl Into<String>) {
        self.descriptor_faults.borrow_mut().insert(name.into());
    }

    /// Remove an own property. Returns `true` if it existed.
    pub fn delete(&self, name: &str) -> bool {
        self.slots.borrow_mut().shift_remove(name).is_some()
    }

    fn insert(&self, name: String, slot: Slot) {
        self.slots.borrow_mut().insert(name, slot);
    }

    fn read_slot(&self, name: &str) -> Option<Result<HostValue, AccessError>> {
        // Clone the slot so a getter can re-enter this object.
        let slot = self.slots.borrow().get(name).cloned()?;
        Some(match slot.kind {
            SlotKind::Data { value, .. } => Ok(value),
            SlotKind::Accessor { getter: Some(getter), .. } => getter(),
            SlotKind::Accessor { getter: None, .. } => Ok(HostValue::Undefined),
        })
    }
}

impl HostObject for MemObject {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn is_callable(&self) -> bool {
        self.callable
    }

    fn own_property_names(&self) -> Vec<String> {
        self.slots
            .borrow()
            .iter()
            .filter(|(_, slot)| slot.listed)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn get(&self, name: &str) -> Result<HostValue, AccessError> {
        if let Some(result) = self.read_slot(name) {
            return result;
        }
        let proto = self.proto.borrow().clone();
        match proto {
            Some(parent) => parent.get(name),
            None => Ok(HostValue::Undefined),
        }
    }

    fn own_property_descriptor(
        &self,
        name: &str,
    ) -> Result<Option<PropertyDescriptor>, AccessError> {
        if self.descriptor_faults.borrow().contains(name) {
            return Err(AccessError::Inaccessible(format!(
                "descriptor for {name:?} on {}",
                self.class_name
            )));
        }
        let slots = self.slots.borrow();
        let Some(slot) = slots.get(name) else {
            return Ok(None);
        };
        let desc = match &slot.kind {
            SlotKind::Data { value, writable } => PropertyDescriptor {
                value: Some(value.clone()),
                writable: *writable,
                enumerable: slot.enumerable,
                configurable: slot.configurable,
                ..Default::default()
            },
            SlotKind::Accessor { getter, has_setter } => PropertyDescriptor {
                value: None,
                has_getter: getter.is_some(),
                has_setter: *has_setter,
                writable: false,
                enumerable: slot.enumerable,
                configurable: slot.configurable,
            },
        };
        Ok(Some(desc))
    }

    fn prototype(&self) -> Result<HostValue, AccessError> {
        Ok(match self.proto.borrow().as_ref() {
            Some(parent) => HostValue::Object(parent.clone()),
            None => HostValue::Null,
        })
    }
}

impl fmt::Debug for MemObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemObject")
            .field("class_name", &self.class_name)
            .field("callable", &self.callable)
            .field("properties", &self.slots.borrow().len())
            .finish()
    }
}
