use std::rc::Rc;

use crate::error::AccessError;
use crate::value::{HostValue, PropertyDescriptor};

/// Shared handle to a host object.
pub type ObjectRef = Rc<dyn HostObject>;

/// Read-only view of a host object.
///
/// Implementations must satisfy these invariants:
/// - No method mutates the object as seen by other readers.
/// - `get` resolves through the delegation chain, the way an ordinary
///   property read would; `own_property_descriptor` only looks at the object
///   itself.
/// - Any read may fail with an [`AccessError`]; callers recover locally.
pub trait HostObject {
    /// Host-specific class name (`"Object"`, `"Window"`, ...). Used by
    /// enumeration strategies to select themselves.
    fn class_name(&self) -> &str;

    /// Returns `true` if the object can be called.
    fn is_callable(&self) -> bool {
        false
    }

    /// Own property names, in the host's enumeration order.
    fn own_property_names(&self) -> Vec<String>;

    /// Read a property value.
    fn get(&self, name: &str) -> Result<HostValue, AccessError>;

    /// Read the descriptor of an own property.
    ///
    /// Returns `Ok(None)` if the object has no such own property.
    fn own_property_descriptor(
        &self,
        name: &str,
    ) -> Result<Option<PropertyDescriptor>, AccessError>;

    /// The delegation parent: an object, or [`HostValue::Null`].
    fn prototype(&self) -> Result<HostValue, AccessError>;
}

/// Reference identity of two host objects.
///
/// Compares data pointers only, so two handles to the same allocation are
/// equal regardless of which vtable they were coerced through.
pub fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}
