use std::fmt;
use std::rc::Rc;

use shapeshot_types::{PrimitiveType, PropertyMeta};

use crate::object::{same_object, HostObject, ObjectRef};

/// A value read from a host object.
#[derive(Clone)]
pub enum HostValue {
    Undefined,
    Boolean(bool),
    Number(f64),
    String(String),
    Symbol(String),
    Null,
    Object(ObjectRef),
}

impl HostValue {
    /// The leaf category of this value, or `None` for objects.
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self {
            HostValue::Undefined => Some(PrimitiveType::Undefined),
            HostValue::Boolean(_) => Some(PrimitiveType::Boolean),
            HostValue::Number(_) => Some(PrimitiveType::Number),
            HostValue::String(_) => Some(PrimitiveType::String),
            HostValue::Symbol(_) => Some(PrimitiveType::Symbol),
            HostValue::Null => Some(PrimitiveType::Null),
            HostValue::Object(_) => None,
        }
    }

    /// The referenced object, if this value is one.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            HostValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Returns `true` for `undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, HostValue::Undefined)
    }

    /// Wrap any host object.
    pub fn object<T: HostObject + 'static>(obj: Rc<T>) -> Self {
        HostValue::Object(obj)
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Undefined, HostValue::Undefined) | (HostValue::Null, HostValue::Null) => {
                true
            }
            (HostValue::Boolean(a), HostValue::Boolean(b)) => a == b,
            (HostValue::Number(a), HostValue::Number(b)) => a == b,
            (HostValue::String(a), HostValue::String(b)) => a == b,
            (HostValue::Symbol(a), HostValue::Symbol(b)) => a == b,
            (HostValue::Object(a), HostValue::Object(b)) => same_object(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Undefined => f.write_str("undefined"),
            HostValue::Boolean(b) => write!(f, "{b}"),
            HostValue::Number(n) => write!(f, "{n}"),
            HostValue::String(s) => write!(f, "{s:?}"),
            HostValue::Symbol(s) => write!(f, "Symbol({s})"),
            HostValue::Null => f.write_str("null"),
            HostValue::Object(obj) => write!(f, "[object {}]", obj.class_name()),
        }
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Boolean(b)
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        HostValue::Number(n)
    }
}

impl From<i32> for HostValue {
    fn from(n: i32) -> Self {
        HostValue::Number(f64::from(n))
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::String(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::String(s)
    }
}

impl From<ObjectRef> for HostValue {
    fn from(obj: ObjectRef) -> Self {
        HostValue::Object(obj)
    }
}

/// Own property descriptor as reported by a host object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyDescriptor {
    /// Present for data properties.
    pub value: Option<HostValue>,
    /// Whether an accessor property has a getter.
    pub has_getter: bool,
    /// Whether an accessor property has a setter.
    pub has_setter: bool,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl From<&PropertyDescriptor> for PropertyMeta {
    fn from(desc: &PropertyDescriptor) -> Self {
        PropertyMeta {
            writable: desc.writable,
            enumerable: desc.enumerable,
            configurable: desc.configurable,
            value: desc.value.is_some(),
            get: desc.has_getter,
            set: desc.has_setter,
        }
    }
}
