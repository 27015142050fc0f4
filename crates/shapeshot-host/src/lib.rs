//! Host object model for shapeshot.
//!
//! The capture engine never touches a concrete runtime. Everything it needs
//! from the inspected world goes through the read-only [`HostObject`] trait:
//! listing own property names, reading values and descriptors, and following
//! the delegation parent. This crate also carries the collaborators the
//! engine consumes at their interface: property-name enumeration strategies,
//! the storage-key rewriter, and the environment descriptor used for
//! provenance metadata.
//!
//! [`MemObject`] is a complete in-memory host, used by tests, the CLI demo and
//! embedders that build object surfaces by hand.

pub mod environment;
pub mod error;
pub mod memory;
pub mod object;
pub mod rewrite;
pub mod strategy;
pub mod value;

pub use environment::{describe_environment, PlatformInfo};
pub use error::AccessError;
pub use memory::{Getter, MemObject};
pub use object::{same_object, HostObject, ObjectRef};
pub use rewrite::{EscapingRewriter, NameRewriter, PROTO_SEGMENT};
pub use strategy::{EnumerationStrategy, OwnPropertyNames, VendorAliasStrategy};
pub use value::{HostValue, PropertyDescriptor};
