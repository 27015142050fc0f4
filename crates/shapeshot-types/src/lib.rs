//! Foundation types for shapeshot.
//!
//! This crate provides the identity and attribute types shared by every other
//! shapeshot crate. It has no knowledge of live host objects; it only
//! describes the integers and flags a captured graph is made of.
//!
//! # Key Types
//!
//! - [`NodeId`]: Graph identity of a captured object, or a primitive sentinel
//! - [`PrimitiveType`]: The seven leaf categories folded into sentinels
//! - [`PropertyMeta`]: Attribute flags of one property, persisted as 0/1

pub mod error;
pub mod meta;
pub mod node;

pub use error::TypeError;
pub use meta::PropertyMeta;
pub use node::{type_table, NodeId, PrimitiveType};
