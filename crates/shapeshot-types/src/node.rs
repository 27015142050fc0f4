use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identity of a node in a captured graph.
///
/// A `NodeId` is either a primitive-type sentinel (the reserved range
/// `1..=7`, see [`PrimitiveType`]) or the identity of a captured object
/// (`>= NodeId::FIRST_OBJECT`). Property values, delegation links and the
/// capture root are all stored as `NodeId`s, so a single integer space covers
/// both leaves and objects.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// The first identity handed out to an object.
    pub const FIRST_OBJECT: NodeId = NodeId(8);

    /// Wrap a raw integer.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns `true` if this id is a primitive-type sentinel.
    pub fn is_type(self) -> bool {
        self.primitive_type().is_some()
    }

    /// The primitive category this sentinel stands for, if any.
    pub fn primitive_type(self) -> Option<PrimitiveType> {
        PrimitiveType::ALL
            .iter()
            .copied()
            .find(|ty| ty.sentinel() == self)
    }

    /// The identity following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.primitive_type() {
            Some(ty) => write!(f, "NodeId({}:{})", self.0, ty.name()),
            None => write!(f, "NodeId({})", self.0),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| TypeError::InvalidNodeId(s.to_string()))
    }
}

impl From<PrimitiveType> for NodeId {
    fn from(ty: PrimitiveType) -> Self {
        ty.sentinel()
    }
}

/// Category of a non-object leaf value.
///
/// Leaves are never stored individually; every leaf of a given category is
/// represented by the same sentinel [`NodeId`]. `Exception` stands for a
/// property whose read failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Undefined,
    Boolean,
    Number,
    String,
    Symbol,
    Null,
    Exception,
}

impl PrimitiveType {
    /// Every category, in sentinel order.
    pub const ALL: [PrimitiveType; 7] = [
        PrimitiveType::Undefined,
        PrimitiveType::Boolean,
        PrimitiveType::Number,
        PrimitiveType::String,
        PrimitiveType::Symbol,
        PrimitiveType::Null,
        PrimitiveType::Exception,
    ];

    /// The sentinel id standing in for this category.
    pub const fn sentinel(self) -> NodeId {
        NodeId(match self {
            PrimitiveType::Undefined => 1,
            PrimitiveType::Boolean => 2,
            PrimitiveType::Number => 3,
            PrimitiveType::String => 4,
            PrimitiveType::Symbol => 5,
            PrimitiveType::Null => 6,
            PrimitiveType::Exception => 7,
        })
    }

    /// Lowercase name, as used in the persisted type table.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveType::Undefined => "undefined",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Number => "number",
            PrimitiveType::String => "string",
            PrimitiveType::Symbol => "symbol",
            PrimitiveType::Null => "null",
            PrimitiveType::Exception => "exception",
        }
    }

    /// Parse a lowercase category name.
    pub fn from_name(name: &str) -> Result<Self, TypeError> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.name() == name)
            .ok_or_else(|| TypeError::UnknownType(name.to_string()))
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The name → sentinel table persisted alongside every graph.
pub fn type_table() -> BTreeMap<String, NodeId> {
    PrimitiveType::ALL
        .iter()
        .map(|ty| (ty.name().to_string(), ty.sentinel()))
        .collect()
}
