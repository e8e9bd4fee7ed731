//! Element types, object kinds and semantic wrappers.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int64,
    UInt64,
    Float64,
    Bool,
    Str,
    Categorical,
}

impl DType {
    /// Signed numeric types, where negation preserves a reversed total order.
    pub fn is_signed_numeric(&self) -> bool {
        matches!(self, DType::Int64 | DType::Float64)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DType::Int64 | DType::UInt64 | DType::Float64)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Int64 => "int64",
            DType::UInt64 => "uint64",
            DType::Float64 => "float64",
            DType::Bool => "bool",
            DType::Str => "str",
            DType::Categorical => "categorical",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side layout of a single array-like object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// One numeric/bool array symbol.
    Array,
    /// One string-column symbol (with optional bytes/offsets parts).
    Strings,
    /// Codes + categories.
    Categorical,
    /// Segment starts + flattened values.
    SegArray,
}

impl ObjectKind {
    pub fn is_composite(&self) -> bool {
        matches!(self, ObjectKind::Categorical | ObjectKind::SegArray)
    }
}

/// Client-side semantic wrapper layered over a raw array.
///
/// Generic set operations only understand raw values; the wrapper is
/// re-applied afterwards by the index callback layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "semantic", rename_all = "lowercase")]
pub enum Semantic {
    #[default]
    Plain,
    /// Nanoseconds since the epoch stored as int64.
    Datetime,
    /// Nanosecond durations stored as int64.
    Timedelta,
    /// IPv4 addresses packed into integers.
    Ipv4,
    /// Packed bit flags of a fixed width.
    BitVector { width: u32, reverse: bool },
}

/// Discriminant of [`Semantic`], used as the callback registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticKind {
    Plain,
    Datetime,
    Timedelta,
    Ipv4,
    BitVector,
}

impl Semantic {
    pub fn kind(&self) -> SemanticKind {
        match self {
            Semantic::Plain => SemanticKind::Plain,
            Semantic::Datetime => SemanticKind::Datetime,
            Semantic::Timedelta => SemanticKind::Timedelta,
            Semantic::Ipv4 => SemanticKind::Ipv4,
            Semantic::BitVector { .. } => SemanticKind::BitVector,
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, Semantic::Plain)
    }
}
