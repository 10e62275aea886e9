//! Primitive host type kinds.

use std::fmt;

/// Primitive kinds of the host object model.
///
/// Every kind here is a value type: it cannot hold null unless wrapped in
/// a nullable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Decimal,
}

impl PrimitiveKind {
    /// All primitive kinds, in declaration order.
    pub const ALL: [PrimitiveKind; 13] = [
        PrimitiveKind::Bool,
        PrimitiveKind::Char,
        PrimitiveKind::Int8,
        PrimitiveKind::Int16,
        PrimitiveKind::Int32,
        PrimitiveKind::Int64,
        PrimitiveKind::Uint8,
        PrimitiveKind::Uint16,
        PrimitiveKind::Uint32,
        PrimitiveKind::Uint64,
        PrimitiveKind::Float32,
        PrimitiveKind::Float64,
        PrimitiveKind::Decimal,
    ];

    /// Get the name of this primitive type.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int8 => "sbyte",
            PrimitiveKind::Int16 => "short",
            PrimitiveKind::Int32 => "int",
            PrimitiveKind::Int64 => "long",
            PrimitiveKind::Uint8 => "byte",
            PrimitiveKind::Uint16 => "ushort",
            PrimitiveKind::Uint32 => "uint",
            PrimitiveKind::Uint64 => "ulong",
            PrimitiveKind::Float32 => "float",
            PrimitiveKind::Float64 => "double",
            PrimitiveKind::Decimal => "decimal",
        }
    }

    /// Whether this is one of the fixed-width integer kinds.
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Int8
                | PrimitiveKind::Int16
                | PrimitiveKind::Int32
                | PrimitiveKind::Int64
                | PrimitiveKind::Uint8
                | PrimitiveKind::Uint16
                | PrimitiveKind::Uint32
                | PrimitiveKind::Uint64
        )
    }

    /// Whether this is a binary floating point kind.
    pub const fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Float32 | PrimitiveKind::Float64)
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
