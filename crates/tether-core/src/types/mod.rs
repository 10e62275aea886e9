//! Host type descriptors.

mod host_type;
mod primitive_kind;

pub use host_type::{HostType, TypeFlags, TypeInfo, TypeKind};
pub use primitive_kind::PrimitiveKind;
