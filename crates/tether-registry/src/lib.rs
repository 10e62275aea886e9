//! Host metadata and handle storage for tether.
//!
//! - [`HandleRegistry`]: the slot table behind script-visible handles.
//! - [`TypeRegistry`]: an in-memory [`MetadataProvider`](tether_core::MetadataProvider)
//!   populated through [`TypeBuilder`].
//! - [`MemoizedProvider`]: caches the lookups of any provider.

mod builder;
mod error;
mod handles;
mod memo;
mod registry;

pub use builder::{GenericConstraint, InstanceFactory, TypeBuilder, TypeEntry};
pub use error::RegistryError;
pub use handles::HandleRegistry;
pub use memo::MemoizedProvider;
pub use registry::TypeRegistry;
