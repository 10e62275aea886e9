//! Binds host objects and types into an embedded dynamic script runtime.
//!
//! An [`ObjectBinder`] installs two operation tables into a [`ScriptState`]:
//! one for boxed host objects and one for boxed host types. Script code then
//! reads and writes members, calls methods and constructors, applies
//! operators and closes generic types and methods, all resolved against a
//! [`MetadataProvider`].
//!
//! Every dispatch entry point reports failure through a flag instead of
//! raising, and a router installed inside the interpreter turns the flag into
//! a script error. Host failures therefore never unwind through interpreter
//! frames.
//!
//! [`ScriptState`]: tether_core::ScriptState
//! [`MetadataProvider`]: tether_core::MetadataProvider

mod binder;
pub mod coerce;
mod dispatch;
mod options;
pub mod overload;
mod protocol;
mod proxy;

pub use binder::ObjectBinder;
pub use coerce::{SignatureMatch, coerce_signature, coerce_value};
pub use options::BinderOptions;
pub use overload::{Resolution, resolve_best};
pub use proxy::{EventProxy, IndexedPropertyProxy};

pub mod prelude {
    pub use crate::{BinderOptions, ObjectBinder, coerce_signature, coerce_value, resolve_best};
    pub use tether_core::{
        BindError, Callable, Delegate, EventInfo, FieldInfo, HostObject, HostType, HostValue,
        Member, MetadataProvider, Param, PrimitiveKind, PropertyInfo, ScriptError, ScriptState,
        ScriptValue, TypeInfo,
    };
    pub use tether_registry::{TypeBuilder, TypeRegistry};
    pub use tether_vm::Vm;
}
