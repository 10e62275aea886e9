//! Shared model for the tether host/script binding layer.
//!
//! This crate defines the vocabulary every other tether crate speaks:
//!
//! - **Host model**: [`HostType`], [`HostValue`], [`Member`], [`Callable`] and
//!   the [`MetadataProvider`] lookups the binder performs.
//! - **Script model**: [`ScriptValue`] and the [`ScriptState`] interpreter
//!   binding (stack, closures, userdata, operation tables, helper routines).
//! - **Errors**: [`BindError`] and its siblings.

pub mod error;
pub mod member;
pub mod metadata;
pub mod operator;
pub mod script_value;
pub mod state;
pub mod type_hash;
pub mod types;
pub mod value;

pub use error::{BindError, ConstraintViolation, ErrorKind, HostException, ScriptError};
pub use member::{
    Callable, CallableBuilder, CallableKind, CandidateSet, EventInfo, FieldInfo, Member, Param,
    ParamFlags, PropertyInfo,
};
pub use metadata::MetadataProvider;
pub use operator::OperatorName;
pub use rust_decimal::Decimal;
pub use script_value::{ScriptFunction, ScriptValue, TypeTag, Userdata};
pub use state::{
    HandleId, Helper, NativeFunction, Operation, OperationTable, ScriptState, StackIndex,
    TableKind,
};
pub use type_hash::TypeHash;
pub use types::{HostType, PrimitiveKind, TypeFlags, TypeInfo, TypeKind};
pub use value::{Delegate, DelegateBody, HostArray, HostObject, HostValue};
