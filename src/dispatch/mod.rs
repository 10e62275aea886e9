//! Dispatch entry points behind the operation tables.
//!
//! Each entry point returns `Result<usize, BindError>` and runs under
//! [`guarded`](crate::protocol::guarded); none of them raises into the
//! interpreter directly.

mod assign;
mod call;
mod generic;
mod index;
mod operators;

use tether_core::{BindError, Callable, HostArray, HostType, HostValue, ScriptState, ScriptValue, TableKind};

use crate::binder::BinderInner;

/// The host side of a dispatch receiver.
pub(crate) struct Receiver {
    pub value: HostValue,
    /// The type whose members are looked up.
    pub ty: HostType,
    /// Type handles dispatch to static members.
    pub is_static: bool,
}

impl Receiver {
    /// The instance passed to host code; `None` for static access.
    pub fn instance(&self) -> Option<&HostValue> {
        (!self.is_static).then_some(&self.value)
    }

    /// Type handles of interfaces and open generic types have no members.
    fn check_type_access(&self) -> Result<(), BindError> {
        if !self.is_static {
            return Ok(());
        }
        if self.ty.is_interface() {
            return Err(BindError::UnsupportedOperation("index interface"));
        }
        if self.ty.contains_generic_parameters() {
            return Err(BindError::UnsupportedOperation("index generic type"));
        }
        Ok(())
    }
}

/// Position of `index` in a single-dimension array.
fn array_slot(array: &HostArray, index: i64) -> Result<usize, BindError> {
    if array.rank() != 1 {
        return Err(BindError::InvalidKey("index multi-dimensional array"));
    }
    usize::try_from(index)
        .ok()
        .filter(|slot| *slot < array.len())
        .ok_or(BindError::InvalidKey("index array with out-of-bounds index"))
}

impl BinderInner {
    pub(crate) fn resolve_receiver(&self, handle: &ScriptValue) -> Result<Receiver, BindError> {
        let value = self.receiver(handle)?;
        let table = handle.as_userdata().map(|userdata| userdata.table);
        Ok(match (table, &value) {
            (Some(TableKind::Type), HostValue::Type(ty)) => Receiver {
                ty: ty.clone(),
                is_static: true,
                value,
            },
            _ => Receiver {
                ty: value.host_type().unwrap_or_else(HostType::object),
                is_static: false,
                value,
            },
        })
    }

    /// Push what a call produced: the return value unless void, then the
    /// final value of every by-reference argument in declaration order.
    pub(crate) fn push_results(
        &self,
        state: &mut dyn ScriptState,
        callable: &Callable,
        result: HostValue,
        arguments: Vec<HostValue>,
    ) -> usize {
        let mut count = 0;
        if !callable.returns_void() {
            let value = self.to_script(state, result);
            state.push(value);
            count += 1;
        }
        for (param, argument) in callable.params().iter().zip(arguments) {
            if param.is_by_ref() {
                let value = self.to_script(state, argument);
                state.push(value);
                count += 1;
            }
        }
        count
    }

    pub(crate) fn push_value(&self, state: &mut dyn ScriptState, value: HostValue) -> usize {
        let value = self.to_script(state, value);
        state.push(value);
        1
    }
}
