//! `__newindex`: member writes, array element writes and indexed properties.

use tracing::trace;

use tether_core::{BindError, HostValue, Member, ScriptState, ScriptValue, StackIndex};

use super::{Receiver, array_slot};
use crate::binder::BinderInner;
use crate::coerce::{coerce_signature, coerce_value};
use crate::proxy::IndexedPropertyProxy;

impl BinderInner {
    /// Write `handle[key] = value`. Nothing is mutated unless the value
    /// coerces to the declared type.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn assign(&self, state: &mut dyn ScriptState) -> Result<usize, BindError> {
        let handle = state.get(StackIndex::Slot(1));
        let key = state.get(StackIndex::Slot(2));
        let value = self.to_host(&state.get(StackIndex::Slot(3)));
        let receiver = self.resolve_receiver(&handle)?;
        trace!(?key, ty = %receiver.ty, "assign");

        if !receiver.is_static
            && let Some(proxy) = receiver.value.downcast_ref::<IndexedPropertyProxy>()
        {
            self.assign_property(proxy, &key, value)?;
            return Ok(0);
        }
        receiver.check_type_access()?;

        match (&key, &receiver.value) {
            (ScriptValue::String(name), _) => self.assign_named(&receiver, name, value)?,
            (ScriptValue::Integer(index), HostValue::Array(array)) if !receiver.is_static => {
                let slot = array_slot(array, *index)?;
                let value = coerce_value(&value, array.element_type())
                    .ok_or(BindError::InvalidArgs("set array with invalid value"))?;
                array.set(slot, value);
            }
            _ => return Err(BindError::InvalidKey("index with invalid key")),
        }
        Ok(0)
    }

    fn assign_named(&self, receiver: &Receiver, name: &str, value: HostValue) -> Result<(), BindError> {
        let member = self
            .provider(&receiver.ty)
            .member(&receiver.ty, name, receiver.is_static)
            .ok_or(BindError::InvalidMember("set"))?;
        trace!(member = name, kind = member.kind_name(), "assign member");

        let instance = receiver.instance();
        match member {
            Member::Event(_) => Err(BindError::UnsupportedOperation("set event")),
            Member::Method(_) => Err(BindError::UnsupportedOperation("set method")),
            Member::NestedType(_) => Err(BindError::UnsupportedOperation("set nested type")),
            Member::IndexedProperty(_) => Err(BindError::UnsupportedOperation("set indexed property")),
            Member::Field(field) => {
                if field.is_constant {
                    return Err(BindError::UnsupportedOperation("set constant field"));
                }
                let value = coerce_value(&value, &field.ty)
                    .ok_or(BindError::InvalidArgs("set field with invalid value"))?;
                field
                    .set(instance, value)
                    .map_err(|e| BindError::host("set field", e))
            }
            Member::Property(property) => {
                let setter = property
                    .setter
                    .as_ref()
                    .ok_or(BindError::UnsupportedOperation("set property without setter"))?;
                let value = coerce_value(&value, &property.ty)
                    .ok_or(BindError::InvalidArgs("set property with invalid value"))?;
                setter
                    .invoke(instance, &mut [value])
                    .map(drop)
                    .map_err(|e| BindError::host("set property", e))
            }
        }
    }

    /// `proxy[key] = value` on an indexed property: key then value go to the setter.
    fn assign_property(
        &self,
        proxy: &IndexedPropertyProxy,
        key: &ScriptValue,
        value: HostValue,
    ) -> Result<(), BindError> {
        let setter = proxy
            .property()
            .setter
            .as_ref()
            .ok_or(BindError::UnsupportedOperation("set property without setter"))?;
        let bound = coerce_signature(&[self.to_host(key), value], setter.params())
            .ok_or(BindError::InvalidArgs("set indexed property with invalid value"))?;
        let mut arguments = bound.arguments;
        setter
            .invoke(proxy.target(), &mut arguments)
            .map(drop)
            .map_err(|e| BindError::host("set indexed property", e))
    }
}
