//! `__index`: member reads, array element reads and indexed properties.

use std::rc::Rc;

use tracing::trace;

use tether_core::{BindError, HostValue, Member, ScriptState, ScriptValue, StackIndex, TableKind};

use super::{Receiver, array_slot};
use crate::binder::BinderInner;
use crate::coerce::coerce_signature;
use crate::proxy::IndexedPropertyProxy;

impl BinderInner {
    /// Read `handle[key]`.
    ///
    /// With `report_cacheable` the value is preceded by whether it may be
    /// cached for this (target, key) pair.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn index(
        self: &Rc<Self>,
        state: &mut dyn ScriptState,
        kind: TableKind,
        report_cacheable: bool,
    ) -> Result<usize, BindError> {
        let handle = state.get(StackIndex::Slot(1));
        let key = state.get(StackIndex::Slot(2));
        let receiver = self.resolve_receiver(&handle)?;
        trace!(?kind, ?key, ty = %receiver.ty, "index");

        let (cacheable, value) = match receiver.value.downcast_ref::<IndexedPropertyProxy>() {
            Some(proxy) if !receiver.is_static => (false, self.index_property(state, proxy, &key)?),
            _ => {
                receiver.check_type_access()?;
                self.index_member(state, &handle, &receiver, &key)?
            }
        };

        if report_cacheable {
            state.push(ScriptValue::Boolean(cacheable));
            state.push(value);
            Ok(2)
        } else {
            state.push(value);
            Ok(1)
        }
    }

    fn index_member(
        self: &Rc<Self>,
        state: &mut dyn ScriptState,
        handle: &ScriptValue,
        receiver: &Receiver,
        key: &ScriptValue,
    ) -> Result<(bool, ScriptValue), BindError> {
        match (key, &receiver.value) {
            (ScriptValue::String(name), _) => self.index_named(state, handle, receiver, name),
            (ScriptValue::Integer(index), HostValue::Array(array)) if !receiver.is_static => {
                let slot = array_slot(array, *index)?;
                let item = array.get(slot).unwrap_or_default();
                Ok((false, self.to_script(state, item)))
            }
            _ => Err(BindError::InvalidKey("index with invalid key")),
        }
    }

    fn index_named(
        self: &Rc<Self>,
        state: &mut dyn ScriptState,
        handle: &ScriptValue,
        receiver: &Receiver,
        name: &str,
    ) -> Result<(bool, ScriptValue), BindError> {
        let member = self
            .provider(&receiver.ty)
            .member(&receiver.ty, name, receiver.is_static)
            .ok_or(BindError::InvalidMember("index"))?;
        trace!(member = name, kind = member.kind_name(), "index member");

        let instance = receiver.instance();
        Ok(match member {
            Member::Event(event) => {
                let proxy = self.proxies.event_object(instance, event);
                (true, self.to_script(state, proxy))
            }
            Member::Field(field) => {
                let value = field.get(instance);
                (field.is_constant, self.to_script(state, value))
            }
            Member::Method(_) => (true, self.method_proxy(state, handle.clone(), name, Vec::new())?),
            Member::Property(property) => {
                let getter = property
                    .getter
                    .as_ref()
                    .ok_or(BindError::UnsupportedOperation("get property without getter"))?;
                let value = getter
                    .invoke(instance, &mut [])
                    .map_err(|e| BindError::host("get property", e))?;
                (false, self.to_script(state, value))
            }
            Member::IndexedProperty(property) => {
                let proxy = self.proxies.indexed_object(instance, property);
                (true, self.to_script(state, proxy))
            }
            Member::NestedType(ty) => (true, self.to_script(state, HostValue::Type(ty))),
        })
    }

    /// `proxy[key]` on an indexed property: the key goes to the getter's index parameters.
    fn index_property(
        &self,
        state: &mut dyn ScriptState,
        proxy: &IndexedPropertyProxy,
        key: &ScriptValue,
    ) -> Result<ScriptValue, BindError> {
        let getter = proxy
            .property()
            .getter
            .as_ref()
            .ok_or(BindError::UnsupportedOperation("get property without getter"))?;
        let bound = coerce_signature(&[self.to_host(key)], getter.params())
            .ok_or(BindError::InvalidKey("index indexed property with invalid key"))?;
        let mut arguments = bound.arguments;
        let value = getter
            .invoke(proxy.target(), &mut arguments)
            .map_err(|e| BindError::host("get indexed property", e))?;
        Ok(self.to_script(state, value))
    }
}
