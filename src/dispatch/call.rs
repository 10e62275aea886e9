//! `__call`: delegates, constructors and bound method proxies.

use std::rc::Rc;

use tracing::trace;

use tether_core::{
    BindError, DelegateBody, HostValue, Operation, ScriptState, ScriptValue, StackIndex,
};

use crate::binder::{BinderInner, guarded_native};
use crate::coerce::coerce_signature;
use crate::overload::resolve_best;

impl BinderInner {
    /// Call a boxed delegate with the remaining arguments.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn call_object(&self, state: &mut dyn ScriptState, argc: usize) -> Result<usize, BindError> {
        let receiver = self.receiver(&state.get(StackIndex::Slot(1)))?;
        let HostValue::Delegate(delegate) = receiver else {
            return Err(BindError::UnsupportedOperation("call non-delegate"));
        };
        trace!(delegate = %delegate.ty, args = argc.saturating_sub(1), "call delegate");

        match &delegate.body {
            DelegateBody::Host { callable, target } => {
                let values = self.host_args(state, 2, argc);
                let bound = coerce_signature(&values, callable.params())
                    .ok_or(BindError::InvalidArgs("call delegate with invalid args"))?;
                let mut arguments = bound.arguments;
                let result = callable
                    .invoke(target.as_ref(), &mut arguments)
                    .map_err(|e| BindError::host("call delegate", e))?;
                Ok(self.push_results(state, callable, result, arguments))
            }
            DelegateBody::Script(function) => {
                let args = (2..=argc).map(|slot| state.get(StackIndex::Slot(slot))).collect();
                let results = state
                    .call(function, args)
                    .map_err(|e| BindError::host("call delegate", e.into()))?;
                let count = results.len();
                for value in results {
                    state.push(value);
                }
                Ok(count)
            }
        }
    }

    /// Call a type handle: close a generic definition over type arguments,
    /// or construct an instance.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn call_type(&self, state: &mut dyn ScriptState, argc: usize) -> Result<usize, BindError> {
        let receiver = self.resolve_receiver(&state.get(StackIndex::Slot(1)))?;
        let ty = receiver.ty;
        let values = self.host_args(state, 2, argc);
        trace!(ty = %ty, args = values.len(), "call type");

        if ty.contains_generic_parameters() {
            let instance = self.construct_generic_type(&ty, &values)?;
            return Ok(self.push_value(state, HostValue::Type(instance)));
        }

        if ty.is_abstract() {
            return Err(BindError::UnsupportedOperation("instantiate abstract type"));
        }
        let constructors = self.provider(&ty).constructors(&ty);
        if constructors.is_empty() {
            return Err(BindError::UnsupportedOperation("instantiate type with no constructors"));
        }
        let resolution = resolve_best(&values, &constructors)
            .ok_or(BindError::InvalidArgs("instantiate type with invalid args"))?;
        let mut arguments = resolution.arguments;
        let instance = resolution
            .callable
            .invoke(None, &mut arguments)
            .map_err(|e| BindError::host("instantiate type", e))?;
        Ok(self.push_value(state, instance))
    }

    /// A bound method proxy.
    ///
    /// Upvalues: the receiver handle, the method name, the number of type
    /// arguments, then the type arguments themselves.
    pub(crate) fn method_proxy(
        self: &Rc<Self>,
        state: &mut dyn ScriptState,
        handle: ScriptValue,
        name: &str,
        type_args: Vec<ScriptValue>,
    ) -> Result<ScriptValue, BindError> {
        let mut upvalues = Vec::with_capacity(type_args.len() + 3);
        upvalues.push(handle);
        upvalues.push(ScriptValue::string(name));
        upvalues.push(ScriptValue::Integer(type_args.len() as i64));
        upvalues.extend(type_args);

        let native = state.new_closure(
            guarded_native(self, Operation::Call, |binder, state, argc| binder.proxy_call(state, argc)),
            upvalues,
        );
        let wrapped = state
            .call(self.router(), vec![native])
            .map_err(|e| BindError::UnexpectedHostFailure(e.to_string()))?;
        Ok(wrapped.into_iter().next().unwrap_or_default())
    }

    /// Invoke a bound method proxy.
    ///
    /// Instance proxies get the receiver as their first argument; static and
    /// generic-instantiated proxies do not. When no overload accepts the
    /// arguments but generic definitions of that arity exist, the arguments
    /// are taken as type arguments and a new proxy awaiting the values is
    /// returned.
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn proxy_call(self: &Rc<Self>, state: &mut dyn ScriptState, argc: usize) -> Result<usize, BindError> {
        let handle = state.get(StackIndex::Upvalue(1));
        let name = state
            .get(StackIndex::Upvalue(2))
            .as_str()
            .map(str::to_string)
            .unwrap_or_default();
        let pending = state
            .get(StackIndex::Upvalue(3))
            .as_integer()
            .and_then(|count| usize::try_from(count).ok())
            .unwrap_or(0);

        let receiver = self.resolve_receiver(&handle)?;
        let first = if receiver.is_static || pending > 0 { 1 } else { 2 };
        let values = self.host_args(state, first, argc);
        let provider = self.provider(&receiver.ty);

        let mut candidates = provider.methods(&receiver.ty, &name, receiver.is_static, pending);
        if pending > 0 {
            let type_args: Vec<HostValue> = (0..pending)
                .map(|i| self.to_host(&state.get(StackIndex::Upvalue(4 + i))))
                .collect();
            candidates = self.instantiate_methods(&candidates, &type_args)?;
        }
        trace!(member = %name, pending, candidates = candidates.len(), args = values.len(), "call method");

        let Some(resolution) = resolve_best(&values, &candidates) else {
            if pending > 0 {
                return Err(BindError::InvalidArgs("call generic method with invalid args"));
            }
            if values.is_empty()
                || provider
                    .methods(&receiver.ty, &name, receiver.is_static, values.len())
                    .is_empty()
            {
                return Err(BindError::InvalidArgs("call method with invalid args"));
            }
            let type_args = (first..=argc).map(|slot| state.get(StackIndex::Slot(slot))).collect();
            let proxy = self.method_proxy(state, handle, &name, type_args)?;
            state.push(proxy);
            return Ok(1);
        };

        let action = if pending > 0 { "call generic method" } else { "call method" };
        let mut arguments = resolution.arguments;
        let result = resolution
            .callable
            .invoke(receiver.instance(), &mut arguments)
            .map_err(|e| BindError::host(action, e))?;
        Ok(self.push_results(state, &resolution.callable, result, arguments))
    }
}
