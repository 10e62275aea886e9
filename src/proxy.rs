//! Builtin proxy objects handed to scripts for events and indexed properties.

use std::rc::Rc;

use tether_core::{
    Callable, CandidateSet, ConstraintViolation, Delegate, EventInfo, HostException, HostObject,
    HostType, HostValue, Member, MetadataProvider, OperatorName, Param, PropertyInfo, TypeInfo,
    TypeKind,
};

/// Subscription handle for one event on one target.
///
/// Exposes `Add(handler)` and `Remove(handler)` to scripts.
#[derive(Debug)]
pub struct EventProxy {
    pub(crate) target: Option<HostValue>,
    pub(crate) event: Rc<EventInfo>,
}

impl EventProxy {
    pub fn event(&self) -> &EventInfo {
        &self.event
    }

    fn add(&self, handler: &HostValue) -> Result<HostValue, HostException> {
        let HostValue::Callback(function) = handler else {
            return Err(HostException::new("attempt to add nil to event"));
        };
        if !matches!(self.event.handler_type.kind(), TypeKind::Delegate) {
            return Err(HostException::new("attempt to add to non-EventHandler event"));
        }
        let delegate = HostValue::from(Delegate::script(
            self.event.handler_type.clone(),
            function.clone(),
        ));
        self.event
            .add
            .invoke(self.target.as_ref(), &mut [delegate.clone()])
            .map_err(|e| HostException::new(format!("attempt to add to event threw:\n{e}")))?;
        Ok(delegate)
    }

    fn remove(&self, handler: &HostValue) -> Result<(), HostException> {
        if handler.is_null() {
            return Err(HostException::new("attempt to remove nil from event"));
        }
        self.event
            .remove
            .invoke(self.target.as_ref(), &mut [handler.clone()])
            .map_err(|e| HostException::new(format!("attempt to remove from event threw:\n{e}")))?;
        Ok(())
    }
}

/// An indexed property bound to its target; scripts index it with the key.
#[derive(Debug)]
pub struct IndexedPropertyProxy {
    pub(crate) target: Option<HostValue>,
    pub(crate) property: Rc<PropertyInfo>,
}

impl IndexedPropertyProxy {
    pub fn property(&self) -> &PropertyInfo {
        &self.property
    }

    pub(crate) fn target(&self) -> Option<&HostValue> {
        self.target.as_ref()
    }
}

/// Host types of the proxy objects and the metadata scripts see on them.
pub(crate) struct ProxyTypes {
    pub(crate) event: HostType,
    pub(crate) indexed: HostType,
    add: Callable,
    remove: Callable,
}

fn event_proxy(this: Option<&HostValue>) -> Result<&EventProxy, HostException> {
    this.and_then(|value| value.downcast_ref::<EventProxy>())
        .ok_or_else(|| HostException::new("expected an event proxy"))
}

impl ProxyTypes {
    pub(crate) fn new() -> Self {
        let add = Callable::method(
            "Add",
            vec![Param::new("handler", HostType::script_function())],
            HostType::object(),
            |this, args| event_proxy(this)?.add(&args[0]),
        );
        let remove = Callable::method(
            "Remove",
            vec![Param::new("handler", HostType::object())],
            HostType::void(),
            |this, args| {
                event_proxy(this)?.remove(&args[0])?;
                Ok(HostValue::Null)
            },
        );
        Self {
            event: TypeInfo::class("EventProxy").build(),
            indexed: TypeInfo::class("IndexedPropertyProxy").build(),
            add,
            remove,
        }
    }

    pub(crate) fn owns(&self, ty: &HostType) -> bool {
        *ty == self.event || *ty == self.indexed
    }

    pub(crate) fn event_object(&self, target: Option<&HostValue>, event: Rc<EventInfo>) -> HostValue {
        HostValue::Object(HostObject::new(
            self.event.clone(),
            EventProxy {
                target: target.cloned(),
                event,
            },
        ))
    }

    pub(crate) fn indexed_object(&self, target: Option<&HostValue>, property: Rc<PropertyInfo>) -> HostValue {
        HostValue::Object(HostObject::new(
            self.indexed.clone(),
            IndexedPropertyProxy {
                target: target.cloned(),
                property,
            },
        ))
    }

    fn event_method(&self, ty: &HostType, name: &str, is_static: bool) -> Option<&Callable> {
        if *ty != self.event || is_static {
            return None;
        }
        match name {
            "Add" => Some(&self.add),
            "Remove" => Some(&self.remove),
            _ => None,
        }
    }
}

impl MetadataProvider for ProxyTypes {
    fn member(&self, ty: &HostType, name: &str, is_static: bool) -> Option<Member> {
        self.event_method(ty, name, is_static)
            .map(|method| Member::Method(vec![method.clone()]))
    }

    fn constructors(&self, _ty: &HostType) -> CandidateSet {
        Vec::new()
    }

    fn methods(&self, ty: &HostType, name: &str, is_static: bool, type_arg_count: usize) -> CandidateSet {
        match self.event_method(ty, name, is_static) {
            Some(method) if type_arg_count == 0 => vec![method.clone()],
            _ => Vec::new(),
        }
    }

    fn operators(&self, _ty: &HostType, _operator: OperatorName) -> CandidateSet {
        Vec::new()
    }

    fn make_generic_type(
        &self,
        definition: &HostType,
        _args: &[HostType],
    ) -> Result<HostType, ConstraintViolation> {
        Err(ConstraintViolation::new(format!("{definition} is not generic")))
    }
}
