//! The object binder: handles, operation tables and value projection.

use std::cell::RefCell;
use std::rc::Rc;

use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, trace};

use tether_core::{
    BindError, Helper, HostType, HostValue, MetadataProvider, NativeFunction, Operation,
    OperationTable, ScriptError, ScriptState, ScriptValue, StackIndex, TableKind,
};
use tether_registry::HandleRegistry;

use crate::options::BinderOptions;
use crate::protocol::guarded;
use crate::proxy::ProxyTypes;

/// Projects host objects and types into one interpreter.
///
/// Installing a binder attaches the object and type operation tables to the
/// interpreter; from then on every boxed value dispatches through them. The
/// binder is cheap to clone and every clone shares the same handle registry.
///
/// ```
/// use tether::{BinderOptions, ObjectBinder};
/// use tether_core::HostValue;
/// use tether_registry::TypeRegistry;
/// use tether_vm::Vm;
///
/// let mut vm = Vm::new();
/// let binder = ObjectBinder::install(&mut vm, TypeRegistry::new(), BinderOptions::default()).unwrap();
///
/// let boxed = binder.to_script(&mut vm, HostValue::from(42i32));
/// assert_eq!(binder.to_host(&boxed), HostValue::I64(42));
/// ```
#[derive(Clone)]
pub struct ObjectBinder {
    inner: Rc<BinderInner>,
}

pub(crate) struct BinderInner {
    provider: Box<dyn MetadataProvider>,
    pub(crate) proxies: ProxyTypes,
    handles: RefCell<HandleRegistry>,
    /// Factory wrapping guarded natives with the error router.
    router: ScriptValue,
}

impl ObjectBinder {
    /// Install the operation tables into `state`.
    pub fn install<P>(
        state: &mut dyn ScriptState,
        provider: P,
        options: BinderOptions,
    ) -> Result<Self, ScriptError>
    where
        P: MetadataProvider + 'static,
    {
        let router = state.load_helper(Helper::ErrorRouter)?;
        let index_cache = match options.cache_lookups {
            true => Some(state.load_helper(Helper::IndexCache)?),
            false => None,
        };

        let inner = Rc::new(BinderInner {
            provider: Box::new(provider),
            proxies: ProxyTypes::new(),
            handles: RefCell::new(HandleRegistry::new()),
            router,
        });

        for kind in [TableKind::Object, TableKind::Type] {
            let table = build_table(&inner, state, kind, index_cache.as_ref())?;
            debug!(?kind, operations = table.len(), "binding operation table");
            state.install_table(kind, table);
        }

        Ok(Self { inner })
    }

    /// Box a host object with the object table.
    pub fn box_object(&self, state: &mut dyn ScriptState, value: HostValue) -> ScriptValue {
        self.inner.box_value(state, value, TableKind::Object)
    }

    /// Box a host type with the type table.
    pub fn box_type(&self, state: &mut dyn ScriptState, ty: HostType) -> ScriptValue {
        self.inner.box_value(state, HostValue::Type(ty), TableKind::Type)
    }

    /// Host view of a script value.
    pub fn to_host(&self, value: &ScriptValue) -> HostValue {
        self.inner.to_host(value)
    }

    /// Script view of a host value; boxes anything without a native form.
    pub fn to_script(&self, state: &mut dyn ScriptState, value: HostValue) -> ScriptValue {
        self.inner.to_script(state, value)
    }

    /// The host value behind a live handle.
    pub fn target(&self, value: &ScriptValue) -> Option<HostValue> {
        self.inner.target(value)
    }

    /// Number of handles not yet finalized.
    pub fn live_handles(&self) -> usize {
        self.inner.handles.borrow().len()
    }
}

fn build_table(
    binder: &Rc<BinderInner>,
    state: &mut dyn ScriptState,
    kind: TableKind,
    index_cache: Option<&ScriptValue>,
) -> Result<OperationTable, ScriptError> {
    let mut operations = Operation::SHARED.to_vec();
    if kind == TableKind::Object {
        operations.extend(Operation::BINARY);
        operations.extend(Operation::UNARY);
    }

    let mut table = OperationTable::new();
    for operation in operations {
        let handler = match operation {
            Operation::Gc => {
                let binder = binder.clone();
                state.new_closure(
                    Rc::new(move |state: &mut dyn ScriptState| binder.finalize(state)),
                    Vec::new(),
                )
            }
            Operation::ToString => {
                let binder = binder.clone();
                state.new_closure(
                    Rc::new(move |state: &mut dyn ScriptState| binder.stringify(state)),
                    Vec::new(),
                )
            }
            Operation::Index => {
                let cacheable = index_cache.is_some();
                let native = state.new_closure(
                    guarded_native(binder, operation, move |binder, state, _| {
                        binder.index(state, kind, cacheable)
                    }),
                    Vec::new(),
                );
                let wrapper = index_cache.unwrap_or(&binder.router);
                first(state.call(wrapper, vec![native])?)
            }
            _ => {
                let native = state.new_closure(
                    guarded_native(binder, operation, move |binder, state, argc| {
                        binder.dispatch(state, operation, kind, argc)
                    }),
                    Vec::new(),
                );
                first(state.call(&binder.router, vec![native])?)
            }
        };
        table.set(operation, handler);
    }
    Ok(table)
}

/// A native function running `body` under the guarded call convention.
pub(crate) fn guarded_native<F>(binder: &Rc<BinderInner>, operation: Operation, body: F) -> NativeFunction
where
    F: Fn(&Rc<BinderInner>, &mut dyn ScriptState, usize) -> Result<usize, BindError> + 'static,
{
    let binder = binder.clone();
    Rc::new(move |state: &mut dyn ScriptState| {
        guarded(state, operation, |state, argc| body(&binder, state, argc))
    })
}

fn first(results: Vec<ScriptValue>) -> ScriptValue {
    results.into_iter().next().unwrap_or_default()
}

impl BinderInner {
    /// Metadata for `ty`; proxy types are answered by the binder itself.
    pub(crate) fn provider(&self, ty: &HostType) -> &dyn MetadataProvider {
        if self.proxies.owns(ty) {
            &self.proxies
        } else {
            self.provider.as_ref()
        }
    }

    pub(crate) fn router(&self) -> &ScriptValue {
        &self.router
    }

    fn box_value(&self, state: &mut dyn ScriptState, value: HostValue, kind: TableKind) -> ScriptValue {
        let handle = self.handles.borrow_mut().insert(value);
        debug!(%handle, ?kind, "boxed host value");
        state.new_userdata(handle, kind)
    }

    pub(crate) fn target(&self, value: &ScriptValue) -> Option<HostValue> {
        let userdata = value.as_userdata()?;
        self.handles.borrow().get(userdata.handle).cloned()
    }

    /// The host value behind the receiver of a dispatch.
    pub(crate) fn receiver(&self, value: &ScriptValue) -> Result<HostValue, BindError> {
        self.target(value).ok_or_else(|| {
            BindError::UnexpectedHostFailure(format!("{value:?} is not a live host handle"))
        })
    }

    pub(crate) fn to_host(&self, value: &ScriptValue) -> HostValue {
        match value {
            ScriptValue::Nil => HostValue::Null,
            ScriptValue::Boolean(v) => HostValue::Bool(*v),
            ScriptValue::Integer(v) => HostValue::I64(*v),
            ScriptValue::Number(v) => HostValue::F64(*v),
            ScriptValue::String(v) => HostValue::String(v.clone()),
            ScriptValue::Userdata(_) => self.target(value).unwrap_or_default(),
            ScriptValue::Function(_) => HostValue::Callback(value.clone()),
        }
    }

    /// Host views of the stack slots `first..=last`.
    pub(crate) fn host_args(&self, state: &dyn ScriptState, first: usize, last: usize) -> Vec<HostValue> {
        (first..=last)
            .map(|slot| self.to_host(&state.get(StackIndex::Slot(slot))))
            .collect()
    }

    pub(crate) fn to_script(&self, state: &mut dyn ScriptState, value: HostValue) -> ScriptValue {
        if let Some(integer) = value.integral() {
            // u64 is reinterpreted, every other width fits
            return ScriptValue::Integer(integer as i64);
        }
        match value {
            HostValue::Null => ScriptValue::Nil,
            HostValue::Bool(v) => ScriptValue::Boolean(v),
            HostValue::F32(v) => ScriptValue::Number(v as f64),
            HostValue::F64(v) => ScriptValue::Number(v),
            HostValue::Decimal(v) => ScriptValue::Number(v.to_f64().unwrap_or(f64::NAN)),
            HostValue::Char(v) => ScriptValue::string(v.to_string()),
            HostValue::String(v) => ScriptValue::String(v),
            HostValue::Callback(function) => function,
            HostValue::Type(_) => self.box_value(state, value, TableKind::Type),
            other => self.box_value(state, other, TableKind::Object),
        }
    }

    fn finalize(&self, state: &mut dyn ScriptState) -> usize {
        let Some(userdata) = state.get(StackIndex::Slot(1)).as_userdata() else {
            return 0;
        };
        let released = self.handles.borrow_mut().release(userdata.handle);
        match released {
            Some(_) => debug!(handle = %userdata.handle, "released handle"),
            None => trace!(handle = %userdata.handle, "handle already released"),
        }
        0
    }

    fn stringify(&self, state: &mut dyn ScriptState) -> usize {
        let text = self
            .target(&state.get(StackIndex::Slot(1)))
            .and_then(|value| value.stringify())
            .unwrap_or_default();
        state.push(ScriptValue::string(text));
        1
    }

    fn dispatch(
        self: &Rc<Self>,
        state: &mut dyn ScriptState,
        operation: Operation,
        kind: TableKind,
        argc: usize,
    ) -> Result<usize, BindError> {
        match (operation, kind) {
            (Operation::Call, TableKind::Object) => self.call_object(state, argc),
            (Operation::Call, TableKind::Type) => self.call_type(state, argc),
            (Operation::NewIndex, _) => self.assign(state),
            (Operation::Unm | Operation::BNot, _) => self.unary(state, operation),
            _ => self.binary(state, operation),
        }
    }
}
