//! Host members: callables, fields, properties, events and nested types.
//!
//! A [`Member`] is what a [`MetadataProvider`](crate::MetadataProvider)
//! returns for a (type, name, static-ness) lookup. Payloads are reference
//! counted so a lookup result is cheap to clone and immutable once built.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::error::{ConstraintViolation, HostException};
use crate::types::HostType;
use crate::value::HostValue;

bitflags! {
    /// Parameter modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParamFlags: u8 {
        /// Output only; consumes no script argument.
        const OUT = 1 << 0;
        /// May be omitted; takes its default value.
        const OPTIONAL = 1 << 1;
        /// Trailing parameter absorbing all remaining arguments into an array.
        const VARIADIC = 1 << 2;
    }
}

/// One parameter of a callable.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: HostType,
    pub flags: ParamFlags,
    pub default: HostValue,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: HostType) -> Self {
        Self {
            name: name.into(),
            ty,
            flags: ParamFlags::empty(),
            default: HostValue::Null,
        }
    }

    /// An in/out parameter; its final value is returned to the script.
    pub fn by_ref(name: impl Into<String>, ty: HostType) -> Self {
        Self::new(name, HostType::by_ref(ty))
    }

    /// An output parameter; its final value is returned to the script.
    pub fn out(name: impl Into<String>, ty: HostType) -> Self {
        let mut param = Self::by_ref(name, ty);
        param.flags = ParamFlags::OUT;
        param
    }

    pub fn optional(name: impl Into<String>, ty: HostType, default: HostValue) -> Self {
        let mut param = Self::new(name, ty);
        param.flags = ParamFlags::OPTIONAL;
        param.default = default;
        param
    }

    /// A trailing parameter collecting the remaining arguments as `element[]`.
    pub fn variadic(name: impl Into<String>, element: HostType) -> Self {
        let mut param = Self::new(name, HostType::array_of(element));
        param.flags = ParamFlags::VARIADIC;
        param
    }

    pub fn is_out(&self) -> bool {
        self.flags.contains(ParamFlags::OUT)
    }

    pub fn is_optional(&self) -> bool {
        self.flags.contains(ParamFlags::OPTIONAL)
    }

    pub fn is_variadic(&self) -> bool {
        self.flags.contains(ParamFlags::VARIADIC)
    }

    /// Whether the callee may write the argument back.
    pub fn is_by_ref(&self) -> bool {
        self.ty.is_by_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableKind {
    Constructor,
    Method,
    Operator,
    Accessor,
}

/// Host function body.
///
/// Receives the target (`None` for static callables and constructors) and
/// the coerced arguments; by-reference parameters are written back in place.
pub type InvokeFn = Rc<dyn Fn(Option<&HostValue>, &mut [HostValue]) -> Result<HostValue, HostException>>;

/// Closes a generic method definition over concrete type arguments.
pub type InstantiateFn = Rc<dyn Fn(&[HostType]) -> Result<Callable, ConstraintViolation>>;

struct CallableDef {
    name: String,
    kind: CallableKind,
    params: Vec<Param>,
    return_type: HostType,
    is_static: bool,
    generic_arity: usize,
    type_args: Vec<HostType>,
    invoke: InvokeFn,
    instantiate: Option<InstantiateFn>,
}

/// A host constructor, method, operator or accessor.
#[derive(Clone)]
pub struct Callable(Rc<CallableDef>);

impl Callable {
    /// Start describing a callable.
    pub fn builder(name: impl Into<String>, kind: CallableKind) -> CallableBuilder {
        CallableBuilder {
            name: name.into(),
            kind,
            params: Vec::new(),
            return_type: HostType::void(),
            is_static: false,
            generic_arity: 0,
            type_args: Vec::new(),
            instantiate: None,
        }
    }

    /// An instance method.
    pub fn method<F>(name: impl Into<String>, params: Vec<Param>, return_type: HostType, f: F) -> Self
    where
        F: Fn(Option<&HostValue>, &mut [HostValue]) -> Result<HostValue, HostException> + 'static,
    {
        Self::builder(name, CallableKind::Method)
            .params(params)
            .returns(return_type)
            .invoke(f)
    }

    /// A static method.
    pub fn static_method<F>(name: impl Into<String>, params: Vec<Param>, return_type: HostType, f: F) -> Self
    where
        F: Fn(Option<&HostValue>, &mut [HostValue]) -> Result<HostValue, HostException> + 'static,
    {
        Self::builder(name, CallableKind::Method)
            .params(params)
            .returns(return_type)
            .static_()
            .invoke(f)
    }

    /// A constructor of `ty`.
    pub fn constructor<F>(ty: &HostType, params: Vec<Param>, f: F) -> Self
    where
        F: Fn(&mut [HostValue]) -> Result<HostValue, HostException> + 'static,
    {
        Self::builder(".ctor", CallableKind::Constructor)
            .params(params)
            .returns(ty.clone())
            .static_()
            .invoke(move |_, args| f(args))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> CallableKind {
        self.0.kind
    }

    pub fn params(&self) -> &[Param] {
        &self.0.params
    }

    pub fn return_type(&self) -> &HostType {
        &self.0.return_type
    }

    pub fn returns_void(&self) -> bool {
        self.0.return_type.is_void()
    }

    pub fn is_static(&self) -> bool {
        self.0.is_static
    }

    /// Number of type parameters still to be supplied.
    pub fn generic_arity(&self) -> usize {
        self.0.generic_arity
    }

    pub fn is_generic_definition(&self) -> bool {
        self.0.generic_arity > 0
    }

    /// Type arguments this callable was instantiated with.
    pub fn type_args(&self) -> &[HostType] {
        &self.0.type_args
    }

    pub fn invoke(
        &self,
        target: Option<&HostValue>,
        args: &mut [HostValue],
    ) -> Result<HostValue, HostException> {
        (self.0.invoke)(target, args)
    }

    /// Close a generic definition over `type_args`.
    pub fn instantiate(&self, type_args: &[HostType]) -> Result<Callable, ConstraintViolation> {
        match &self.0.instantiate {
            Some(instantiate) if type_args.len() == self.0.generic_arity => instantiate(type_args),
            Some(_) => Err(ConstraintViolation::new(format!(
                "{} expects {} type arguments",
                self.name(),
                self.0.generic_arity
            ))),
            None => Err(ConstraintViolation::new(format!(
                "{} is not a generic method definition",
                self.name()
            ))),
        }
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.params().iter().map(|p| p.ty.name()).collect();
        write!(f, "{}({})", self.name(), params.join(", "))
    }
}

/// Fluent description of a [`Callable`].
#[must_use]
pub struct CallableBuilder {
    name: String,
    kind: CallableKind,
    params: Vec<Param>,
    return_type: HostType,
    is_static: bool,
    generic_arity: usize,
    type_args: Vec<HostType>,
    instantiate: Option<InstantiateFn>,
}

impl CallableBuilder {
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn returns(mut self, ty: HostType) -> Self {
        self.return_type = ty;
        self
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Record the type arguments of an instantiated generic method.
    pub fn type_args(mut self, type_args: Vec<HostType>) -> Self {
        self.type_args = type_args;
        self
    }

    /// Make this a generic method definition with `arity` type parameters.
    ///
    /// The resulting callable cannot be invoked directly; `instantiate` builds
    /// the closed callable or reports a constraint violation.
    pub fn generic<F>(mut self, arity: usize, instantiate: F) -> Callable
    where
        F: Fn(&[HostType]) -> Result<Callable, ConstraintViolation> + 'static,
    {
        self.generic_arity = arity;
        self.instantiate = Some(Rc::new(instantiate));
        let name = self.name.clone();
        self.invoke(move |_, _| {
            Err(HostException::new(format!(
                "cannot invoke open generic method {name}"
            )))
        })
    }

    pub fn invoke<F>(self, f: F) -> Callable
    where
        F: Fn(Option<&HostValue>, &mut [HostValue]) -> Result<HostValue, HostException> + 'static,
    {
        Callable(Rc::new(CallableDef {
            name: self.name,
            kind: self.kind,
            params: self.params,
            return_type: self.return_type,
            is_static: self.is_static,
            generic_arity: self.generic_arity,
            type_args: self.type_args,
            invoke: Rc::new(f),
            instantiate: self.instantiate,
        }))
    }
}

/// Ordered overloads or operators considered together.
pub type CandidateSet = Vec<Callable>;

pub type FieldGetter = Rc<dyn Fn(Option<&HostValue>) -> HostValue>;
pub type FieldSetter = Rc<dyn Fn(Option<&HostValue>, HostValue) -> Result<(), HostException>>;

/// A data member.
pub struct FieldInfo {
    pub name: String,
    pub ty: HostType,
    pub is_static: bool,
    /// A compile-time constant: never writable, always cacheable.
    pub is_constant: bool,
    getter: FieldGetter,
    setter: Option<FieldSetter>,
}

impl FieldInfo {
    pub fn new<G, S>(name: impl Into<String>, ty: HostType, getter: G, setter: S) -> Self
    where
        G: Fn(Option<&HostValue>) -> HostValue + 'static,
        S: Fn(Option<&HostValue>, HostValue) -> Result<(), HostException> + 'static,
    {
        Self {
            name: name.into(),
            ty,
            is_static: false,
            is_constant: false,
            getter: Rc::new(getter),
            setter: Some(Rc::new(setter)),
        }
    }

    /// A constant; implicitly static.
    pub fn constant(name: impl Into<String>, ty: HostType, value: HostValue) -> Self {
        Self {
            name: name.into(),
            ty,
            is_static: true,
            is_constant: true,
            getter: Rc::new(move |_| value.clone()),
            setter: None,
        }
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn get(&self, target: Option<&HostValue>) -> HostValue {
        (self.getter)(target)
    }

    /// Write an already coerced value. Constants reject every write.
    pub fn set(&self, target: Option<&HostValue>, value: HostValue) -> Result<(), HostException> {
        match &self.setter {
            Some(setter) => setter(target, value),
            None => Err(HostException::new(format!(
                "field {} is read-only",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("is_static", &self.is_static)
            .field("is_constant", &self.is_constant)
            .finish_non_exhaustive()
    }
}

/// A property, optionally indexed.
///
/// Getters take the index parameters; setters take the index parameters
/// followed by the value.
#[derive(Debug)]
pub struct PropertyInfo {
    pub name: String,
    pub ty: HostType,
    pub is_static: bool,
    pub index_params: Vec<Param>,
    pub getter: Option<Callable>,
    pub setter: Option<Callable>,
}

impl PropertyInfo {
    pub fn new(name: impl Into<String>, ty: HostType) -> Self {
        Self {
            name: name.into(),
            ty,
            is_static: false,
            index_params: Vec::new(),
            getter: None,
            setter: None,
        }
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_index(mut self, params: Vec<Param>) -> Self {
        self.index_params = params;
        self
    }

    pub fn with_getter(mut self, getter: Callable) -> Self {
        self.getter = Some(getter);
        self
    }

    pub fn with_setter(mut self, setter: Callable) -> Self {
        self.setter = Some(setter);
        self
    }

    pub fn is_indexed(&self) -> bool {
        !self.index_params.is_empty()
    }
}

/// An event with its subscription accessors.
///
/// `add` and `remove` take a single delegate argument of `handler_type`.
#[derive(Debug)]
pub struct EventInfo {
    pub name: String,
    pub handler_type: HostType,
    pub is_static: bool,
    pub add: Callable,
    pub remove: Callable,
}

/// Result of a member lookup.
#[derive(Debug, Clone)]
pub enum Member {
    Field(Rc<FieldInfo>),
    Property(Rc<PropertyInfo>),
    IndexedProperty(Rc<PropertyInfo>),
    Method(CandidateSet),
    Event(Rc<EventInfo>),
    NestedType(HostType),
}

impl Member {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Member::Field(_) => "field",
            Member::Property(_) => "property",
            Member::IndexedProperty(_) => "indexed property",
            Member::Method(_) => "method",
            Member::Event(_) => "event",
            Member::NestedType(_) => "nested type",
        }
    }

    /// Wrap a property, choosing the indexed variant when it has index parameters.
    pub fn property(property: PropertyInfo) -> Self {
        if property.is_indexed() {
            Member::IndexedProperty(Rc::new(property))
        } else {
            Member::Property(Rc::new(property))
        }
    }
}
