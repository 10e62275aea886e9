//! Fluent registration of host types.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use tether_core::{Callable, HostObject, HostType, HostValue, Param, PrimitiveKind, TypeInfo};
//! use tether_registry::{TypeBuilder, TypeRegistry};
//!
//! let int = HostType::primitive(PrimitiveKind::Int32);
//! let counter = TypeInfo::class("Counter").build();
//!
//! let mut registry = TypeRegistry::new();
//! registry
//!     .register(
//!         TypeBuilder::new(counter.clone())
//!             .constructor(Callable::constructor(&counter, vec![], {
//!                 let counter = counter.clone();
//!                 move |_| Ok(HostValue::Object(HostObject::new(counter.clone(), Cell::new(0))))
//!             }))
//!             .method(Callable::method("Bump", vec![Param::new("by", int.clone())], int, |this, args| {
//!                 let cell = this.and_then(|v| v.downcast_ref::<Cell<i32>>()).unwrap();
//!                 let by = match args[0] { HostValue::I32(v) => v, _ => 0 };
//!                 cell.set(cell.get() + by);
//!                 Ok(HostValue::I32(cell.get()))
//!             })),
//!     )
//!     .unwrap();
//!
//! assert!(registry.get("Counter").is_some());
//! ```

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use tether_core::{
    Callable, EventInfo, FieldInfo, HostType, Member, OperatorName, PropertyInfo,
};

/// Requirement on a generic type argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenericConstraint {
    /// The argument must be a non-nullable value type.
    ValueType,
    /// The argument must be a reference type.
    ReferenceType,
    /// The argument must derive from or implement the given type.
    SubtypeOf(HostType),
}

impl GenericConstraint {
    pub fn is_satisfied_by(&self, arg: &HostType) -> bool {
        match self {
            GenericConstraint::ValueType => arg.is_value_type() && !arg.is_nullable(),
            GenericConstraint::ReferenceType => !arg.is_value_type(),
            GenericConstraint::SubtypeOf(base) => arg.is_subtype_of(base),
        }
    }
}

impl fmt::Display for GenericConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenericConstraint::ValueType => f.write_str("struct"),
            GenericConstraint::ReferenceType => f.write_str("class"),
            GenericConstraint::SubtypeOf(base) => write!(f, "{base}"),
        }
    }
}

/// Builds the members of a closed generic instance on first use.
pub type InstanceFactory = Rc<dyn Fn(&HostType) -> TypeBuilder>;

/// Everything the registry knows about one type.
pub struct TypeEntry {
    pub(crate) ty: HostType,
    pub(crate) constructors: Vec<Callable>,
    pub(crate) methods: FxHashMap<String, Vec<Callable>>,
    pub(crate) operators: FxHashMap<OperatorName, Vec<Callable>>,
    /// Non-method members keyed by (name, is_static).
    pub(crate) members: FxHashMap<(String, bool), Member>,
    pub(crate) constraints: Vec<Option<GenericConstraint>>,
    pub(crate) factory: Option<InstanceFactory>,
}

impl TypeEntry {
    pub fn host_type(&self) -> &HostType {
        &self.ty
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("ty", &self.ty)
            .field("constructors", &self.constructors.len())
            .field("methods", &self.methods.len())
            .field("operators", &self.operators.len())
            .field("members", &self.members.len())
            .finish_non_exhaustive()
    }
}

/// Fluent description of a host type's members.
///
/// Validation happens in [`TypeRegistry::register`](crate::TypeRegistry::register).
#[must_use]
pub struct TypeBuilder {
    ty: HostType,
    constructors: Vec<Callable>,
    methods: Vec<Callable>,
    operators: Vec<(OperatorName, Callable)>,
    fields: Vec<FieldInfo>,
    properties: Vec<PropertyInfo>,
    events: Vec<EventInfo>,
    nested: Vec<(String, HostType)>,
    constraints: Vec<Option<GenericConstraint>>,
    factory: Option<InstanceFactory>,
}

impl TypeBuilder {
    pub fn new(ty: HostType) -> Self {
        let arity = ty.generic_arity();
        Self {
            ty,
            constructors: Vec::new(),
            methods: Vec::new(),
            operators: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            nested: Vec::new(),
            constraints: vec![None; arity],
            factory: None,
        }
    }

    pub fn host_type(&self) -> &HostType {
        &self.ty
    }

    pub fn constructor(mut self, constructor: Callable) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Add a method overload; static-ness comes from the callable.
    pub fn method(mut self, method: Callable) -> Self {
        self.methods.push(method);
        self
    }

    /// Declare `operator`; the callable must be static.
    pub fn operator(mut self, operator: OperatorName, callable: Callable) -> Self {
        self.operators.push((operator, callable));
        self
    }

    pub fn field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    pub fn property(mut self, property: PropertyInfo) -> Self {
        self.properties.push(property);
        self
    }

    pub fn event(mut self, event: EventInfo) -> Self {
        self.events.push(event);
        self
    }

    /// Expose `ty` as a static member of this type.
    pub fn nested(mut self, name: impl Into<String>, ty: HostType) -> Self {
        self.nested.push((name.into(), ty));
        self
    }

    /// Constrain the type parameter at `position` of a generic definition.
    pub fn constraint(mut self, position: usize, constraint: GenericConstraint) -> Self {
        if let Some(slot) = self.constraints.get_mut(position) {
            *slot = Some(constraint);
        }
        self
    }

    /// Describe the members of each closed instance of a generic definition.
    pub fn instances<F>(mut self, factory: F) -> Self
    where
        F: Fn(&HostType) -> TypeBuilder + 'static,
    {
        self.factory = Some(Rc::new(factory));
        self
    }

    pub(crate) fn parts(self) -> BuilderParts {
        BuilderParts {
            ty: self.ty,
            constructors: self.constructors,
            methods: self.methods,
            operators: self.operators,
            fields: self.fields,
            properties: self.properties,
            events: self.events,
            nested: self.nested,
            constraints: self.constraints,
            factory: self.factory,
        }
    }
}

/// A builder taken apart for validation.
pub(crate) struct BuilderParts {
    pub ty: HostType,
    pub constructors: Vec<Callable>,
    pub methods: Vec<Callable>,
    pub operators: Vec<(OperatorName, Callable)>,
    pub fields: Vec<FieldInfo>,
    pub properties: Vec<PropertyInfo>,
    pub events: Vec<EventInfo>,
    pub nested: Vec<(String, HostType)>,
    pub constraints: Vec<Option<GenericConstraint>>,
    pub factory: Option<InstanceFactory>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{PrimitiveKind, TypeInfo};

    #[test]
    fn constraints() {
        let int = HostType::primitive(PrimitiveKind::Int32);
        let shape = TypeInfo::interface("IShape").build();
        let circle = TypeInfo::class("Circle").with_interface(shape.clone()).build();

        assert!(GenericConstraint::ValueType.is_satisfied_by(&int));
        assert!(!GenericConstraint::ValueType.is_satisfied_by(&HostType::nullable_of(int.clone())));
        assert!(!GenericConstraint::ReferenceType.is_satisfied_by(&int));
        assert!(GenericConstraint::ReferenceType.is_satisfied_by(&HostType::string()));
        assert!(GenericConstraint::SubtypeOf(shape.clone()).is_satisfied_by(&circle));
        assert!(!GenericConstraint::SubtypeOf(shape).is_satisfied_by(&int));
    }

    #[test]
    fn constraint_slots_follow_arity() {
        let map = TypeInfo::generic_definition("Map", &["K", "V"]).build();
        let builder = TypeBuilder::new(map)
            .constraint(1, GenericConstraint::ReferenceType)
            .constraint(5, GenericConstraint::ValueType);
        let parts = builder.parts();
        assert_eq!(parts.constraints, vec![None, Some(GenericConstraint::ReferenceType)]);
    }
}
