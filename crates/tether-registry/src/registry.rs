//! TypeRegistry - in-memory metadata provider.
//!
//! [`TypeRegistry`] stores one [`TypeEntry`] per registered host type and
//! answers the binder's [`MetadataProvider`] lookups from them.
//!
//! # Storage Model
//!
//! - **Types**: entries stored by `TypeHash`, with a name index.
//! - **Generic instances**: built on first use by the definition's instance
//!   factory and kept in a separate map behind a `RefCell`, since lookups
//!   only take `&self`.
//! - **Inheritance**: member, method and operator lookups walk the base
//!   chain, most derived type first. Constructors are never inherited.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use tether_core::{
    CandidateSet, ConstraintViolation, HostType, Member, MetadataProvider, OperatorName, TypeHash,
};

use crate::builder::{BuilderParts, TypeBuilder, TypeEntry};
use crate::error::RegistryError;

/// Registered host types and their members.
#[derive(Default)]
pub struct TypeRegistry {
    types: FxHashMap<TypeHash, Rc<TypeEntry>>,
    by_name: FxHashMap<String, TypeHash>,
    instances: RefCell<FxHashMap<TypeHash, Rc<TypeEntry>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a type description.
    pub fn register(&mut self, builder: TypeBuilder) -> Result<HostType, RegistryError> {
        let entry = build_entry(builder.parts())?;
        let ty = entry.ty.clone();
        if self.by_name.contains_key(ty.name()) || self.types.contains_key(&ty.hash()) {
            return Err(RegistryError::DuplicateType(ty.name().to_string()));
        }
        debug!(type_name = %ty, "registered host type");
        self.by_name.insert(ty.name().to_string(), ty.hash());
        self.types.insert(ty.hash(), Rc::new(entry));
        Ok(ty)
    }

    /// A registered type by name, e.g. `"Counter"` or `"List<T>"`.
    pub fn get(&self, name: &str) -> Option<HostType> {
        let hash = self.by_name.get(name)?;
        self.types.get(hash).map(|entry| entry.ty.clone())
    }

    /// Number of registered types, not counting generic instances.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The entry describing `ty`, building generic instances on demand.
    pub fn entry(&self, ty: &HostType) -> Option<Rc<TypeEntry>> {
        if let Some(entry) = self.types.get(&ty.hash()) {
            return Some(entry.clone());
        }
        if let Some(entry) = self.instances.borrow().get(&ty.hash()) {
            return Some(entry.clone());
        }
        let definition = ty.definition()?;
        self.instance_entry(definition, ty).ok()
    }

    fn instance_entry(
        &self,
        definition: &HostType,
        instance: &HostType,
    ) -> Result<Rc<TypeEntry>, ConstraintViolation> {
        if let Some(entry) = self.instances.borrow().get(&instance.hash()) {
            return Ok(entry.clone());
        }
        let definition_entry = self.types.get(&definition.hash()).ok_or_else(|| {
            ConstraintViolation::new(format!("{definition} is not a registered generic type"))
        })?;
        let factory = definition_entry.factory.clone().ok_or_else(|| {
            ConstraintViolation::new(format!("{definition} has no instance factory"))
        })?;

        // the factory may look up other types, so no borrow is held across it
        let builder = factory(instance);
        let entry = build_entry(builder.parts())
            .map_err(|error| ConstraintViolation::new(error.to_string()))?;
        let entry = Rc::new(entry);
        debug!(type_name = %instance, "built generic instance");
        self.instances
            .borrow_mut()
            .insert(instance.hash(), entry.clone());
        Ok(entry)
    }

    /// Walk `ty` and its bases, most derived first.
    fn hierarchy(&self, ty: &HostType) -> Vec<Rc<TypeEntry>> {
        let mut entries = Vec::new();
        let mut current = Some(ty.clone());
        while let Some(ty) = current {
            if let Some(entry) = self.entry(&ty) {
                entries.push(entry);
            }
            current = ty.base().cloned();
        }
        entries
    }

    fn collect_methods(
        entries: &[Rc<TypeEntry>],
        name: &str,
        is_static: bool,
        arity: Option<usize>,
    ) -> CandidateSet {
        entries
            .iter()
            .filter_map(|entry| entry.methods.get(name))
            .flatten()
            .filter(|method| method.is_static() == is_static)
            .filter(|method| arity.is_none_or(|arity| method.generic_arity() == arity))
            .cloned()
            .collect()
    }
}

impl MetadataProvider for TypeRegistry {
    fn member(&self, ty: &HostType, name: &str, is_static: bool) -> Option<Member> {
        let entries = self.hierarchy(ty);
        let key = (name.to_string(), is_static);
        for (depth, entry) in entries.iter().enumerate() {
            let declares_method = entry
                .methods
                .get(name)
                .is_some_and(|methods| methods.iter().any(|m| m.is_static() == is_static));
            if declares_method {
                return Some(Member::Method(Self::collect_methods(
                    &entries[depth..],
                    name,
                    is_static,
                    None,
                )));
            }
            if let Some(member) = entry.members.get(&key) {
                return Some(member.clone());
            }
        }
        None
    }

    fn constructors(&self, ty: &HostType) -> CandidateSet {
        self.entry(ty)
            .map(|entry| entry.constructors.clone())
            .unwrap_or_default()
    }

    fn methods(&self, ty: &HostType, name: &str, is_static: bool, type_arg_count: usize) -> CandidateSet {
        Self::collect_methods(&self.hierarchy(ty), name, is_static, Some(type_arg_count))
    }

    fn operators(&self, ty: &HostType, operator: OperatorName) -> CandidateSet {
        self.hierarchy(ty)
            .iter()
            .filter_map(|entry| entry.operators.get(&operator))
            .flatten()
            .cloned()
            .collect()
    }

    fn make_generic_type(
        &self,
        definition: &HostType,
        args: &[HostType],
    ) -> Result<HostType, ConstraintViolation> {
        let entry = self
            .types
            .get(&definition.hash())
            .filter(|entry| entry.ty.is_generic_definition())
            .ok_or_else(|| {
                ConstraintViolation::new(format!("{definition} is not a registered generic type"))
            })?;
        if args.len() != definition.generic_arity() {
            return Err(ConstraintViolation::new(format!(
                "{definition} expects {} type arguments, got {}",
                definition.generic_arity(),
                args.len()
            )));
        }
        for ((arg, constraint), param) in args
            .iter()
            .zip(&entry.constraints)
            .zip(definition.generic_args())
        {
            if let Some(constraint) = constraint
                && !constraint.is_satisfied_by(arg)
            {
                return Err(ConstraintViolation::new(format!(
                    "{arg} does not satisfy the {constraint} constraint on {param} of {definition}"
                )));
            }
        }

        let instance = HostType::instantiate(definition, args.to_vec());
        self.instance_entry(definition, &instance)?;
        Ok(instance)
    }
}

fn build_entry(parts: BuilderParts) -> Result<TypeEntry, RegistryError> {
    let BuilderParts {
        ty,
        constructors,
        methods,
        operators,
        fields,
        properties,
        events,
        nested,
        constraints,
        factory,
    } = parts;
    let type_name = ty.name().to_string();

    if ty.is_generic_definition() && factory.is_none() {
        return Err(RegistryError::MissingInstanceFactory(type_name));
    }

    for callable in constructors.iter().chain(&methods) {
        let params = callable.params();
        if let Some(position) = params.iter().position(|p| p.is_variadic())
            && position + 1 != params.len()
        {
            return Err(RegistryError::MisplacedVariadic {
                type_name,
                callable: callable.name().to_string(),
            });
        }
    }

    let mut method_map: FxHashMap<String, Vec<_>> = FxHashMap::default();
    for method in methods {
        method_map
            .entry(method.name().to_string())
            .or_default()
            .push(method);
    }

    let mut operator_map: FxHashMap<OperatorName, Vec<_>> = FxHashMap::default();
    for (operator, callable) in operators {
        if !callable.is_static() {
            return Err(RegistryError::OperatorNotStatic {
                type_name,
                operator: operator.canonical(),
            });
        }
        let expected = if operator.is_unary() { 1 } else { 2 };
        if callable.params().len() != expected {
            return Err(RegistryError::OperatorArity {
                type_name,
                operator: operator.canonical(),
                expected,
                found: callable.params().len(),
            });
        }
        operator_map.entry(operator).or_default().push(callable);
    }

    let mut members: FxHashMap<(String, bool), Member> = FxHashMap::default();
    let mut declared = Vec::new();
    for field in fields {
        declared.push(((field.name.clone(), field.is_static), Member::Field(Rc::new(field))));
    }
    for property in properties {
        declared.push((
            (property.name.clone(), property.is_static),
            Member::property(property),
        ));
    }
    for event in events {
        declared.push(((event.name.clone(), event.is_static), Member::Event(Rc::new(event))));
    }
    for (name, nested_type) in nested {
        declared.push(((name, true), Member::NestedType(nested_type)));
    }
    for (key, member) in declared {
        if members.contains_key(&key) || method_map.contains_key(&key.0) {
            return Err(RegistryError::DuplicateMember {
                type_name,
                member: key.0,
            });
        }
        members.insert(key, member);
    }

    Ok(TypeEntry {
        ty,
        constructors,
        methods: method_map,
        operators: operator_map,
        members,
        constraints,
        factory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GenericConstraint;
    use tether_core::{
        Callable, CallableKind, FieldInfo, HostValue, Param, PrimitiveKind, TypeInfo,
    };

    fn int() -> HostType {
        HostType::primitive(PrimitiveKind::Int32)
    }

    fn noop(name: &str) -> Callable {
        Callable::method(name, vec![], HostType::void(), |_, _| Ok(HostValue::Null))
    }

    #[test]
    fn duplicate_types_are_rejected() {
        let mut registry = TypeRegistry::new();
        let ty = TypeInfo::class("Thing").build();
        registry.register(TypeBuilder::new(ty.clone())).unwrap();
        assert_eq!(
            registry.register(TypeBuilder::new(ty)),
            Err(RegistryError::DuplicateType("Thing".into()))
        );
    }

    #[test]
    fn members_are_inherited() {
        let mut registry = TypeRegistry::new();
        let base = registry
            .register(
                TypeBuilder::new(TypeInfo::class("Base").build())
                    .method(noop("Greet"))
                    .field(FieldInfo::constant("Limit", int(), HostValue::I32(3))),
            )
            .unwrap();
        let derived = registry
            .register(
                TypeBuilder::new(TypeInfo::class("Derived").with_base(base).build())
                    .method(noop("Greet")),
            )
            .unwrap();

        match registry.member(&derived, "Greet", false) {
            Some(Member::Method(candidates)) => assert_eq!(candidates.len(), 2),
            other => panic!("expected method, got {other:?}"),
        }
        assert!(matches!(
            registry.member(&derived, "Limit", true),
            Some(Member::Field(_))
        ));
        assert!(registry.member(&derived, "Limit", false).is_none());
        assert!(registry.member(&derived, "Missing", false).is_none());
    }

    #[test]
    fn methods_filter_by_arity_and_staticness() {
        let mut registry = TypeRegistry::new();
        let generic = Callable::builder("Make", CallableKind::Method)
            .static_()
            .generic(1, |args| {
                Ok(Callable::builder("Make", CallableKind::Method)
                    .static_()
                    .returns(args[0].clone())
                    .invoke(|_, _| Ok(HostValue::Null)))
            });
        let ty = registry
            .register(
                TypeBuilder::new(TypeInfo::class("Factory").build())
                    .method(generic)
                    .method(Callable::static_method(
                        "Make",
                        vec![Param::new("n", int())],
                        int(),
                        |_, args| Ok(args[0].clone()),
                    ))
                    .method(noop("Make")),
            )
            .unwrap();

        assert_eq!(registry.methods(&ty, "Make", true, 0).len(), 1);
        assert_eq!(registry.methods(&ty, "Make", true, 1).len(), 1);
        assert_eq!(registry.methods(&ty, "Make", false, 0).len(), 1);
        assert!(registry.methods(&ty, "Make", true, 2).is_empty());
    }

    #[test]
    fn operators_are_validated() {
        let mut registry = TypeRegistry::new();
        let ty = TypeInfo::class("Num").build();
        let not_static = Callable::method(
            "op_Addition",
            vec![Param::new("a", ty.clone()), Param::new("b", ty.clone())],
            ty.clone(),
            |_, _| Ok(HostValue::Null),
        );
        let result = registry.register(
            TypeBuilder::new(ty.clone()).operator(OperatorName::Addition, not_static),
        );
        assert!(matches!(result, Err(RegistryError::OperatorNotStatic { .. })));

        let unary_with_two = Callable::static_method(
            "op_UnaryNegation",
            vec![Param::new("a", ty.clone()), Param::new("b", ty.clone())],
            ty.clone(),
            |_, _| Ok(HostValue::Null),
        );
        let result = registry
            .register(TypeBuilder::new(ty).operator(OperatorName::UnaryNegation, unary_with_two));
        assert!(matches!(
            result,
            Err(RegistryError::OperatorArity { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn misplaced_variadic_is_rejected() {
        let mut registry = TypeRegistry::new();
        let bad = Callable::static_method(
            "Log",
            vec![Param::variadic("rest", int()), Param::new("tail", int())],
            HostType::void(),
            |_, _| Ok(HostValue::Null),
        );
        let result =
            registry.register(TypeBuilder::new(TypeInfo::class("Logger").build()).method(bad));
        assert!(matches!(result, Err(RegistryError::MisplacedVariadic { .. })));
    }

    #[test]
    fn generic_instances_check_constraints() {
        let mut registry = TypeRegistry::new();
        let definition = TypeInfo::generic_definition("Box", &["T"]).build();
        let definition = registry
            .register(
                TypeBuilder::new(definition)
                    .constraint(0, GenericConstraint::ValueType)
                    .instances(|instance| {
                        let arg = instance.generic_args()[0].clone();
                        TypeBuilder::new(instance.clone()).field(FieldInfo::constant(
                            "Default",
                            arg,
                            HostValue::Null,
                        ))
                    }),
            )
            .unwrap();

        let boxed_int = registry.make_generic_type(&definition, &[int()]).unwrap();
        assert_eq!(boxed_int.name(), "Box<int>");
        assert!(registry.member(&boxed_int, "Default", true).is_some());

        let err = registry
            .make_generic_type(&definition, &[HostType::string()])
            .unwrap_err();
        assert!(err.message.contains("constraint"));

        assert!(registry.make_generic_type(&definition, &[]).is_err());
    }

    #[test]
    fn generic_definition_requires_factory() {
        let mut registry = TypeRegistry::new();
        let result = registry.register(TypeBuilder::new(
            TypeInfo::generic_definition("Bare", &["T"]).build(),
        ));
        assert_eq!(
            result,
            Err(RegistryError::MissingInstanceFactory("Bare<T>".into()))
        );
    }
}
