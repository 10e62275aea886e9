//! Lookup memoization for metadata providers.

use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;

use tether_core::{
    CandidateSet, ConstraintViolation, HostType, Member, MetadataProvider, OperatorName, TypeHash,
};

/// Lookups keyed first by everything but the name, then by name, so a hit
/// borrows the `&str` it was asked for.
type ByName<K, V> = FxHashMap<K, FxHashMap<Box<str>, V>>;

/// Caches every lookup of an inner provider per type.
///
/// Metadata is assumed immutable once registered, so entries never expire.
/// Generic type construction is passed through uncached.
pub struct MemoizedProvider<P> {
    inner: P,
    members: RefCell<ByName<(TypeHash, bool), Option<Member>>>,
    methods: RefCell<ByName<(TypeHash, bool, usize), CandidateSet>>,
    constructors: RefCell<FxHashMap<TypeHash, CandidateSet>>,
    operators: RefCell<FxHashMap<(TypeHash, OperatorName), CandidateSet>>,
    misses: Cell<usize>,
}

impl<P: MetadataProvider> MemoizedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            members: RefCell::default(),
            methods: RefCell::default(),
            constructors: RefCell::default(),
            operators: RefCell::default(),
            misses: Cell::new(0),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of lookups forwarded to the inner provider.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    /// Drop every cached lookup.
    pub fn clear(&self) {
        self.members.borrow_mut().clear();
        self.methods.borrow_mut().clear();
        self.constructors.borrow_mut().clear();
        self.operators.borrow_mut().clear();
    }

    fn miss(&self) {
        self.misses.set(self.misses.get() + 1);
    }
}

impl<P: MetadataProvider> MetadataProvider for MemoizedProvider<P> {
    fn member(&self, ty: &HostType, name: &str, is_static: bool) -> Option<Member> {
        let key = (ty.hash(), is_static);
        if let Some(cached) = self.members.borrow().get(&key).and_then(|names| names.get(name)) {
            return cached.clone();
        }
        self.miss();
        let member = self.inner.member(ty, name, is_static);
        self.members
            .borrow_mut()
            .entry(key)
            .or_default()
            .insert(name.into(), member.clone());
        member
    }

    fn constructors(&self, ty: &HostType) -> CandidateSet {
        if let Some(cached) = self.constructors.borrow().get(&ty.hash()) {
            return cached.clone();
        }
        self.miss();
        let constructors = self.inner.constructors(ty);
        self.constructors
            .borrow_mut()
            .insert(ty.hash(), constructors.clone());
        constructors
    }

    fn methods(&self, ty: &HostType, name: &str, is_static: bool, type_arg_count: usize) -> CandidateSet {
        let key = (ty.hash(), is_static, type_arg_count);
        if let Some(cached) = self.methods.borrow().get(&key).and_then(|names| names.get(name)) {
            return cached.clone();
        }
        self.miss();
        let methods = self.inner.methods(ty, name, is_static, type_arg_count);
        self.methods
            .borrow_mut()
            .entry(key)
            .or_default()
            .insert(name.into(), methods.clone());
        methods
    }

    fn operators(&self, ty: &HostType, operator: OperatorName) -> CandidateSet {
        let key = (ty.hash(), operator);
        if let Some(cached) = self.operators.borrow().get(&key) {
            return cached.clone();
        }
        self.miss();
        let operators = self.inner.operators(ty, operator);
        self.operators.borrow_mut().insert(key, operators.clone());
        operators
    }

    fn make_generic_type(
        &self,
        definition: &HostType,
        args: &[HostType],
    ) -> Result<HostType, ConstraintViolation> {
        self.inner.make_generic_type(definition, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TypeBuilder, TypeRegistry};
    use tether_core::{Callable, HostValue, TypeInfo};

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let mut registry = TypeRegistry::new();
        let ty = registry
            .register(TypeBuilder::new(TypeInfo::class("Widget").build()).method(
                Callable::method("Draw", vec![], HostType::void(), |_, _| Ok(HostValue::Null)),
            ))
            .unwrap();
        let provider = MemoizedProvider::new(registry);

        assert!(provider.member(&ty, "Draw", false).is_some());
        assert!(provider.member(&ty, "Draw", false).is_some());
        assert!(provider.member(&ty, "Nope", false).is_none());
        assert!(provider.member(&ty, "Nope", false).is_none());
        assert_eq!(provider.misses(), 2);

        assert_eq!(provider.methods(&ty, "Draw", false, 0).len(), 1);
        assert_eq!(provider.methods(&ty, "Draw", false, 0).len(), 1);
        assert_eq!(provider.misses(), 3);

        provider.clear();
        assert!(provider.member(&ty, "Draw", false).is_some());
        assert_eq!(provider.misses(), 4);
    }

    #[test]
    fn static_and_instance_lookups_are_cached_apart() {
        let mut registry = TypeRegistry::new();
        let ty = registry
            .register(TypeBuilder::new(TypeInfo::class("Gauge").build()).method(
                Callable::method("Read", vec![], HostType::void(), |_, _| Ok(HostValue::Null)),
            ))
            .unwrap();
        let provider = MemoizedProvider::new(registry);

        assert!(provider.member(&ty, "Read", false).is_some());
        assert!(provider.member(&ty, "Read", true).is_none());
        assert!(provider.member(&ty, "Read", true).is_none());
        assert!(provider.member(&ty, "Read", false).is_some());
        assert_eq!(provider.misses(), 2);

        assert_eq!(provider.methods(&ty, "Read", false, 0).len(), 1);
        assert_eq!(provider.methods(&ty, "Read", false, 1).len(), 0);
        assert_eq!(provider.methods(&ty, "Read", false, 0).len(), 1);
        assert_eq!(provider.misses(), 4);
    }
}
