//! Host type descriptors.
//!
//! A [`HostType`] is a cheap, shareable handle to an immutable [`TypeInfo`].
//! Two descriptors are equal when their [`TypeHash`]es are equal, so generic
//! instances and wrapper types can be rebuilt on demand and still compare equal.

use std::fmt;
use std::sync::{Arc, LazyLock};

use bitflags::bitflags;

use super::PrimitiveKind;
use crate::TypeHash;

bitflags! {
    /// Flags describing the shape of a host type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        /// Instances are values (cannot be null unless nullable).
        const VALUE_TYPE = 1 << 0;
        /// The type cannot be instantiated directly.
        const ABSTRACT = 1 << 1;
        /// An unbound generic type definition, e.g. `List<T>`.
        const GENERIC_DEFINITION = 1 << 2;
    }
}

/// Structural kind of a host type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// The root type every non-void type derives from.
    Object,
    Void,
    Primitive(PrimitiveKind),
    String,
    /// The type of type descriptors themselves.
    Type,
    Class,
    Interface,
    Delegate,
    Array { element: HostType, rank: usize },
    Nullable(HostType),
    ByRef(HostType),
    /// A placeholder in a generic definition.
    GenericParam { position: usize },
}

/// Immutable description of a host type.
#[derive(Debug)]
pub struct TypeInfo {
    hash: TypeHash,
    name: String,
    kind: TypeKind,
    flags: TypeFlags,
    base: Option<HostType>,
    interfaces: Vec<HostType>,
    generic_args: Vec<HostType>,
    definition: Option<HostType>,
}

impl TypeInfo {
    fn with_kind(name: String, hash: TypeHash, kind: TypeKind, flags: TypeFlags) -> Self {
        Self {
            hash,
            name,
            kind,
            flags,
            base: None,
            interfaces: Vec::new(),
            generic_args: Vec::new(),
            definition: None,
        }
    }

    fn named(name: impl Into<String>, kind: TypeKind, flags: TypeFlags) -> Self {
        let name = name.into();
        let hash = TypeHash::from_name(&name);
        Self::with_kind(name, hash, kind, flags)
    }

    /// Describe a reference (class) type.
    pub fn class(name: impl Into<String>) -> Self {
        Self::named(name, TypeKind::Class, TypeFlags::empty())
    }

    /// Describe a user-defined value type.
    pub fn value_type(name: impl Into<String>) -> Self {
        Self::named(name, TypeKind::Class, TypeFlags::VALUE_TYPE)
    }

    /// Describe an interface.
    pub fn interface(name: impl Into<String>) -> Self {
        Self::named(name, TypeKind::Interface, TypeFlags::ABSTRACT)
    }

    /// Describe a delegate (callable object) type.
    pub fn delegate(name: impl Into<String>) -> Self {
        Self::named(name, TypeKind::Delegate, TypeFlags::empty())
    }

    /// Describe an unbound generic class, e.g. `generic_definition("List", &["T"])`.
    pub fn generic_definition(name: impl Into<String>, params: &[&str]) -> Self {
        let simple = name.into();
        let hash = TypeHash::from_name(&format!("{simple}`{}", params.len()));
        let display = format!("{simple}<{}>", params.join(", "));
        let mut info = Self::with_kind(
            display,
            hash,
            TypeKind::Class,
            TypeFlags::GENERIC_DEFINITION,
        );
        info.generic_args = params
            .iter()
            .enumerate()
            .map(|(position, param)| HostType::generic_param(*param, position))
            .collect();
        info
    }

    /// Set the base type.
    pub fn with_base(mut self, base: HostType) -> Self {
        self.base = Some(base);
        self
    }

    /// Add an implemented interface.
    pub fn with_interface(mut self, interface: HostType) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Add flags.
    pub fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags.insert(flags);
        self
    }

    /// Mark the type abstract.
    pub fn abstract_type(self) -> Self {
        self.with_flags(TypeFlags::ABSTRACT)
    }

    /// Finish the description.
    pub fn build(self) -> HostType {
        HostType(Arc::new(self))
    }
}

/// Shared handle to a host type descriptor.
#[derive(Clone)]
pub struct HostType(Arc<TypeInfo>);

struct Builtins {
    object: HostType,
    void: HostType,
    string: HostType,
    type_type: HostType,
    script_function: HostType,
    primitives: Vec<HostType>,
}

static BUILTINS: LazyLock<Builtins> = LazyLock::new(|| Builtins {
    object: TypeInfo::named("object", TypeKind::Object, TypeFlags::empty()).build(),
    void: TypeInfo::named("void", TypeKind::Void, TypeFlags::empty()).build(),
    string: TypeInfo::named("string", TypeKind::String, TypeFlags::empty()).build(),
    type_type: TypeInfo::named("Type", TypeKind::Type, TypeFlags::ABSTRACT).build(),
    script_function: TypeInfo::class("ScriptFunction").build(),
    primitives: PrimitiveKind::ALL
        .iter()
        .map(|kind| {
            TypeInfo::named(
                kind.name(),
                TypeKind::Primitive(*kind),
                TypeFlags::VALUE_TYPE,
            )
            .build()
        })
        .collect(),
});

impl HostType {
    /// The root object type.
    pub fn object() -> Self {
        BUILTINS.object.clone()
    }

    /// The void type (used as a return type only).
    pub fn void() -> Self {
        BUILTINS.void.clone()
    }

    /// The string type.
    pub fn string() -> Self {
        BUILTINS.string.clone()
    }

    /// The type of type descriptors.
    pub fn type_type() -> Self {
        BUILTINS.type_type.clone()
    }

    /// The type of script functions handed to the host.
    pub fn script_function() -> Self {
        BUILTINS.script_function.clone()
    }

    /// The descriptor of a primitive kind.
    pub fn primitive(kind: PrimitiveKind) -> Self {
        BUILTINS.primitives[kind.index()].clone()
    }

    /// A single-dimension array of `element`.
    pub fn array_of(element: HostType) -> Self {
        Self::array_with_rank(element, 1)
    }

    /// An array of `element` with `rank` dimensions.
    pub fn array_with_rank(element: HostType, rank: usize) -> Self {
        let tag = format!("[{}]", ",".repeat(rank.saturating_sub(1)));
        let hash = TypeHash::from_wrapper(&tag, element.hash());
        let name = format!("{}{tag}", element.name());
        TypeInfo::with_kind(
            name,
            hash,
            TypeKind::Array {
                element,
                rank: rank.max(1),
            },
            TypeFlags::empty(),
        )
        .build()
    }

    /// `inner?`: a value type that additionally admits null.
    pub fn nullable_of(inner: HostType) -> Self {
        let hash = TypeHash::from_wrapper("?", inner.hash());
        let name = format!("{}?", inner.name());
        TypeInfo::with_kind(
            name,
            hash,
            TypeKind::Nullable(inner),
            TypeFlags::VALUE_TYPE,
        )
        .build()
    }

    /// `inner&`: a by-reference parameter type.
    pub fn by_ref(inner: HostType) -> Self {
        let hash = TypeHash::from_wrapper("&", inner.hash());
        let name = format!("{}&", inner.name());
        TypeInfo::with_kind(name, hash, TypeKind::ByRef(inner), TypeFlags::empty()).build()
    }

    /// A generic parameter placeholder.
    pub fn generic_param(name: &str, position: usize) -> Self {
        let hash = TypeHash::from_name(&format!("!{position}:{name}"));
        TypeInfo::with_kind(
            name.to_string(),
            hash,
            TypeKind::GenericParam { position },
            TypeFlags::empty(),
        )
        .build()
    }

    /// Build the closed instance of `definition` for `args`.
    ///
    /// Constraint checking is the metadata provider's job; this only builds
    /// the descriptor.
    pub fn instantiate(definition: &HostType, args: Vec<HostType>) -> Self {
        let hashes: Vec<TypeHash> = args.iter().map(HostType::hash).collect();
        let hash = TypeHash::from_generic_instance(definition.hash(), &hashes);
        let simple = definition
            .name()
            .split('<')
            .next()
            .unwrap_or(definition.name());
        let names: Vec<&str> = args.iter().map(HostType::name).collect();
        let name = format!("{simple}<{}>", names.join(", "));

        let mut flags = definition.flags();
        flags.remove(TypeFlags::GENERIC_DEFINITION);
        let mut info = TypeInfo::with_kind(name, hash, definition.kind().clone(), flags);
        info.base = definition.base().cloned();
        info.interfaces = definition.interfaces().to_vec();
        info.generic_args = args;
        info.definition = Some(definition.clone());
        info.build()
    }

    pub fn hash(&self) -> TypeHash {
        self.0.hash
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    pub fn flags(&self) -> TypeFlags {
        self.0.flags
    }

    pub fn base(&self) -> Option<&HostType> {
        self.0.base.as_ref()
    }

    pub fn interfaces(&self) -> &[HostType] {
        &self.0.interfaces
    }

    /// Type arguments of an instance, or parameter placeholders of a definition.
    pub fn generic_args(&self) -> &[HostType] {
        &self.0.generic_args
    }

    /// The generic definition this type was instantiated from.
    pub fn definition(&self) -> Option<&HostType> {
        self.0.definition.as_ref()
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.kind() {
            TypeKind::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_value_type(&self) -> bool {
        self.flags().contains(TypeFlags::VALUE_TYPE)
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self.kind(), TypeKind::Nullable(_))
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind(), TypeKind::Interface)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags().contains(TypeFlags::ABSTRACT) || self.is_interface()
    }

    pub fn is_generic_definition(&self) -> bool {
        self.flags().contains(TypeFlags::GENERIC_DEFINITION)
    }

    /// Number of type parameters of a generic definition (0 otherwise).
    pub fn generic_arity(&self) -> usize {
        if self.is_generic_definition() {
            self.generic_args().len()
        } else {
            0
        }
    }

    /// Whether any unbound generic parameter appears in this type.
    pub fn contains_generic_parameters(&self) -> bool {
        if self.is_generic_definition() {
            return true;
        }
        match self.kind() {
            TypeKind::GenericParam { .. } => true,
            TypeKind::Array { element, .. } => element.contains_generic_parameters(),
            TypeKind::Nullable(inner) | TypeKind::ByRef(inner) => {
                inner.contains_generic_parameters()
            }
            _ => self
                .generic_args()
                .iter()
                .any(HostType::contains_generic_parameters),
        }
    }

    pub fn element_type(&self) -> Option<&HostType> {
        match self.kind() {
            TypeKind::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    pub fn array_rank(&self) -> Option<usize> {
        match self.kind() {
            TypeKind::Array { rank, .. } => Some(*rank),
            _ => None,
        }
    }

    /// The underlying type of a nullable, or `self`.
    pub fn unwrap_nullable(&self) -> &HostType {
        match self.kind() {
            TypeKind::Nullable(inner) => inner,
            _ => self,
        }
    }

    /// The referenced type of a by-reference type, or `self`.
    pub fn unwrap_by_ref(&self) -> &HostType {
        match self.kind() {
            TypeKind::ByRef(inner) => inner,
            _ => self,
        }
    }

    pub fn is_by_ref(&self) -> bool {
        matches!(self.kind(), TypeKind::ByRef(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind(), TypeKind::Void)
    }

    /// Whether a value of `self` may be used where `other` is expected.
    pub fn is_subtype_of(&self, other: &HostType) -> bool {
        if self == other {
            return true;
        }
        if matches!(other.kind(), TypeKind::Object) {
            return !self.is_void();
        }
        if let (
            TypeKind::Array {
                element: from,
                rank: from_rank,
            },
            TypeKind::Array {
                element: to,
                rank: to_rank,
            },
        ) = (self.kind(), other.kind())
        {
            // reference element types are covariant, value element types are not
            return from_rank == to_rank && !from.is_value_type() && from.is_subtype_of(to);
        }
        self.base().is_some_and(|base| base.is_subtype_of(other))
            || self.interfaces().iter().any(|i| i.is_subtype_of(other))
    }
}

impl PartialEq for HostType {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for HostType {}

impl std::hash::Hash for HostType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash.hash(state);
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostType({})", self.name())
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<TypeInfo> for HostType {
    fn from(info: TypeInfo) -> Self {
        info.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_shared() {
        assert_eq!(HostType::object(), HostType::object());
        assert_eq!(
            HostType::primitive(PrimitiveKind::Int32).name(),
            "int"
        );
        assert!(HostType::primitive(PrimitiveKind::Int32).is_value_type());
        assert!(!HostType::string().is_value_type());
    }

    #[test]
    fn nullable_is_value_type_but_admits_null() {
        let nullable = HostType::nullable_of(HostType::primitive(PrimitiveKind::Int32));
        assert!(nullable.is_value_type());
        assert!(nullable.is_nullable());
        assert_eq!(nullable.unwrap_nullable().name(), "int");
        assert_eq!(nullable.name(), "int?");
    }

    #[test]
    fn subtype_walks_base_and_interfaces() {
        let shape = TypeInfo::interface("IShape").build();
        let base = TypeInfo::class("Base").build();
        let derived = TypeInfo::class("Derived")
            .with_base(base.clone())
            .with_interface(shape.clone())
            .build();

        assert!(derived.is_subtype_of(&base));
        assert!(derived.is_subtype_of(&shape));
        assert!(derived.is_subtype_of(&HostType::object()));
        assert!(!base.is_subtype_of(&derived));
    }

    #[test]
    fn array_covariance_only_for_reference_elements() {
        let base = TypeInfo::class("Base").build();
        let derived = TypeInfo::class("Derived").with_base(base.clone()).build();
        assert!(HostType::array_of(derived).is_subtype_of(&HostType::array_of(base)));

        let long = HostType::primitive(PrimitiveKind::Int64);
        let object = HostType::object();
        assert!(!HostType::array_of(long).is_subtype_of(&HostType::array_of(object)));
    }

    #[test]
    fn generic_instances_compare_structurally() {
        let list = TypeInfo::generic_definition("List", &["T"]).build();
        assert!(list.is_generic_definition());
        assert_eq!(list.generic_arity(), 1);
        assert!(list.contains_generic_parameters());
        assert_eq!(list.name(), "List<T>");

        let int = HostType::primitive(PrimitiveKind::Int32);
        let a = HostType::instantiate(&list, vec![int.clone()]);
        let b = HostType::instantiate(&list, vec![int]);
        assert_eq!(a, b);
        assert_eq!(a.name(), "List<int>");
        assert!(!a.is_generic_definition());
        assert!(!a.contains_generic_parameters());
        assert_eq!(a.definition(), Some(&list));
    }

    #[test]
    fn array_rank_and_names() {
        let int = HostType::primitive(PrimitiveKind::Int32);
        let grid = HostType::array_with_rank(int.clone(), 2);
        assert_eq!(grid.array_rank(), Some(2));
        assert_eq!(grid.name(), "int[,]");
        assert_ne!(grid, HostType::array_of(int));
    }
}
