//! Host values.
//!
//! [`HostValue`] is what host callables receive and return. Reference values
//! (objects, arrays, delegates) are shared through `Rc`, so boxing one into
//! the script runtime never copies it.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rust_decimal::Decimal;

use crate::member::Callable;
use crate::script_value::ScriptValue;
use crate::types::{HostType, PrimitiveKind};

/// A shared host object of a registered type.
///
/// Mutation goes through interior mutability inside the payload.
#[derive(Clone)]
pub struct HostObject {
    ty: HostType,
    data: Rc<dyn Any>,
    display: Option<fn(&dyn Any) -> String>,
}

fn render<T: Any + fmt::Display>(data: &dyn Any) -> String {
    data.downcast_ref::<T>()
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl HostObject {
    pub fn new<T: Any>(ty: HostType, data: T) -> Self {
        Self {
            ty,
            data: Rc::new(data),
            display: None,
        }
    }

    /// An object whose string form is its `Display` output.
    pub fn displayable<T: Any + fmt::Display>(ty: HostType, data: T) -> Self {
        Self {
            ty,
            data: Rc::new(data),
            display: Some(render::<T>),
        }
    }

    pub fn host_type(&self) -> &HostType {
        &self.ty
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &HostObject) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    pub fn to_display_string(&self) -> Option<String> {
        self.display.map(|render| render(self.data.as_ref()))
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostObject({}@{:p})", self.ty, Rc::as_ptr(&self.data))
    }
}

/// A host array. Elements are stored flat regardless of rank.
#[derive(Clone)]
pub struct HostArray {
    element: HostType,
    rank: usize,
    items: Rc<RefCell<Vec<HostValue>>>,
}

impl HostArray {
    pub fn new(element: HostType, items: Vec<HostValue>) -> Self {
        Self::with_rank(element, 1, items)
    }

    pub fn with_rank(element: HostType, rank: usize, items: Vec<HostValue>) -> Self {
        Self {
            element,
            rank: rank.max(1),
            items: Rc::new(RefCell::new(items)),
        }
    }

    pub fn element_type(&self) -> &HostType {
        &self.element
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn host_type(&self) -> HostType {
        HostType::array_with_rank(self.element.clone(), self.rank)
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<HostValue> {
        self.items.borrow().get(index).cloned()
    }

    /// Store `value` at `index`; returns false when out of bounds.
    pub fn set(&self, index: usize, value: HostValue) -> bool {
        match self.items.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn to_vec(&self) -> Vec<HostValue> {
        self.items.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &HostArray) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
    }
}

impl fmt::Debug for HostArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostArray")
            .field("type", &self.host_type())
            .field("len", &self.len())
            .finish()
    }
}

/// What a delegate calls.
#[derive(Clone, Debug)]
pub enum DelegateBody {
    /// A host callable, bound to `target` for instance methods.
    Host {
        callable: Callable,
        target: Option<HostValue>,
    },
    /// A script function wrapped for the host, e.g. an event handler.
    Script(ScriptValue),
}

/// A callable host object.
#[derive(Clone, Debug)]
pub struct Delegate {
    pub ty: HostType,
    pub body: DelegateBody,
}

impl Delegate {
    pub fn host(ty: HostType, callable: Callable, target: Option<HostValue>) -> Self {
        Self {
            ty,
            body: DelegateBody::Host { callable, target },
        }
    }

    pub fn script(ty: HostType, function: ScriptValue) -> Self {
        Self {
            ty,
            body: DelegateBody::Script(function),
        }
    }
}

/// A host-side value.
#[derive(Clone, Debug, Default)]
pub enum HostValue {
    #[default]
    Null,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    String(Rc<str>),
    Type(HostType),
    Object(HostObject),
    Array(HostArray),
    Delegate(Rc<Delegate>),
    /// A script function passed through to the host.
    Callback(ScriptValue),
}

impl HostValue {
    pub fn string(text: impl AsRef<str>) -> Self {
        HostValue::String(Rc::from(text.as_ref()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// The value of any integer width, widened.
    pub fn integral(&self) -> Option<i128> {
        Some(match self {
            HostValue::I8(v) => *v as i128,
            HostValue::I16(v) => *v as i128,
            HostValue::I32(v) => *v as i128,
            HostValue::I64(v) => *v as i128,
            HostValue::U8(v) => *v as i128,
            HostValue::U16(v) => *v as i128,
            HostValue::U32(v) => *v as i128,
            HostValue::U64(v) => *v as i128,
            _ => return None,
        })
    }

    /// The value of a binary float, widened.
    pub fn floating(&self) -> Option<f64> {
        match self {
            HostValue::F32(v) => Some(*v as f64),
            HostValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            HostValue::Bool(_) => PrimitiveKind::Bool,
            HostValue::Char(_) => PrimitiveKind::Char,
            HostValue::I8(_) => PrimitiveKind::Int8,
            HostValue::I16(_) => PrimitiveKind::Int16,
            HostValue::I32(_) => PrimitiveKind::Int32,
            HostValue::I64(_) => PrimitiveKind::Int64,
            HostValue::U8(_) => PrimitiveKind::Uint8,
            HostValue::U16(_) => PrimitiveKind::Uint16,
            HostValue::U32(_) => PrimitiveKind::Uint32,
            HostValue::U64(_) => PrimitiveKind::Uint64,
            HostValue::F32(_) => PrimitiveKind::Float32,
            HostValue::F64(_) => PrimitiveKind::Float64,
            HostValue::Decimal(_) => PrimitiveKind::Decimal,
            _ => return None,
        })
    }

    /// Runtime type of the value; `None` for null.
    pub fn host_type(&self) -> Option<HostType> {
        if let Some(kind) = self.primitive_kind() {
            return Some(HostType::primitive(kind));
        }
        match self {
            HostValue::String(_) => Some(HostType::string()),
            HostValue::Type(_) => Some(HostType::type_type()),
            HostValue::Object(object) => Some(object.host_type().clone()),
            HostValue::Array(array) => Some(array.host_type()),
            HostValue::Delegate(delegate) => Some(delegate.ty.clone()),
            HostValue::Callback(_) => Some(HostType::script_function()),
            _ => None,
        }
    }

    /// Whether the value can be used as-is where `target` is expected.
    pub fn is_instance_of(&self, target: &HostType) -> bool {
        self.host_type().is_some_and(|ty| ty.is_subtype_of(target))
    }

    /// String form of the value, if it has one.
    pub fn stringify(&self) -> Option<String> {
        match self {
            HostValue::Null => None,
            HostValue::Bool(v) => Some(v.to_string()),
            HostValue::Char(v) => Some(v.to_string()),
            HostValue::String(v) => Some(v.to_string()),
            HostValue::Decimal(v) => Some(v.to_string()),
            HostValue::F32(v) => Some(v.to_string()),
            HostValue::F64(v) => Some(v.to_string()),
            HostValue::Type(ty) => Some(ty.name().to_string()),
            HostValue::Object(object) => object.to_display_string(),
            HostValue::Array(array) => Some(array.host_type().name().to_string()),
            HostValue::Delegate(delegate) => Some(delegate.ty.name().to_string()),
            HostValue::Callback(_) => None,
            other => other.integral().map(|v| v.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&HostType> {
        match self {
            HostValue::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HostObject> {
        match self {
            HostValue::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Shortcut for `as_object()` followed by a downcast.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_object()?.downcast_ref::<T>()
    }
}

/// Primitives compare by value, reference values by identity.
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Char(a), HostValue::Char(b)) => a == b,
            (HostValue::I8(a), HostValue::I8(b)) => a == b,
            (HostValue::I16(a), HostValue::I16(b)) => a == b,
            (HostValue::I32(a), HostValue::I32(b)) => a == b,
            (HostValue::I64(a), HostValue::I64(b)) => a == b,
            (HostValue::U8(a), HostValue::U8(b)) => a == b,
            (HostValue::U16(a), HostValue::U16(b)) => a == b,
            (HostValue::U32(a), HostValue::U32(b)) => a == b,
            (HostValue::U64(a), HostValue::U64(b)) => a == b,
            (HostValue::F32(a), HostValue::F32(b)) => a == b,
            (HostValue::F64(a), HostValue::F64(b)) => a == b,
            (HostValue::Decimal(a), HostValue::Decimal(b)) => a == b,
            (HostValue::String(a), HostValue::String(b)) => a == b,
            (HostValue::Type(a), HostValue::Type(b)) => a == b,
            (HostValue::Object(a), HostValue::Object(b)) => a.ptr_eq(b),
            (HostValue::Array(a), HostValue::Array(b)) => a.ptr_eq(b),
            (HostValue::Delegate(a), HostValue::Delegate(b)) => Rc::ptr_eq(a, b),
            (HostValue::Callback(a), HostValue::Callback(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for HostValue {
                fn from(value: $ty) -> Self {
                    HostValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_primitive! {
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    HostType => Type,
    HostObject => Object,
    HostArray => Array,
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::string(value)
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::String(Rc::from(value))
    }
}

impl From<Delegate> for HostValue {
    fn from(value: Delegate) -> Self {
        HostValue::Delegate(Rc::new(value))
    }
}
