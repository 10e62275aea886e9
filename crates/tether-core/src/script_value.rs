//! Values as seen by the embedded script runtime.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::state::{HandleId, TableKind};

/// Type tag of a script value, as reported by the interpreter's type query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Nil,
    Boolean,
    Number,
    String,
    Userdata,
    Function,
}

impl TypeTag {
    pub const fn name(self) -> &'static str {
        match self {
            TypeTag::Nil => "nil",
            TypeTag::Boolean => "boolean",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Userdata => "userdata",
            TypeTag::Function => "function",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Full userdata carrying a handle into the binder's registry.
///
/// `id` is unique per userdata instance for the lifetime of the interpreter;
/// the handle may be shared with nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Userdata {
    pub id: u64,
    pub handle: HandleId,
    pub table: TableKind,
}

/// Opaque interpreter function value.
///
/// The interpreter decides what lives inside; identity is by pointer.
#[derive(Clone)]
pub struct ScriptFunction(Rc<dyn Any>);

impl ScriptFunction {
    pub fn new<T: Any>(body: T) -> Self {
        Self(Rc::new(body))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &ScriptFunction) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function: {:p}", Rc::as_ptr(&self.0))
    }
}

/// A script runtime value.
#[derive(Clone, Default)]
pub enum ScriptValue {
    #[default]
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(Rc<str>),
    Userdata(Userdata),
    Function(ScriptFunction),
}

impl ScriptValue {
    pub fn string(text: impl AsRef<str>) -> Self {
        ScriptValue::String(Rc::from(text.as_ref()))
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            ScriptValue::Nil => TypeTag::Nil,
            ScriptValue::Boolean(_) => TypeTag::Boolean,
            ScriptValue::Integer(_) | ScriptValue::Number(_) => TypeTag::Number,
            ScriptValue::String(_) => TypeTag::String,
            ScriptValue::Userdata(_) => TypeTag::Userdata,
            ScriptValue::Function(_) => TypeTag::Function,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, ScriptValue::Nil)
    }

    /// Integer conversion: integers, and floats with an exact integral value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ScriptValue::Integer(v) => Some(*v),
            ScriptValue::Number(v)
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 =>
            {
                Some(*v as i64)
            }
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Integer(v) => Some(*v as f64),
            ScriptValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Truthiness: only nil and false are false.
    pub fn as_boolean(&self) -> bool {
        !matches!(self, ScriptValue::Nil | ScriptValue::Boolean(false))
    }

    pub fn as_userdata(&self) -> Option<Userdata> {
        match self {
            ScriptValue::Userdata(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&ScriptFunction> {
        match self {
            ScriptValue::Function(f) => Some(f),
            _ => None,
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Nil => write!(f, "nil"),
            ScriptValue::Boolean(v) => write!(f, "{v}"),
            ScriptValue::Integer(v) => write!(f, "{v}"),
            ScriptValue::Number(v) => write!(f, "{v:?}"),
            ScriptValue::String(s) => write!(f, "{s:?}"),
            ScriptValue::Userdata(u) => write!(f, "userdata#{}", u.id),
            ScriptValue::Function(func) => write!(f, "{func:?}"),
        }
    }
}

/// Raw equality: numbers compare by value, reference values by identity.
impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptValue::Nil, ScriptValue::Nil) => true,
            (ScriptValue::Boolean(a), ScriptValue::Boolean(b)) => a == b,
            (ScriptValue::Integer(a), ScriptValue::Integer(b)) => a == b,
            (ScriptValue::Number(a), ScriptValue::Number(b)) => a == b,
            (ScriptValue::Integer(a), ScriptValue::Number(b))
            | (ScriptValue::Number(b), ScriptValue::Integer(a)) => *a as f64 == *b,
            (ScriptValue::String(a), ScriptValue::String(b)) => a == b,
            (ScriptValue::Userdata(a), ScriptValue::Userdata(b)) => a.id == b.id,
            (ScriptValue::Function(a), ScriptValue::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Boolean(value)
    }
}

impl From<i64> for ScriptValue {
    fn from(value: i64) -> Self {
        ScriptValue::Integer(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Number(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::string(value)
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::String(Rc::from(value))
    }
}
