//! The interpreter binding.
//!
//! [`ScriptState`] is the primitive API the binder consumes: a value stack
//! addressed by frame slot or closure upvalue, native closures, userdata with
//! one of two operation tables attached, raw re-entrant invocation and the
//! one-shot loading of the two helper routines.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::ScriptError;
use crate::script_value::ScriptValue;

/// Generational index of a boxed host value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId {
    pub index: u32,
    pub generation: u32,
}

impl HandleId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Which of the two operation tables a userdata carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// Host objects: shared operations plus operators.
    Object,
    /// Host type descriptors: shared operations only.
    Type,
}

/// Script-level operations an operation table can handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Call,
    Index,
    NewIndex,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
    Eq,
    Lt,
    Le,
    Unm,
    BNot,
    Gc,
    ToString,
}

impl Operation {
    /// Operations shared by both tables.
    pub const SHARED: [Operation; 5] = [
        Operation::Call,
        Operation::Index,
        Operation::NewIndex,
        Operation::Gc,
        Operation::ToString,
    ];

    /// Binary operators carried by the object table.
    pub const BINARY: [Operation; 13] = [
        Operation::Add,
        Operation::Sub,
        Operation::Mul,
        Operation::Div,
        Operation::Mod,
        Operation::BAnd,
        Operation::BOr,
        Operation::BXor,
        Operation::Shl,
        Operation::Shr,
        Operation::Eq,
        Operation::Lt,
        Operation::Le,
    ];

    /// Unary operators carried by the object table.
    pub const UNARY: [Operation; 2] = [Operation::Unm, Operation::BNot];

    /// Metamethod name.
    pub const fn name(self) -> &'static str {
        match self {
            Operation::Call => "__call",
            Operation::Index => "__index",
            Operation::NewIndex => "__newindex",
            Operation::Add => "__add",
            Operation::Sub => "__sub",
            Operation::Mul => "__mul",
            Operation::Div => "__div",
            Operation::Mod => "__mod",
            Operation::BAnd => "__band",
            Operation::BOr => "__bor",
            Operation::BXor => "__bxor",
            Operation::Shl => "__shl",
            Operation::Shr => "__shr",
            Operation::Eq => "__eq",
            Operation::Lt => "__lt",
            Operation::Le => "__le",
            Operation::Unm => "__unm",
            Operation::BNot => "__bnot",
            Operation::Gc => "__gc",
            Operation::ToString => "__tostring",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position of a value visible to a running native function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackIndex {
    /// 1-based position in the current frame.
    Slot(usize),
    /// 1-based upvalue of the running closure.
    Upvalue(usize),
}

/// Helper routines installed by one-shot snippet execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Helper {
    /// `wrap(f)` returns a function that calls `f` and raises its message
    /// when the leading flag is false, otherwise returns the remaining results.
    ErrorRouter,
    /// `wrap(f)` returns an index handler that consults a per-target cache
    /// holding no strong reference to the target, calls `f(target, key)`
    /// on a miss and stores the result when `f` reports it cacheable.
    IndexCache,
}

/// A host function callable from script code.
///
/// Reads its arguments from `Slot(1..=top)`, leaves its results on top of the
/// stack and returns how many there are.
pub type NativeFunction = Rc<dyn Fn(&mut dyn ScriptState) -> usize>;

/// Operation name to handler mapping attached to userdata.
#[derive(Debug, Clone, Default)]
pub struct OperationTable {
    handlers: FxHashMap<Operation, ScriptValue>,
}

impl OperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, operation: Operation, handler: ScriptValue) {
        self.handlers.insert(operation, handler);
    }

    pub fn get(&self, operation: Operation) -> Option<&ScriptValue> {
        self.handlers.get(&operation)
    }

    pub fn contains(&self, operation: Operation) -> bool {
        self.handlers.contains_key(&operation)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// The embedded interpreter as seen by the binder.
pub trait ScriptState {
    /// Number of values in the current frame.
    fn top(&self) -> usize;

    /// Truncate the current frame, or pad it with nil.
    fn set_top(&mut self, top: usize);

    fn push(&mut self, value: ScriptValue);

    /// Read a slot or upvalue; out of range positions read as nil.
    fn get(&self, index: StackIndex) -> ScriptValue;

    /// Number of upvalues of the running closure.
    fn upvalue_count(&self) -> usize;

    fn new_closure(&mut self, function: NativeFunction, upvalues: Vec<ScriptValue>) -> ScriptValue;

    /// Create a full userdata carrying `handle` with the `table` attached.
    fn new_userdata(&mut self, handle: HandleId, table: TableKind) -> ScriptValue;

    /// Install an operation table. Tables are installed once per interpreter.
    fn install_table(&mut self, kind: TableKind, table: OperationTable);

    fn has_table(&self, kind: TableKind) -> bool;

    /// Raw invocation; may re-enter native functions.
    fn call(
        &mut self,
        function: &ScriptValue,
        args: Vec<ScriptValue>,
    ) -> Result<Vec<ScriptValue>, ScriptError>;

    /// Run the snippet defining `helper` and return its wrapping factory.
    fn load_helper(&mut self, helper: Helper) -> Result<ScriptValue, ScriptError>;

    /// All values of the current frame, bottom first.
    fn arguments(&self) -> Vec<ScriptValue> {
        (1..=self.top())
            .map(|slot| self.get(StackIndex::Slot(slot)))
            .collect()
    }
}
