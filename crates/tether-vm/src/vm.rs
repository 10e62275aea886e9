//! The reference interpreter state.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use tether_core::{
    HandleId, Helper, NativeFunction, Operation, OperationTable, ScriptError, ScriptFunction,
    ScriptState, ScriptValue, StackIndex, TableKind, Userdata,
};

/// Default limit of nested calls before "stack overflow" is raised.
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// A function written in "script": a Rust closure driving the interpreter.
pub type ScriptBody = Rc<dyn Fn(&mut Vm, Vec<ScriptValue>) -> Result<Vec<ScriptValue>, ScriptError>>;

#[derive(Clone)]
pub(crate) enum FunctionBody {
    Native {
        function: NativeFunction,
        upvalues: Rc<[ScriptValue]>,
    },
    /// Produced by the error router: re-raises a leading `false`.
    Routed(ScriptValue),
    /// Produced by the index cache helper.
    CachedIndex(ScriptValue),
    /// The `wrap` function a helper snippet evaluates to.
    Factory(Helper),
    Script(ScriptBody),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Name(Rc<str>),
    Integer(i64),
}

impl CacheKey {
    fn from_value(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::String(name) => Some(CacheKey::Name(name.clone())),
            ScriptValue::Integer(i) => Some(CacheKey::Integer(*i)),
            _ => None,
        }
    }
}

struct Frame {
    base: usize,
    upvalues: Rc<[ScriptValue]>,
}

/// A small single-threaded interpreter implementing [`ScriptState`].
///
/// It has no parser: "script code" is written as Rust closures through
/// [`Vm::function`] and the script-level operations (`index`, `arith`,
/// `method_call`, ...) a compiled script would perform.
pub struct Vm {
    stack: Vec<ScriptValue>,
    frames: Vec<Frame>,
    tables: FxHashMap<TableKind, OperationTable>,
    next_userdata: u64,
    live_userdata: FxHashMap<u64, Userdata>,
    /// Per-target lookup cache keyed by userdata id; holds no reference to the target.
    index_cache: FxHashMap<u64, FxHashMap<CacheKey, ScriptValue>>,
    max_depth: usize,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            frames: Vec::new(),
            tables: FxHashMap::default(),
            next_userdata: 1,
            live_userdata: FxHashMap::default(),
            index_cache: FxHashMap::default(),
            max_depth,
        }
    }

    /// Define a script function.
    pub fn function<F>(&mut self, body: F) -> ScriptValue
    where
        F: Fn(&mut Vm, Vec<ScriptValue>) -> Result<Vec<ScriptValue>, ScriptError> + 'static,
    {
        wrap(FunctionBody::Script(Rc::new(body)))
    }

    /// Total number of values on the stack, across all frames.
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Number of userdata not yet collected.
    pub fn live_userdata(&self) -> usize {
        self.live_userdata.len()
    }

    /// Number of cached lookups held for `target`.
    pub fn cached_lookups(&self, target: &ScriptValue) -> usize {
        target
            .as_userdata()
            .and_then(|u| self.index_cache.get(&u.id))
            .map_or(0, FxHashMap::len)
    }

    pub(crate) fn table(&self, kind: TableKind) -> Option<&OperationTable> {
        self.tables.get(&kind)
    }

    /// Handler for `operation` attached to `value`, if it is a userdata.
    pub(crate) fn handler(&self, value: &ScriptValue, operation: Operation) -> Option<ScriptValue> {
        let userdata = value.as_userdata()?;
        self.table(userdata.table)?.get(operation).cloned()
    }

    /// Simulate the collector reclaiming `value`: drop its cached lookups and
    /// run its finalizer. Returns false if it was already collected.
    pub fn collect(&mut self, value: &ScriptValue) -> bool {
        let Some(userdata) = value.as_userdata() else {
            return false;
        };
        if self.live_userdata.remove(&userdata.id).is_none() {
            return false;
        }
        self.index_cache.remove(&userdata.id);
        debug!(userdata = userdata.id, "collected userdata");
        if let Some(finalizer) = self.handler(value, Operation::Gc)
            && let Err(error) = self.call(&finalizer, vec![value.clone()])
        {
            debug!(%error, "finalizer raised");
        }
        true
    }

    /// Invoke the finalizer of `value` directly, bypassing liveness tracking.
    pub fn run_finalizer(&mut self, value: &ScriptValue) -> Result<(), ScriptError> {
        match self.handler(value, Operation::Gc) {
            Some(finalizer) => self.call(&finalizer, vec![value.clone()]).map(|_| ()),
            None => Ok(()),
        }
    }

    fn frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    fn base(&self) -> usize {
        self.frame().map_or(0, |frame| frame.base)
    }

    fn enter(&mut self, upvalues: Rc<[ScriptValue]>) -> Result<usize, ScriptError> {
        if self.frames.len() >= self.max_depth {
            return Err(ScriptError::StackOverflow);
        }
        let base = self.stack.len();
        self.frames.push(Frame { base, upvalues });
        Ok(base)
    }

    fn leave(&mut self, base: usize) {
        self.frames.pop();
        self.stack.truncate(base);
    }

    fn call_native(
        &mut self,
        function: &NativeFunction,
        upvalues: Rc<[ScriptValue]>,
        args: Vec<ScriptValue>,
    ) -> Result<Vec<ScriptValue>, ScriptError> {
        let base = self.enter(upvalues)?;
        self.stack.extend(args);
        let count = function(self);
        let top = self.stack.len() - base;
        let results = self.stack.split_off(self.stack.len() - count.min(top));
        self.leave(base);
        Ok(results)
    }

    fn call_script(
        &mut self,
        body: &ScriptBody,
        args: Vec<ScriptValue>,
    ) -> Result<Vec<ScriptValue>, ScriptError> {
        let base = self.enter(Rc::from(Vec::new()))?;
        let result = body(self, args);
        self.leave(base);
        result
    }

    fn call_routed(
        &mut self,
        inner: &ScriptValue,
        args: Vec<ScriptValue>,
    ) -> Result<Vec<ScriptValue>, ScriptError> {
        let mut results = self.call(inner, args)?.into_iter();
        let ok = results.next().unwrap_or_default();
        if ok.as_boolean() {
            Ok(results.collect())
        } else {
            Err(raised(results.next()))
        }
    }

    fn call_cached_index(
        &mut self,
        inner: &ScriptValue,
        args: Vec<ScriptValue>,
    ) -> Result<Vec<ScriptValue>, ScriptError> {
        let target = args.first().cloned().unwrap_or_default();
        let key = args.get(1).cloned().unwrap_or_default();
        let slot = target
            .as_userdata()
            .map(|u| u.id)
            .zip(CacheKey::from_value(&key));

        if let Some((id, cache_key)) = &slot
            && let Some(value) = self.index_cache.get(id).and_then(|c| c.get(cache_key))
        {
            trace!(userdata = id, ?key, "index cache hit");
            return Ok(vec![value.clone()]);
        }

        let mut results = self.call(inner, vec![target, key])?.into_iter();
        let ok = results.next().unwrap_or_default();
        if !ok.as_boolean() {
            return Err(raised(results.next()));
        }
        let cacheable = results.next().unwrap_or_default().as_boolean();
        let value = results.next().unwrap_or_default();
        if cacheable
            && let Some((id, cache_key)) = slot
            && self.live_userdata.contains_key(&id)
        {
            self.index_cache
                .entry(id)
                .or_default()
                .insert(cache_key, value.clone());
        }
        Ok(vec![value])
    }
}

fn raised(message: Option<ScriptValue>) -> ScriptError {
    let text = match message {
        Some(ScriptValue::String(text)) => text.to_string(),
        Some(other) => format!("{other:?}"),
        None => "nil".to_string(),
    };
    ScriptError::Raised(text)
}

pub(crate) fn wrap(body: FunctionBody) -> ScriptValue {
    ScriptValue::Function(ScriptFunction::new(body))
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("stack", &self.stack.len())
            .field("frames", &self.frames.len())
            .field("live_userdata", &self.live_userdata.len())
            .finish_non_exhaustive()
    }
}

impl ScriptState for Vm {
    fn top(&self) -> usize {
        self.stack.len() - self.base()
    }

    fn set_top(&mut self, top: usize) {
        let len = self.base() + top;
        self.stack.resize(len, ScriptValue::Nil);
    }

    fn push(&mut self, value: ScriptValue) {
        self.stack.push(value);
    }

    fn get(&self, index: StackIndex) -> ScriptValue {
        let value = match index {
            StackIndex::Slot(0) | StackIndex::Upvalue(0) => None,
            StackIndex::Slot(slot) => self.stack.get(self.base() + slot - 1),
            StackIndex::Upvalue(slot) => self.frame().and_then(|f| f.upvalues.get(slot - 1)),
        };
        value.cloned().unwrap_or_default()
    }

    fn upvalue_count(&self) -> usize {
        self.frame().map_or(0, |frame| frame.upvalues.len())
    }

    fn new_closure(&mut self, function: NativeFunction, upvalues: Vec<ScriptValue>) -> ScriptValue {
        wrap(FunctionBody::Native {
            function,
            upvalues: Rc::from(upvalues),
        })
    }

    fn new_userdata(&mut self, handle: HandleId, table: TableKind) -> ScriptValue {
        let userdata = Userdata {
            id: self.next_userdata,
            handle,
            table,
        };
        self.next_userdata += 1;
        self.live_userdata.insert(userdata.id, userdata);
        ScriptValue::Userdata(userdata)
    }

    fn install_table(&mut self, kind: TableKind, table: OperationTable) {
        debug!(?kind, operations = table.len(), "installed operation table");
        self.tables.insert(kind, table);
    }

    fn has_table(&self, kind: TableKind) -> bool {
        self.tables.contains_key(&kind)
    }

    fn call(
        &mut self,
        function: &ScriptValue,
        args: Vec<ScriptValue>,
    ) -> Result<Vec<ScriptValue>, ScriptError> {
        if let ScriptValue::Userdata(_) = function {
            let handler = self.handler(function, Operation::Call).ok_or(ScriptError::Unsupported {
                operation: "call",
                type_name: "userdata",
            })?;
            let mut full = Vec::with_capacity(args.len() + 1);
            full.push(function.clone());
            full.extend(args);
            return self.call(&handler, full);
        }

        let body = function
            .as_function()
            .and_then(|f| f.downcast_ref::<FunctionBody>())
            .cloned()
            .ok_or(ScriptError::Unsupported {
                operation: "call",
                type_name: function.type_tag().name(),
            })?;

        match body {
            FunctionBody::Native { function, upvalues } => self.call_native(&function, upvalues, args),
            FunctionBody::Routed(inner) => self.call_routed(&inner, args),
            FunctionBody::CachedIndex(inner) => self.call_cached_index(&inner, args),
            FunctionBody::Script(body) => self.call_script(&body, args),
            FunctionBody::Factory(helper) => {
                let inner = args.into_iter().next().unwrap_or_default();
                if inner.as_function().is_none() {
                    return Err(ScriptError::Raised(
                        "bad argument #1 to 'wrap' (function expected)".into(),
                    ));
                }
                let wrapped = match helper {
                    Helper::ErrorRouter => FunctionBody::Routed(inner),
                    Helper::IndexCache => FunctionBody::CachedIndex(inner),
                };
                Ok(vec![wrap(wrapped)])
            }
        }
    }

    fn load_helper(&mut self, helper: Helper) -> Result<ScriptValue, ScriptError> {
        Ok(wrap(FunctionBody::Factory(helper)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(f: impl Fn(&mut dyn ScriptState) -> usize + 'static) -> NativeFunction {
        Rc::new(f)
    }

    #[test]
    fn native_reads_slots_and_upvalues() {
        let mut vm = Vm::new();
        let add = vm.new_closure(
            native(|state| {
                let a = state.get(StackIndex::Slot(1)).as_integer().unwrap_or(0);
                let b = state.get(StackIndex::Upvalue(1)).as_integer().unwrap_or(0);
                state.push(ScriptValue::Integer(a + b));
                1
            }),
            vec![ScriptValue::Integer(10)],
        );
        let results = vm.call(&add, vec![ScriptValue::Integer(5)]).unwrap();
        assert_eq!(results, vec![ScriptValue::Integer(15)]);
        assert_eq!(vm.stack_len(), 0);
    }

    #[test]
    fn set_top_truncates_and_pads() {
        let mut vm = Vm::new();
        let f = vm.new_closure(
            native(|state| {
                state.set_top(1);
                state.set_top(3);
                assert_eq!(state.top(), 3);
                assert!(state.get(StackIndex::Slot(3)).is_nil());
                3
            }),
            vec![],
        );
        let results = vm
            .call(&f, vec![ScriptValue::Integer(1), ScriptValue::Integer(2)])
            .unwrap();
        assert_eq!(
            results,
            vec![ScriptValue::Integer(1), ScriptValue::Nil, ScriptValue::Nil]
        );
    }

    #[test]
    fn error_router_raises_on_false_flag() {
        let mut vm = Vm::new();
        let factory = vm.load_helper(Helper::ErrorRouter).unwrap();
        let failing = vm.new_closure(
            native(|state| {
                state.push(ScriptValue::Boolean(false));
                state.push(ScriptValue::from("attempt to do a thing"));
                2
            }),
            vec![],
        );
        let wrapped = vm.call(&factory, vec![failing]).unwrap().remove(0);
        assert_eq!(
            vm.call(&wrapped, vec![]),
            Err(ScriptError::Raised("attempt to do a thing".into()))
        );
        assert_eq!(vm.stack_len(), 0);

        let passing = vm.new_closure(
            native(|state| {
                state.push(ScriptValue::Boolean(true));
                state.push(ScriptValue::Integer(1));
                state.push(ScriptValue::Integer(2));
                3
            }),
            vec![],
        );
        let wrapped = vm.call(&factory, vec![passing]).unwrap().remove(0);
        assert_eq!(
            vm.call(&wrapped, vec![]).unwrap(),
            vec![ScriptValue::Integer(1), ScriptValue::Integer(2)]
        );
    }

    #[test]
    fn depth_limit() {
        let mut vm = Vm::with_max_depth(4);
        let recurse = vm.function(|vm, args| {
            let me = args[0].clone();
            vm.call(&me, vec![me.clone()])
        });
        assert_eq!(
            vm.call(&recurse, vec![recurse.clone()]),
            Err(ScriptError::StackOverflow)
        );
        assert_eq!(vm.stack_len(), 0);
    }

    #[test]
    fn calling_non_functions_fails() {
        let mut vm = Vm::new();
        assert_eq!(
            vm.call(&ScriptValue::Integer(1), vec![]),
            Err(ScriptError::Unsupported {
                operation: "call",
                type_name: "number"
            })
        );
    }
}
