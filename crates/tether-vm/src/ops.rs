//! Script-level operations.
//!
//! What compiled script code does for `a.b`, `a.b = c`, `a + b`, `-a`,
//! `tostring(a)` and `a:m(...)`: primitive values are handled natively,
//! userdata are routed through their operation table.

use tracing::trace;

use tether_core::{Operation, ScriptError, ScriptState, ScriptValue};

use crate::vm::Vm;

fn unsupported(operation: &'static str, value: &ScriptValue) -> ScriptError {
    ScriptError::Unsupported {
        operation,
        type_name: value.type_tag().name(),
    }
}

fn describe(operation: Operation) -> &'static str {
    match operation {
        Operation::BAnd
        | Operation::BOr
        | Operation::BXor
        | Operation::Shl
        | Operation::Shr
        | Operation::BNot => "perform bitwise operation on",
        Operation::Eq | Operation::Lt | Operation::Le => "compare",
        _ => "perform arithmetic on",
    }
}

fn first(results: Vec<ScriptValue>) -> ScriptValue {
    results.into_iter().next().unwrap_or_default()
}

impl Vm {
    /// `target[key]`
    pub fn index(&mut self, target: &ScriptValue, key: &ScriptValue) -> Result<ScriptValue, ScriptError> {
        let handler = self
            .handler(target, Operation::Index)
            .ok_or_else(|| unsupported("index", target))?;
        trace!(?key, "index");
        Ok(first(self.call(&handler, vec![target.clone(), key.clone()])?))
    }

    /// `target[key] = value`
    pub fn set_index(
        &mut self,
        target: &ScriptValue,
        key: &ScriptValue,
        value: ScriptValue,
    ) -> Result<(), ScriptError> {
        let handler = self
            .handler(target, Operation::NewIndex)
            .ok_or_else(|| unsupported("index", target))?;
        trace!(?key, "set index");
        self.call(&handler, vec![target.clone(), key.clone(), value])?;
        Ok(())
    }

    /// `target:name(args...)`
    pub fn method_call(
        &mut self,
        target: &ScriptValue,
        name: &str,
        args: Vec<ScriptValue>,
    ) -> Result<Vec<ScriptValue>, ScriptError> {
        let method = self.index(target, &ScriptValue::string(name))?;
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(target.clone());
        full.extend(args);
        self.call(&method, full)
    }

    /// A binary operation: arithmetic, bitwise or comparison.
    pub fn arith(
        &mut self,
        operation: Operation,
        a: &ScriptValue,
        b: &ScriptValue,
    ) -> Result<ScriptValue, ScriptError> {
        if operation == Operation::Eq {
            return self.equals(a, b).map(ScriptValue::Boolean);
        }
        if let Some(result) = primitive_binary(operation, a, b) {
            return Ok(result);
        }
        let handler = self
            .handler(a, operation)
            .or_else(|| self.handler(b, operation))
            .ok_or_else(|| {
                let culprit = if a.as_userdata().is_some() || a.as_number().is_none() {
                    a
                } else {
                    b
                };
                unsupported(describe(operation), culprit)
            })?;
        let result = first(self.call(&handler, vec![a.clone(), b.clone()])?);
        Ok(match operation {
            Operation::Lt | Operation::Le => ScriptValue::Boolean(result.as_boolean()),
            _ => result,
        })
    }

    /// `a == b`: raw equality first, then `__eq` for two distinct userdata.
    pub fn equals(&mut self, a: &ScriptValue, b: &ScriptValue) -> Result<bool, ScriptError> {
        if a == b {
            return Ok(true);
        }
        if a.as_userdata().is_none() || b.as_userdata().is_none() {
            return Ok(false);
        }
        match self
            .handler(a, Operation::Eq)
            .or_else(|| self.handler(b, Operation::Eq))
        {
            Some(handler) => Ok(first(self.call(&handler, vec![a.clone(), b.clone()])?).as_boolean()),
            None => Ok(false),
        }
    }

    /// `-a` or `~a`.
    pub fn unary(&mut self, operation: Operation, a: &ScriptValue) -> Result<ScriptValue, ScriptError> {
        match (operation, a) {
            (Operation::Unm, ScriptValue::Integer(v)) => return Ok(ScriptValue::Integer(v.wrapping_neg())),
            (Operation::Unm, ScriptValue::Number(v)) => return Ok(ScriptValue::Number(-v)),
            (Operation::BNot, ScriptValue::Integer(v)) => return Ok(ScriptValue::Integer(!v)),
            _ => {}
        }
        let handler = self
            .handler(a, operation)
            .ok_or_else(|| unsupported(describe(operation), a))?;
        // unary metamethods receive the operand twice
        Ok(first(self.call(&handler, vec![a.clone(), a.clone()])?))
    }

    /// `tostring(value)`
    pub fn tostring(&mut self, value: &ScriptValue) -> Result<String, ScriptError> {
        if let Some(handler) = self.handler(value, Operation::ToString) {
            let result = first(self.call(&handler, vec![value.clone()])?);
            return result
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ScriptError::Raised("'__tostring' must return a string".into()));
        }
        Ok(match value {
            ScriptValue::Nil => "nil".to_string(),
            ScriptValue::Boolean(v) => v.to_string(),
            ScriptValue::Integer(v) => v.to_string(),
            ScriptValue::Number(v) if v.fract() == 0.0 && v.is_finite() => format!("{v:.1}"),
            ScriptValue::Number(v) => v.to_string(),
            ScriptValue::String(s) => s.to_string(),
            ScriptValue::Userdata(u) => format!("userdata: {}", u.id),
            ScriptValue::Function(f) => format!("{f:?}"),
        })
    }

    /// `getmetatable(value)`: operation tables are never exposed.
    pub fn get_metatable(&self, value: &ScriptValue) -> ScriptValue {
        match value.as_userdata() {
            Some(userdata) if self.table(userdata.table).is_some() => ScriptValue::Boolean(false),
            _ => ScriptValue::Nil,
        }
    }
}

fn primitive_binary(operation: Operation, a: &ScriptValue, b: &ScriptValue) -> Option<ScriptValue> {
    use ScriptValue::{Boolean, Integer, Number};

    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return match operation {
            Operation::Lt => Some(Boolean(x < y)),
            Operation::Le => Some(Boolean(x <= y)),
            _ => None,
        };
    }

    match (operation, a, b) {
        (Operation::Add, Integer(x), Integer(y)) => Some(Integer(x.wrapping_add(*y))),
        (Operation::Sub, Integer(x), Integer(y)) => Some(Integer(x.wrapping_sub(*y))),
        (Operation::Mul, Integer(x), Integer(y)) => Some(Integer(x.wrapping_mul(*y))),
        (Operation::Mod, Integer(x), Integer(y)) if *y != 0 => {
            Some(Integer(x.wrapping_rem(*y).wrapping_add(*y).wrapping_rem(*y)))
        }
        (Operation::Lt, Integer(x), Integer(y)) => Some(Boolean(x < y)),
        (Operation::Le, Integer(x), Integer(y)) => Some(Boolean(x <= y)),
        (
            Operation::BAnd | Operation::BOr | Operation::BXor | Operation::Shl | Operation::Shr,
            _,
            _,
        ) => {
            let (x, y) = (a.as_integer()?, b.as_integer()?);
            Some(Integer(match operation {
                Operation::BAnd => x & y,
                Operation::BOr => x | y,
                Operation::BXor => x ^ y,
                Operation::Shl => shift_left(x, y),
                _ => shift_left(x, y.wrapping_neg()),
            }))
        }
        _ => {
            let (x, y) = (a.as_number()?, b.as_number()?);
            match operation {
                Operation::Add => Some(Number(x + y)),
                Operation::Sub => Some(Number(x - y)),
                Operation::Mul => Some(Number(x * y)),
                Operation::Div => Some(Number(x / y)),
                Operation::Mod => Some(Number(x - (x / y).floor() * y)),
                Operation::Lt => Some(Boolean(x < y)),
                Operation::Le => Some(Boolean(x <= y)),
                _ => None,
            }
        }
    }
}

/// Logical shift; negative amounts shift right.
fn shift_left(x: i64, amount: i64) -> i64 {
    if amount <= -64 || amount >= 64 {
        0
    } else if amount >= 0 {
        ((x as u64) << amount) as i64
    } else {
        ((x as u64) >> -amount) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_arithmetic() {
        let mut vm = Vm::new();
        let add = vm
            .arith(Operation::Add, &ScriptValue::Integer(2), &ScriptValue::Integer(3))
            .unwrap();
        assert_eq!(add, ScriptValue::Integer(5));

        let div = vm
            .arith(Operation::Div, &ScriptValue::Integer(7), &ScriptValue::Integer(2))
            .unwrap();
        assert_eq!(div, ScriptValue::Number(3.5));

        let modulo = vm
            .arith(Operation::Mod, &ScriptValue::Integer(-1), &ScriptValue::Integer(3))
            .unwrap();
        assert_eq!(modulo, ScriptValue::Integer(2));

        let shifted = vm
            .arith(Operation::Shr, &ScriptValue::Integer(-1), &ScriptValue::Integer(60))
            .unwrap();
        assert_eq!(shifted, ScriptValue::Integer(15));
    }

    #[test]
    fn arithmetic_on_unsupported_values() {
        let mut vm = Vm::new();
        let err = vm
            .arith(Operation::Add, &ScriptValue::Boolean(true), &ScriptValue::Integer(1))
            .unwrap_err();
        assert_eq!(err.to_string(), "attempt to perform arithmetic on a boolean value");
    }

    #[test]
    fn tostring_formats_primitives() {
        let mut vm = Vm::new();
        assert_eq!(vm.tostring(&ScriptValue::Number(2.0)).unwrap(), "2.0");
        assert_eq!(vm.tostring(&ScriptValue::Number(2.5)).unwrap(), "2.5");
        assert_eq!(vm.tostring(&ScriptValue::Nil).unwrap(), "nil");
    }

    #[test]
    fn equality_without_handlers_is_raw() {
        let mut vm = Vm::new();
        assert!(vm.equals(&ScriptValue::Integer(1), &ScriptValue::Number(1.0)).unwrap());
        assert!(!vm.equals(&ScriptValue::from("a"), &ScriptValue::from("b")).unwrap());
    }
}
