//! Arithmetic, bitwise and comparison operators on boxed objects.

use tracing::trace;

use tether_core::{
    BindError, CandidateSet, HostType, Operation, OperatorName, ScriptState, StackIndex,
};

use crate::binder::BinderInner;
use crate::coerce::coerce_signature;
use crate::overload::resolve_best;

fn binary_action(operation: Operation) -> &'static str {
    match operation {
        Operation::BAnd | Operation::BOr | Operation::BXor | Operation::Shl | Operation::Shr => {
            "perform bitwise operation on two objects"
        }
        Operation::Eq | Operation::Lt | Operation::Le => "compare two objects",
        _ => "perform arithmetic on two objects",
    }
}

fn unary_action(operation: Operation) -> &'static str {
    match operation {
        Operation::BNot => "perform bitwise operation on an object",
        _ => "perform arithmetic on an object",
    }
}

fn operator_for(operation: Operation) -> Result<OperatorName, BindError> {
    OperatorName::for_operation(operation)
        .ok_or_else(|| BindError::UnexpectedHostFailure(format!("{operation} has no operator")))
}

impl BinderInner {
    /// Both operands contribute their declared operators.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn binary(&self, state: &mut dyn ScriptState, operation: Operation) -> Result<usize, BindError> {
        let operator = operator_for(operation)?;
        let action = binary_action(operation);
        let operands = self.host_args(state, 1, 2);

        let left = operands[0].host_type();
        let right = operands[1].host_type();
        let mut candidates = CandidateSet::new();
        if let Some(ty) = &left {
            candidates.extend(self.provider(ty).operators(ty, operator));
        }
        if let Some(ty) = &right
            && left.as_ref() != Some(ty)
        {
            candidates.extend(self.provider(ty).operators(ty, operator));
        }
        trace!(%operator, candidates = candidates.len(), "binary operator");

        let resolution = resolve_best(&operands, &candidates).ok_or(BindError::InvalidArgs(action))?;
        let mut arguments = resolution.arguments;
        let result = resolution
            .callable
            .invoke(None, &mut arguments)
            .map_err(|e| BindError::host(action, e))?;
        Ok(self.push_value(state, result))
    }

    /// Exactly one operator must be declared on the operand's type.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn unary(&self, state: &mut dyn ScriptState, operation: Operation) -> Result<usize, BindError> {
        let operator = operator_for(operation)?;
        let action = unary_action(operation);
        let operand = self.to_host(&state.get(StackIndex::Slot(1)));

        let ty = operand.host_type().unwrap_or_else(HostType::object);
        let candidates = self.provider(&ty).operators(&ty, operator);
        trace!(%operator, candidates = candidates.len(), "unary operator");
        let [callable] = candidates.as_slice() else {
            return Err(BindError::InvalidArgs(action));
        };

        let bound = coerce_signature(std::slice::from_ref(&operand), callable.params())
            .ok_or(BindError::InvalidArgs(action))?;
        let mut arguments = bound.arguments;
        let result = callable
            .invoke(None, &mut arguments)
            .map_err(|e| BindError::host(action, e))?;
        Ok(self.push_value(state, result))
    }
}
