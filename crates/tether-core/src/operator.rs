//! Canonical host operator names.
//!
//! Host types declare operators as static methods under these names. The
//! binder maps script operations onto them when building candidate sets.

use std::fmt;

use crate::state::Operation;

/// Operators a host type can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorName {
    /// `a + b`
    Addition,
    /// `a - b`
    Subtraction,
    /// `a * b`
    Multiply,
    /// `a / b`
    Division,
    /// `a % b`
    Modulus,
    /// `a & b`
    BitwiseAnd,
    /// `a | b`
    BitwiseOr,
    /// `a ^ b`
    ExclusiveOr,
    /// `a << b`
    LeftShift,
    /// `a >> b`
    RightShift,
    /// `a == b`
    Equality,
    /// `a < b`
    LessThan,
    /// `a <= b`
    LessThanOrEqual,
    /// `-a`
    UnaryNegation,
    /// `~a`
    OnesComplement,
}

impl OperatorName {
    /// The canonical method name, e.g. `op_Addition`.
    pub const fn canonical(self) -> &'static str {
        match self {
            OperatorName::Addition => "op_Addition",
            OperatorName::Subtraction => "op_Subtraction",
            OperatorName::Multiply => "op_Multiply",
            OperatorName::Division => "op_Division",
            OperatorName::Modulus => "op_Modulus",
            OperatorName::BitwiseAnd => "op_BitwiseAnd",
            OperatorName::BitwiseOr => "op_BitwiseOr",
            OperatorName::ExclusiveOr => "op_ExclusiveOr",
            OperatorName::LeftShift => "op_LeftShift",
            OperatorName::RightShift => "op_RightShift",
            OperatorName::Equality => "op_Equality",
            OperatorName::LessThan => "op_LessThan",
            OperatorName::LessThanOrEqual => "op_LessThanOrEqual",
            OperatorName::UnaryNegation => "op_UnaryNegation",
            OperatorName::OnesComplement => "op_OnesComplement",
        }
    }

    /// Operator implementing a script operation, if any.
    pub const fn for_operation(operation: Operation) -> Option<Self> {
        Some(match operation {
            Operation::Add => OperatorName::Addition,
            Operation::Sub => OperatorName::Subtraction,
            Operation::Mul => OperatorName::Multiply,
            Operation::Div => OperatorName::Division,
            Operation::Mod => OperatorName::Modulus,
            Operation::BAnd => OperatorName::BitwiseAnd,
            Operation::BOr => OperatorName::BitwiseOr,
            Operation::BXor => OperatorName::ExclusiveOr,
            Operation::Shl => OperatorName::LeftShift,
            Operation::Shr => OperatorName::RightShift,
            Operation::Eq => OperatorName::Equality,
            Operation::Lt => OperatorName::LessThan,
            Operation::Le => OperatorName::LessThanOrEqual,
            Operation::Unm => OperatorName::UnaryNegation,
            Operation::BNot => OperatorName::OnesComplement,
            _ => return None,
        })
    }

    /// Whether the operator takes a single operand.
    pub const fn is_unary(self) -> bool {
        matches!(
            self,
            OperatorName::UnaryNegation | OperatorName::OnesComplement
        )
    }
}

impl fmt::Display for OperatorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}
