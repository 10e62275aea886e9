//! Registration errors.

use thiserror::Error;

/// Errors raised while registering host types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A type with this name already exists.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// Two non-method members share a name and static-ness.
    #[error("duplicate member: {type_name}.{member}")]
    DuplicateMember { type_name: String, member: String },

    /// An operator callable must be static.
    #[error("operator {operator} on {type_name} must be static")]
    OperatorNotStatic {
        type_name: String,
        operator: &'static str,
    },

    /// An operator callable has the wrong number of parameters.
    #[error("operator {operator} on {type_name} takes {expected} parameters, found {found}")]
    OperatorArity {
        type_name: String,
        operator: &'static str,
        expected: usize,
        found: usize,
    },

    /// Generic definitions need a factory describing their instances.
    #[error("generic type {0} has no instance factory")]
    MissingInstanceFactory(String),

    /// A variadic parameter must be the last one.
    #[error("variadic parameter of {callable} on {type_name} is not last")]
    MisplacedVariadic { type_name: String, callable: String },
}
