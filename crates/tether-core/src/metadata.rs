//! The metadata provider interface.

use crate::error::ConstraintViolation;
use crate::member::{CandidateSet, Member};
use crate::operator::OperatorName;
use crate::types::HostType;

/// Reflection metadata lookups the binder performs per dispatch.
///
/// Lookups on a type include members inherited from its base types.
pub trait MetadataProvider {
    /// Member named `name` with the given static-ness.
    fn member(&self, ty: &HostType, name: &str, is_static: bool) -> Option<Member>;

    /// Constructor overloads, in declaration order.
    fn constructors(&self, ty: &HostType) -> CandidateSet;

    /// Methods named `name` with exactly `type_arg_count` type parameters
    /// (0 selects the non-generic overloads).
    fn methods(&self, ty: &HostType, name: &str, is_static: bool, type_arg_count: usize) -> CandidateSet;

    /// Operators declared on `ty` under `operator`'s canonical name.
    fn operators(&self, ty: &HostType, operator: OperatorName) -> CandidateSet;

    /// Close the generic definition `definition` over `args`.
    fn make_generic_type(
        &self,
        definition: &HostType,
        args: &[HostType],
    ) -> Result<HostType, ConstraintViolation>;
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for std::rc::Rc<P> {
    fn member(&self, ty: &HostType, name: &str, is_static: bool) -> Option<Member> {
        (**self).member(ty, name, is_static)
    }

    fn constructors(&self, ty: &HostType) -> CandidateSet {
        (**self).constructors(ty)
    }

    fn methods(&self, ty: &HostType, name: &str, is_static: bool, type_arg_count: usize) -> CandidateSet {
        (**self).methods(ty, name, is_static, type_arg_count)
    }

    fn operators(&self, ty: &HostType, operator: OperatorName) -> CandidateSet {
        (**self).operators(ty, operator)
    }

    fn make_generic_type(
        &self,
        definition: &HostType,
        args: &[HostType],
    ) -> Result<HostType, ConstraintViolation> {
        (**self).make_generic_type(definition, args)
    }
}
