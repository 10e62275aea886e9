//! Closing generic types and methods over type arguments supplied by scripts.

use tracing::debug;

use tether_core::{BindError, Callable, CandidateSet, HostType, HostValue};

use crate::binder::BinderInner;

/// Type arguments must be type handles of closed types.
fn type_arguments(
    values: &[HostValue],
    non_type: &'static str,
    open_type: &'static str,
) -> Result<Vec<HostType>, BindError> {
    values
        .iter()
        .map(|value| match value {
            HostValue::Type(ty) if ty.contains_generic_parameters() => Err(BindError::InvalidArgs(open_type)),
            HostValue::Type(ty) => Ok(ty.clone()),
            _ => Err(BindError::InvalidArgs(non_type)),
        })
        .collect()
}

impl BinderInner {
    /// `List(int)`: close `definition` over the supplied type handles.
    pub(crate) fn construct_generic_type(
        &self,
        definition: &HostType,
        values: &[HostValue],
    ) -> Result<HostType, BindError> {
        if values.len() != definition.generic_args().len() {
            return Err(BindError::InvalidArgs(
                "construct generic type with incorrect number of type args",
            ));
        }
        let args = type_arguments(
            values,
            "construct generic type with non-type arg",
            "construct generic type with generic type arg",
        )?;
        self.provider(definition)
            .make_generic_type(definition, &args)
            .map_err(|violation| {
                debug!(%definition, %violation, "generic type constraint violated");
                BindError::ConstraintViolation("construct generic type")
            })
    }

    /// Instantiate every candidate; candidates violating a constraint drop out.
    pub(crate) fn instantiate_methods(
        &self,
        candidates: &[Callable],
        values: &[HostValue],
    ) -> Result<CandidateSet, BindError> {
        let args = type_arguments(
            values,
            "construct generic method with non-type arg",
            "construct generic method with generic type arg",
        )?;
        let instantiated: CandidateSet = candidates
            .iter()
            .filter_map(|candidate| match candidate.instantiate(&args) {
                Ok(method) => Some(method),
                Err(violation) => {
                    debug!(method = candidate.name(), %violation, "generic method constraint violated");
                    None
                }
            })
            .collect();
        if instantiated.is_empty() {
            return Err(BindError::ConstraintViolation("construct generic method"));
        }
        Ok(instantiated)
    }
}
