//! Overload resolution over a candidate set.

use tether_core::{Callable, HostValue};

use crate::coerce::coerce_signature;

/// The winning candidate and its bound arguments.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub callable: Callable,
    pub arguments: Vec<HostValue>,
    pub score: i64,
}

/// Pick the best-scoring candidate for `values`.
///
/// Only a strictly higher score replaces the current best, so the earliest
/// candidate wins a tie. Returns `None` when no candidate accepts the values.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn resolve_best(values: &[HostValue], candidates: &[Callable]) -> Option<Resolution> {
    let mut best: Option<Resolution> = None;
    for candidate in candidates {
        let Some(bound) = coerce_signature(values, candidate.params()) else {
            continue;
        };
        if best.as_ref().is_none_or(|current| bound.score > current.score) {
            best = Some(Resolution {
                callable: candidate.clone(),
                arguments: bound.arguments,
                score: bound.score,
            });
        }
    }
    best
}
