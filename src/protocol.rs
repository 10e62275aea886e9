//! The guarded call convention every dispatch entry point runs under.
//!
//! A guarded native function never raises. On success it leaves `true`
//! followed by its results; on failure it unwinds its own pushes and leaves
//! `false` plus the error message. The interpreter-side router installed at
//! setup turns the `false` case into a real script error.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{trace, warn};

use tether_core::{BindError, Operation, ScriptState, ScriptValue};

/// Run `body` with the success/failure flag protocol.
///
/// `body` receives the state and the number of arguments it was called with,
/// pushes its results and returns their count.
pub(crate) fn guarded<F>(state: &mut dyn ScriptState, operation: Operation, body: F) -> usize
where
    F: FnOnce(&mut dyn ScriptState, usize) -> Result<usize, BindError>,
{
    let argc = state.top();
    state.push(ScriptValue::Boolean(true));

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut *state, argc)));
    let error = match outcome {
        Ok(Ok(count)) => return count + 1,
        Ok(Err(error)) => error,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(%operation, %message, "host panicked during dispatch");
            BindError::UnexpectedHostFailure(message)
        }
    };

    trace!(%operation, kind = ?error.kind(), "dispatch failed");
    state.set_top(argc);
    state.push(ScriptValue::Boolean(false));
    state.push(ScriptValue::string(error.to_string()));
    2
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
