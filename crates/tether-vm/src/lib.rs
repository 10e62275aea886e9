//! A reference interpreter for the tether binding layer.
//!
//! [`Vm`] implements [`ScriptState`](tether_core::ScriptState) with a value
//! stack, call frames, native closures with upvalues, userdata carrying one
//! of two operation tables, the error-router and index-cache helper routines,
//! and a simulated collector. Embedders without a native interpreter and the
//! test-suite drive the binder through it.

mod ops;
mod vm;

pub use vm::{DEFAULT_MAX_DEPTH, ScriptBody, Vm};
