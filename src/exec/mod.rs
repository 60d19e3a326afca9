//! Operator cursors.
//!
//! Every logical operator compiles to a cursor with two operations:
//! [`Cursor::pull`] advances by one row, updating the operator's output
//! symbols on the frame, and [`Cursor::reset`] restores the pre-first-pull
//! state, recursively resetting input cursors.
//!
//! Cursors poll `should_abort` before potentially long steps (scan
//! advances, expansion steps, blocking drains) and raise
//! [`crate::ExecError::Aborted`] when it fires.

pub mod accumulate;
pub mod aggregate;
pub mod create;
pub mod delete;
pub mod distinct;
pub mod executor;
pub mod expand;
pub mod filter;
pub mod index;
pub mod limit;
pub mod merge;
pub mod project;
pub mod remove;
pub mod scan;
pub mod set;
pub mod sort;
pub mod unwind;

use crate::error::{ExecError, ExecResult};
use crate::graph::{EdgeAccessor, VertexAccessor};
use crate::symbol::{Frame, Symbol};
use crate::value::Value;

/// One operator's runtime behavior.
pub trait Cursor {
    /// Advances by one row. On `true` the frame holds this operator's
    /// output symbols; after the first `false`, every further pull returns
    /// `false` until [`Cursor::reset`].
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool>;

    /// Restores the cursor (and its inputs) to the pre-first-pull state.
    fn reset(&mut self);
}

/// A boxed cursor borrowing its plan.
pub type BoxedCursor<'a> = Box<dyn Cursor + 'a>;

/// Reads a frame slot that must hold a vertex.
pub(crate) fn expect_vertex(value: &Value, symbol: &Symbol) -> ExecResult<VertexAccessor> {
    match value {
        Value::Vertex(vertex) => Ok(vertex.clone()),
        other => Err(ExecError::type_error(format!(
            "expected a Vertex for '{}', got {}",
            symbol.name(),
            other.type_name()
        ))),
    }
}

/// Reads a frame slot that must hold an edge.
pub(crate) fn expect_edge(value: &Value, symbol: &Symbol) -> ExecResult<EdgeAccessor> {
    match value {
        Value::Edge(edge) => Ok(edge.clone()),
        other => Err(ExecError::type_error(format!(
            "expected an Edge for '{}', got {}",
            symbol.name(),
            other.type_name()
        ))),
    }
}
