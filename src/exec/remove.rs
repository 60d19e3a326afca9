//! Property and label removal, dual to the Set operators.

use crate::error::{ExecError, ExecResult};
use crate::eval::ExpressionEvaluator;
use crate::exec::{expect_vertex, BoxedCursor, Cursor};
use crate::graph::{RecordAccessor, View};
use crate::plan::{RemoveLabels, RemoveProperty};
use crate::symbol::Frame;
use crate::value::Value;

/// Cursor for [`RemoveProperty`]: erases one property from the entity the
/// lookup expression names. Null target is a no-op.
pub(crate) struct RemovePropertyCursor<'a> {
    self_: &'a RemoveProperty,
    input: BoxedCursor<'a>,
}

impl<'a> RemovePropertyCursor<'a> {
    pub(crate) fn new(self_: &'a RemoveProperty, input: BoxedCursor<'a>) -> Self {
        Self { self_, input }
    }
}

impl<'a> Cursor for RemovePropertyCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        if !self.input.pull(frame)? {
            return Ok(false);
        }

        let target = ExpressionEvaluator::new(frame, View::New).eval(&self.self_.lhs_expression)?;
        match target {
            Value::Vertex(vertex) => vertex.erase_property(self.self_.property)?,
            Value::Edge(edge) => edge.erase_property(self.self_.property)?,
            Value::Null => {}
            _ => {
                return Err(ExecError::runtime(
                    "properties can only be removed from vertices and edges",
                ))
            }
        }
        Ok(true)
    }

    fn reset(&mut self) {
        self.input.reset();
    }
}

/// Cursor for [`RemoveLabels`]: removes labels from the bound vertex,
/// idempotently. Null target is a no-op.
pub(crate) struct RemoveLabelsCursor<'a> {
    self_: &'a RemoveLabels,
    input: BoxedCursor<'a>,
}

impl<'a> RemoveLabelsCursor<'a> {
    pub(crate) fn new(self_: &'a RemoveLabels, input: BoxedCursor<'a>) -> Self {
        Self { self_, input }
    }
}

impl<'a> Cursor for RemoveLabelsCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        if !self.input.pull(frame)? {
            return Ok(false);
        }

        let value = &frame[&self.self_.input_symbol];
        if value.is_null() {
            return Ok(true);
        }
        let vertex = expect_vertex(value, &self.self_.input_symbol)?;
        for label in &self.self_.labels {
            vertex.remove_label(*label)?;
        }
        Ok(true)
    }

    fn reset(&mut self) {
        self.input.reset();
    }
}
