//! Projection.

use crate::error::ExecResult;
use crate::eval::ExpressionEvaluator;
use crate::exec::{BoxedCursor, Cursor};
use crate::graph::View;
use crate::plan::Produce;
use crate::symbol::Frame;

/// Cursor for [`Produce`]: evaluates each named expression under the NEW
/// view and writes it to its output symbol. Streaming; projections run in
/// order, so a later one can read an earlier one's output.
pub(crate) struct ProduceCursor<'a> {
    self_: &'a Produce,
    input: BoxedCursor<'a>,
}

impl<'a> ProduceCursor<'a> {
    pub(crate) fn new(self_: &'a Produce, input: BoxedCursor<'a>) -> Self {
        Self { self_, input }
    }
}

impl<'a> Cursor for ProduceCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        if !self.input.pull(frame)? {
            return Ok(false);
        }
        for named in &self.self_.named_expressions {
            let value = ExpressionEvaluator::new(frame, View::New).eval(&named.expression)?;
            frame[&named.symbol] = value;
        }
        Ok(true)
    }

    fn reset(&mut self) {
        self.input.reset();
    }
}
