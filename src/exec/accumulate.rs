//! Row accumulation across a command boundary.

use crate::error::{ExecError, ExecResult};
use crate::exec::{BoxedCursor, Cursor};
use crate::graph::{DynGraph, RecordAccessor};
use crate::plan::Accumulate;
use crate::symbol::Frame;
use crate::value::Value;

/// Cursor for [`Accumulate`].
///
/// Blocking: the first pull drains the input into a row cache of the
/// declared symbols. When `advance_command` is set, the command clock
/// advances and every cached accessor is reconstructed; accessors that are
/// no longer visible stay on the frame and fail on their next use, which
/// is what reports mutation-after-delete.
pub(crate) struct AccumulateCursor<'a> {
    self_: &'a Accumulate,
    db: DynGraph,
    input: BoxedCursor<'a>,
    cache: Vec<Vec<Value>>,
    next: usize,
    pulled_all_input: bool,
}

impl<'a> AccumulateCursor<'a> {
    pub(crate) fn new(self_: &'a Accumulate, db: DynGraph, input: BoxedCursor<'a>) -> Self {
        Self { self_, db, input, cache: Vec::new(), next: 0, pulled_all_input: false }
    }
}

/// Re-resolves every accessor inside the value under the current command.
/// Invisible accessors are kept; their next use raises.
fn reconstruct_value(value: &mut Value) {
    match value {
        Value::Vertex(vertex) => {
            vertex.reconstruct();
        }
        Value::Edge(edge) => {
            edge.reconstruct();
        }
        Value::List(elements) => {
            for element in elements {
                reconstruct_value(element);
            }
        }
        Value::Map(entries) => {
            for element in entries.values_mut() {
                reconstruct_value(element);
            }
        }
        Value::Path(path) => {
            path.reconstruct();
        }
        _ => {}
    }
}

impl<'a> Cursor for AccumulateCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        if !self.pulled_all_input {
            while self.input.pull(frame)? {
                if self.db.should_abort() {
                    return Err(ExecError::Aborted);
                }
                let row: Vec<Value> =
                    self.self_.symbols.iter().map(|symbol| frame[symbol].clone()).collect();
                self.cache.push(row);
            }
            self.pulled_all_input = true;

            if self.self_.advance_command {
                self.db.advance_command();
                for row in &mut self.cache {
                    for value in row {
                        reconstruct_value(value);
                    }
                }
            }
        }

        if self.next >= self.cache.len() {
            return Ok(false);
        }
        let row = std::mem::take(&mut self.cache[self.next]);
        self.next += 1;
        for (symbol, value) in self.self_.symbols.iter().zip(row) {
            frame[symbol] = value;
        }
        Ok(true)
    }

    fn reset(&mut self) {
        self.input.reset();
        self.cache.clear();
        self.next = 0;
        self.pulled_all_input = false;
    }
}
