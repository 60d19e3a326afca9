//! Entity deletion.

use crate::error::{ExecError, ExecResult};
use crate::eval::ExpressionEvaluator;
use crate::exec::{BoxedCursor, Cursor};
use crate::graph::{DynGraph, RecordAccessor, View};
use crate::plan::Delete;
use crate::symbol::Frame;
use crate::value::Value;

/// Cursor for [`Delete`].
///
/// All expressions are evaluated first, then edges are deleted before
/// vertices: an edge named in the same DELETE must not block its vertex.
/// Deleting Null is a no-op (failed optional match); deleting anything
/// other than an entity is a runtime error.
pub(crate) struct DeleteCursor<'a> {
    self_: &'a Delete,
    db: DynGraph,
    input: BoxedCursor<'a>,
}

impl<'a> DeleteCursor<'a> {
    pub(crate) fn new(self_: &'a Delete, db: DynGraph, input: BoxedCursor<'a>) -> Self {
        Self { self_, db, input }
    }
}

impl<'a> Cursor for DeleteCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        if !self.input.pull(frame)? {
            return Ok(false);
        }

        // Deletion sees the statement's own changes, so newly created
        // entities can be deleted too.
        let mut results = Vec::with_capacity(self.self_.expressions.len());
        for expression in &self.self_.expressions {
            results.push(ExpressionEvaluator::new(frame, View::New).eval(expression)?);
        }

        // Edges first.
        for result in &results {
            if let Value::Edge(edge) = result {
                self.db.remove_edge(edge.id())?;
            }
        }

        for result in &results {
            match result {
                Value::Vertex(vertex) => {
                    // An edge deletion above may have updated the vertex.
                    let mut vertex = vertex.clone();
                    vertex.switch(View::New);
                    if self.self_.detach {
                        self.db.remove_vertex(vertex.id(), true)?;
                    } else if !self.db.remove_vertex(vertex.id(), false)? {
                        return Err(ExecError::runtime(
                            "failed to remove vertex because of its existing connections; \
                             consider using DETACH DELETE",
                        ));
                    }
                }
                // Edges are already gone; Null comes from optional match.
                Value::Edge(_) | Value::Null => {}
                _ => return Err(ExecError::runtime("only edges and vertices can be deleted")),
            }
        }
        Ok(true)
    }

    fn reset(&mut self) {
        self.input.reset();
    }
}
