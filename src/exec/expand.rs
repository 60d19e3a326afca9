//! Edge expansion and the pattern uniqueness filter.

use crate::error::{ExecError, ExecResult};
use crate::exec::{expect_vertex, BoxedCursor, Cursor};
use crate::graph::{Direction, DynGraph, EdgeAccessor, RecordAccessor};
use crate::plan::{Expand, ExpandUniquenessFilter, UniquenessKind};
use crate::symbol::Frame;
use crate::value::Value;

/// Cursor for [`Expand`]: per input row, one output row per incident edge
/// of the origin vertex.
///
/// The in- and out-iterators belong to one input row and are rebuilt when
/// both run dry. With direction `Both`, a self-loop appears in both
/// sequences; the in-pass emits it and the out-pass skips it.
pub(crate) struct ExpandCursor<'a> {
    self_: &'a Expand,
    db: DynGraph,
    input: BoxedCursor<'a>,
    in_edges: Option<std::vec::IntoIter<EdgeAccessor>>,
    out_edges: Option<std::vec::IntoIter<EdgeAccessor>>,
}

impl<'a> ExpandCursor<'a> {
    pub(crate) fn new(self_: &'a Expand, db: DynGraph, input: BoxedCursor<'a>) -> Self {
        Self { self_, db, input, in_edges: None, out_edges: None }
    }

    /// Pulls the next input row and rebuilds the edge iterators from its
    /// origin vertex. `Ok(false)` when the input is exhausted; a Null
    /// origin leaves the iterators empty so the caller moves on.
    fn init_edges(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        if !self.input.pull(frame)? {
            return Ok(false);
        }

        let vertex_value = &frame[&self.self_.input_symbol];
        // A Null origin comes from a failed optional match; that row
        // expands to nothing.
        if vertex_value.is_null() {
            self.in_edges = None;
            self.out_edges = None;
            return Ok(true);
        }
        let mut vertex = expect_vertex(vertex_value, &self.self_.input_symbol)?;
        vertex.switch(self.self_.view);

        self.in_edges = match self.self_.direction {
            Direction::In | Direction::Both => Some(vertex.in_edges()?.into_iter()),
            Direction::Out => None,
        };
        self.out_edges = match self.self_.direction {
            Direction::Out | Direction::Both => Some(vertex.out_edges()?.into_iter()),
            Direction::In => None,
        };
        Ok(true)
    }

    /// Binds or matches the edge symbol. A non-match filters the row.
    fn handle_edge(&self, edge: &EdgeAccessor, frame: &mut Frame) -> ExecResult<bool> {
        if self.self_.existing_edge {
            let bound = &frame[&self.self_.edge_symbol];
            if bound.is_null() {
                return Ok(false);
            }
            let bound = crate::exec::expect_edge(bound, &self.self_.edge_symbol)?;
            Ok(bound == *edge)
        } else {
            frame[&self.self_.edge_symbol] = Value::Edge(edge.clone());
            Ok(true)
        }
    }

    /// Binds or matches the far endpoint reached through `edge`.
    fn handle_node(
        &self,
        edge: &EdgeAccessor,
        direction: Direction,
        frame: &mut Frame,
    ) -> ExecResult<bool> {
        let node = match direction {
            Direction::In => edge.from(),
            Direction::Out => edge.to(),
            Direction::Both => unreachable!("expansion emits edges with an exact direction"),
        };
        if self.self_.existing_node {
            let bound = &frame[&self.self_.node_symbol];
            if bound.is_null() {
                return Ok(false);
            }
            let bound = expect_vertex(bound, &self.self_.node_symbol)?;
            Ok(bound == node)
        } else {
            frame[&self.self_.node_symbol] = Value::Vertex(node);
            Ok(true)
        }
    }
}

impl<'a> Cursor for ExpandCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        loop {
            if self.db.should_abort() {
                return Err(ExecError::Aborted);
            }

            if let Some(edge) = self.in_edges.as_mut().and_then(Iterator::next) {
                if self.handle_edge(&edge, frame)? && self.handle_node(&edge, Direction::In, frame)?
                {
                    return Ok(true);
                }
                continue;
            }

            if let Some(edge) = self.out_edges.as_mut().and_then(Iterator::next) {
                // In a Both expansion a self-loop was already emitted by
                // the in-edges pass.
                if self.self_.direction == Direction::Both && edge.is_loop() {
                    continue;
                }
                if self.handle_edge(&edge, frame)?
                    && self.handle_node(&edge, Direction::Out, frame)?
                {
                    return Ok(true);
                }
                continue;
            }

            if !self.init_edges(frame)? {
                return Ok(false);
            }
        }
    }

    fn reset(&mut self) {
        self.input.reset();
        self.in_edges = None;
        self.out_edges = None;
    }
}

/// Cursor for [`ExpandUniquenessFilter`]: rejects rows whose freshly
/// expanded handle equals any previously bound one.
pub(crate) struct ExpandUniquenessFilterCursor<'a> {
    self_: &'a ExpandUniquenessFilter,
    input: BoxedCursor<'a>,
}

impl<'a> ExpandUniquenessFilterCursor<'a> {
    pub(crate) fn new(self_: &'a ExpandUniquenessFilter, input: BoxedCursor<'a>) -> Self {
        Self { self_, input }
    }

    fn expansion_ok(&self, frame: &Frame) -> ExecResult<bool> {
        // The planner guarantees these slots hold the filter's kind.
        match self.self_.kind {
            UniquenessKind::Vertex => {
                let current = expect_vertex(&frame[&self.self_.expand_symbol], &self.self_.expand_symbol)?;
                for symbol in &self.self_.previous_symbols {
                    if expect_vertex(&frame[symbol], symbol)? == current {
                        return Ok(false);
                    }
                }
            }
            UniquenessKind::Edge => {
                let current =
                    crate::exec::expect_edge(&frame[&self.self_.expand_symbol], &self.self_.expand_symbol)?;
                for symbol in &self.self_.previous_symbols {
                    if crate::exec::expect_edge(&frame[symbol], symbol)? == current {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }
}

impl<'a> Cursor for ExpandUniquenessFilterCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        while self.input.pull(frame)? {
            if self.expansion_ok(frame)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn reset(&mut self) {
        self.input.reset();
    }
}
