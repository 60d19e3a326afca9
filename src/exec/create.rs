//! Vertex and edge creation.

use crate::error::ExecResult;
use crate::eval::ExpressionEvaluator;
use crate::exec::{expect_vertex, BoxedCursor, Cursor};
use crate::graph::{
    Direction, DynGraph, EdgeAccessor, PropertyValue, RecordAccessor, VertexAccessor, View,
};
use crate::plan::{CreateExpand, CreateNode, NodeSpec};
use crate::symbol::Frame;
use crate::value::Value;

/// Creates one vertex from a node pattern and binds it to the pattern's
/// symbol. Property initializers run under the NEW view so they observe
/// the statement's own writes.
fn create_vertex(node: &NodeSpec, db: &DynGraph, frame: &mut Frame) -> ExecResult<VertexAccessor> {
    let vertex = VertexAccessor::new(db.insert_vertex(), View::New, db.clone());
    for label in &node.labels {
        vertex.add_label(*label)?;
    }
    for (property, expression) in &node.properties {
        let value = ExpressionEvaluator::new(frame, View::New).eval(expression)?;
        vertex.set_property(*property, PropertyValue::try_from(&value)?)?;
    }
    frame[&node.symbol] = Value::Vertex(vertex.clone());
    Ok(vertex)
}

/// Cursor for [`CreateNode`]: one new vertex per input row.
pub(crate) struct CreateNodeCursor<'a> {
    self_: &'a CreateNode,
    db: DynGraph,
    input: BoxedCursor<'a>,
}

impl<'a> CreateNodeCursor<'a> {
    pub(crate) fn new(self_: &'a CreateNode, db: DynGraph, input: BoxedCursor<'a>) -> Self {
        Self { self_, db, input }
    }
}

impl<'a> Cursor for CreateNodeCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        if !self.input.pull(frame)? {
            return Ok(false);
        }
        create_vertex(&self.self_.node, &self.db, frame)?;
        Ok(true)
    }

    fn reset(&mut self) {
        self.input.reset();
    }
}

/// Cursor for [`CreateExpand`]: per input row, creates an edge from the
/// bound origin vertex, creating the far vertex too unless it already
/// exists on the frame.
pub(crate) struct CreateExpandCursor<'a> {
    self_: &'a CreateExpand,
    db: DynGraph,
    input: BoxedCursor<'a>,
}

impl<'a> CreateExpandCursor<'a> {
    pub(crate) fn new(self_: &'a CreateExpand, db: DynGraph, input: BoxedCursor<'a>) -> Self {
        Self { self_, db, input }
    }

    /// Resolves the far vertex: read from the frame when `existing_node`,
    /// created and bound otherwise.
    fn other_vertex(&self, frame: &mut Frame) -> ExecResult<VertexAccessor> {
        if self.self_.existing_node {
            let mut vertex =
                expect_vertex(&frame[&self.self_.node.symbol], &self.self_.node.symbol)?;
            vertex.switch(View::New);
            Ok(vertex)
        } else {
            create_vertex(&self.self_.node, &self.db, frame)
        }
    }

    fn create_edge(
        &self,
        from: &VertexAccessor,
        to: &VertexAccessor,
        frame: &mut Frame,
    ) -> ExecResult<()> {
        let edge_id = self.db.insert_edge(from.id(), to.id(), self.self_.edge.edge_type)?;
        let edge = EdgeAccessor::new(edge_id, View::New, self.db.clone());
        for (property, expression) in &self.self_.edge.properties {
            let value = ExpressionEvaluator::new(frame, View::New).eval(expression)?;
            edge.set_property(*property, PropertyValue::try_from(&value)?)?;
        }
        frame[&self.self_.edge.symbol] = Value::Edge(edge);
        Ok(())
    }
}

impl<'a> Cursor for CreateExpandCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        if !self.input.pull(frame)? {
            return Ok(false);
        }

        // The new edge and its property initializers must observe the
        // statement's own writes, e.g. CREATE (n {p: 42})-[:r {ep: n.p}]->().
        let mut origin = expect_vertex(&frame[&self.self_.input_symbol], &self.self_.input_symbol)?;
        origin.switch(View::New);
        let other = self.other_vertex(frame)?;

        match self.self_.edge.direction {
            Direction::In => self.create_edge(&other, &origin, frame)?,
            Direction::Out => self.create_edge(&origin, &other, frame)?,
            // An undirected create picks an arbitrary direction; only MERGE
            // plans produce it, CREATE forbids it upstream.
            Direction::Both => self.create_edge(&origin, &other, frame)?,
        }
        Ok(true)
    }

    fn reset(&mut self) {
        self.input.reset();
    }
}
