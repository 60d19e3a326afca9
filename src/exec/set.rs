//! Property and label assignment.

use crate::error::{ExecError, ExecResult};
use crate::eval::ExpressionEvaluator;
use crate::exec::{expect_vertex, BoxedCursor, Cursor};
use crate::graph::{DynGraph, PropertyValue, RecordAccessor, View};
use crate::plan::{PropertiesOp, SetLabels, SetProperties, SetProperty};
use crate::symbol::Frame;
use crate::value::Value;

/// Cursor for [`SetProperty`]: sets one property on the entity the lookup
/// expression names. A Null target is a no-op (failed optional match);
/// other non-entities are runtime errors.
pub(crate) struct SetPropertyCursor<'a> {
    self_: &'a SetProperty,
    input: BoxedCursor<'a>,
}

impl<'a> SetPropertyCursor<'a> {
    pub(crate) fn new(self_: &'a SetProperty, input: BoxedCursor<'a>) -> Self {
        Self { self_, input }
    }
}

impl<'a> Cursor for SetPropertyCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        if !self.input.pull(frame)? {
            return Ok(false);
        }

        // Writes observe the statement's own changes.
        let evaluator = ExpressionEvaluator::new(frame, View::New);
        let target = evaluator.eval(&self.self_.lhs_expression)?;
        let rhs = evaluator.eval(&self.self_.rhs)?;

        match target {
            Value::Vertex(vertex) => {
                vertex.set_property(self.self_.property, PropertyValue::try_from(&rhs)?)?;
            }
            Value::Edge(edge) => {
                edge.set_property(self.self_.property, PropertyValue::try_from(&rhs)?)?;
            }
            Value::Null => {}
            _ => {
                return Err(ExecError::runtime(
                    "properties can only be set on vertices and edges",
                ))
            }
        }
        Ok(true)
    }

    fn reset(&mut self) {
        self.input.reset();
    }
}

/// Cursor for [`SetProperties`]: copies properties from a record or a map
/// onto the bound target, optionally clearing it first (REPLACE).
pub(crate) struct SetPropertiesCursor<'a> {
    self_: &'a SetProperties,
    db: DynGraph,
    input: BoxedCursor<'a>,
}

impl<'a> SetPropertiesCursor<'a> {
    pub(crate) fn new(self_: &'a SetProperties, db: DynGraph, input: BoxedCursor<'a>) -> Self {
        Self { self_, db, input }
    }

    fn set_on<R: RecordAccessor>(&self, mut record: R, rhs: &Value) -> ExecResult<()> {
        record.switch(View::New);
        if self.self_.op == PropertiesOp::Replace {
            record.clear_properties()?;
        }

        match rhs {
            Value::Vertex(source) => {
                for (property, value) in source.properties()? {
                    record.set_property(property, value)?;
                }
            }
            Value::Edge(source) => {
                for (property, value) in source.properties()? {
                    record.set_property(property, value)?;
                }
            }
            Value::Map(entries) => {
                for (name, value) in entries {
                    let property = self.db.property_id(name);
                    record.set_property(property, PropertyValue::try_from(value)?)?;
                }
            }
            _ => {
                return Err(ExecError::runtime(
                    "only vertices, edges and maps can be set as properties",
                ))
            }
        }
        Ok(())
    }
}

impl<'a> Cursor for SetPropertiesCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        if !self.input.pull(frame)? {
            return Ok(false);
        }

        let rhs = ExpressionEvaluator::new(frame, View::New).eval(&self.self_.rhs)?;
        match frame[&self.self_.input_symbol].clone() {
            Value::Vertex(vertex) => self.set_on(vertex, &rhs)?,
            Value::Edge(edge) => self.set_on(edge, &rhs)?,
            Value::Null => {}
            _ => {
                return Err(ExecError::runtime(
                    "properties can only be set on vertices and edges",
                ))
            }
        }
        Ok(true)
    }

    fn reset(&mut self) {
        self.input.reset();
    }
}

/// Cursor for [`SetLabels`]: adds labels to the bound vertex, idempotently.
/// A Null target is a no-op.
pub(crate) struct SetLabelsCursor<'a> {
    self_: &'a SetLabels,
    input: BoxedCursor<'a>,
}

impl<'a> SetLabelsCursor<'a> {
    pub(crate) fn new(self_: &'a SetLabels, input: BoxedCursor<'a>) -> Self {
        Self { self_, input }
    }
}

impl<'a> Cursor for SetLabelsCursor<'a> {
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
            vertex.add_label(*label)?;
        }
        Ok(true)
    }

    fn reset(&mut self) {
        self.input.reset();
    }
}
