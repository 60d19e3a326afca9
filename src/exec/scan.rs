//! Source cursors: `Once` and the `ScanAll` family.
//!
//! All four scan operators share one cursor parameterized over a producer
//! closure. The producer runs once per input row and returns the vertex ids
//! to emit, or `None` when this input row contributes nothing (a Null
//! lookup value or bound) and the scan should move on to the next input
//! row. Re-running the producer per input row is what makes nested
//! Cartesian products work.

use crate::error::{ExecError, ExecResult};
use crate::exec::{BoxedCursor, Cursor};
use crate::graph::{DynGraph, VertexAccessor, VertexId, View};
use crate::symbol::{Frame, Symbol};
use crate::value::Value;

/// Yields exactly one empty row, then is exhausted.
#[derive(Debug, Default)]
pub(crate) struct OnceCursor {
    did_pull: bool,
}

impl OnceCursor {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl Cursor for OnceCursor {
    fn pull(&mut self, _frame: &mut Frame) -> ExecResult<bool> {
        if self.did_pull {
            return Ok(false);
        }
        self.did_pull = true;
        Ok(true)
    }

    fn reset(&mut self) {
        self.did_pull = false;
    }
}

/// The shared scan cursor; `produce` decides which vertices one input row
/// yields.
pub(crate) struct ScanCursor<'a, F> {
    output_symbol: &'a Symbol,
    view: View,
    input: BoxedCursor<'a>,
    db: DynGraph,
    produce: F,
    vertices: Option<std::vec::IntoIter<VertexId>>,
}

impl<'a, F> ScanCursor<'a, F>
where
    F: FnMut(&Frame) -> ExecResult<Option<Vec<VertexId>>>,
{
    pub(crate) fn new(
        output_symbol: &'a Symbol,
        view: View,
        input: BoxedCursor<'a>,
        db: DynGraph,
        produce: F,
    ) -> Self {
        Self { output_symbol, view, input, db, produce, vertices: None }
    }
}

impl<'a, F> Cursor for ScanCursor<'a, F>
where
    F: FnMut(&Frame) -> ExecResult<Option<Vec<VertexId>>>,
{
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        loop {
            if self.db.should_abort() {
                return Err(ExecError::Aborted);
            }
            if let Some(iter) = self.vertices.as_mut() {
                if let Some(id) = iter.next() {
                    frame[self.output_symbol] =
                        Value::Vertex(VertexAccessor::new(id, self.view, self.db.clone()));
                    return Ok(true);
                }
            }
            // Current iteration exhausted (or none yet): restart from the
            // next input row.
            if !self.input.pull(frame)? {
                return Ok(false);
            }
            self.vertices = (self.produce)(frame)?.map(Vec::into_iter);
        }
    }

    fn reset(&mut self) {
        self.input.reset();
        self.vertices = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::{count_pulls, memory_graph, once_input};
    use crate::expr::Expression;
    use crate::graph::{BoundKind, GraphBackend, PropertyValue};
    use crate::plan::{
        Bound, LogicalOperator, ScanAll, ScanAllByLabel, ScanAllByLabelPropertyRange,
        ScanAllByLabelPropertyValue, Unwind,
    };
    use crate::symbol::SymbolTable;

    #[test]
    fn once_pulls_exactly_once() {
        let mut cursor = OnceCursor::new();
        let mut frame = Frame::new(0);
        assert!(cursor.pull(&mut frame).unwrap());
        assert!(!cursor.pull(&mut frame).unwrap());
        assert!(!cursor.pull(&mut frame).unwrap());

        cursor.reset();
        assert!(cursor.pull(&mut frame).unwrap());
    }

    #[test]
    fn scan_all_emits_every_vertex() {
        let (_, db) = memory_graph();
        for _ in 0..3 {
            db.insert_vertex();
        }

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let plan = LogicalOperator::ScanAll(ScanAll {
            input: once_input(),
            output_symbol: n.clone(),
            view: View::New,
        });

        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 3);
    }

    #[test]
    fn scan_all_old_view_hides_new_vertices() {
        let (_, db) = memory_graph();
        db.insert_vertex();

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let plan = LogicalOperator::ScanAll(ScanAll {
            input: once_input(),
            output_symbol: n.clone(),
            view: View::Old,
        });

        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 0);
        db.advance_command();
        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 1);
    }

    #[test]
    fn scan_binds_output_symbol() {
        let (_, db) = memory_graph();
        let v = db.insert_vertex();

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let plan = LogicalOperator::ScanAll(ScanAll {
            input: once_input(),
            output_symbol: n.clone(),
            view: View::New,
        });

        let mut cursor = plan.make_cursor(&db);
        let mut frame = Frame::new(table.max_position());
        assert!(cursor.pull(&mut frame).unwrap());
        match &frame[&n] {
            Value::Vertex(vertex) => assert_eq!(vertex.id(), v),
            other => panic!("expected a vertex, got {other:?}"),
        }
    }

    #[test]
    fn scan_restarts_per_input_row() {
        let (_, db) = memory_graph();
        db.insert_vertex();
        db.insert_vertex();

        let mut table = SymbolTable::new();
        let x = table.create_symbol("x", true);
        let n = table.create_symbol("n", true);

        // Two input rows from UNWIND, so the scan runs twice: a Cartesian
        // product of 2 x 2 rows.
        let plan = LogicalOperator::ScanAll(ScanAll {
            input: Box::new(LogicalOperator::Unwind(Unwind {
                input: once_input(),
                input_expression: Expression::ListLiteral(vec![
                    Expression::literal(1i64),
                    Expression::literal(2i64),
                ]),
                output_symbol: x.clone(),
            })),
            output_symbol: n.clone(),
            view: View::New,
        });

        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 4);
    }

    #[test]
    fn scan_by_label_filters() {
        let (_, db) = memory_graph();
        let person = db.label_id("Person");
        let a = db.insert_vertex();
        db.insert_vertex();
        db.add_vertex_label(a, person).unwrap();

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let plan = LogicalOperator::ScanAllByLabel(ScanAllByLabel {
            input: once_input(),
            output_symbol: n.clone(),
            label: person,
            view: View::New,
        });

        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 1);
    }

    #[test]
    fn scan_by_property_value() {
        let (_, db) = memory_graph();
        let person = db.label_id("Person");
        let age = db.property_id("age");
        for n in [41i64, 42, 42] {
            let v = db.insert_vertex();
            db.add_vertex_label(v, person).unwrap();
            db.set_vertex_property(v, age, PropertyValue::Int(n)).unwrap();
        }

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let plan = LogicalOperator::ScanAllByLabelPropertyValue(ScanAllByLabelPropertyValue {
            input: once_input(),
            output_symbol: n.clone(),
            label: person,
            property: age,
            expression: Expression::literal(42i64),
            view: View::New,
        });

        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 2);
    }

    #[test]
    fn scan_by_property_value_null_yields_no_rows() {
        let (_, db) = memory_graph();
        let person = db.label_id("Person");
        let age = db.property_id("age");
        let v = db.insert_vertex();
        db.add_vertex_label(v, person).unwrap();
        db.set_vertex_property(v, age, PropertyValue::Int(1)).unwrap();

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let plan = LogicalOperator::ScanAllByLabelPropertyValue(ScanAllByLabelPropertyValue {
            input: once_input(),
            output_symbol: n.clone(),
            label: person,
            property: age,
            expression: Expression::null(),
            view: View::New,
        });

        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 0);
    }

    #[test]
    fn scan_by_property_value_rejects_unstorable_lookup() {
        let (_, db) = memory_graph();
        let person = db.label_id("Person");
        let age = db.property_id("age");

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let m = table.create_symbol("m", true);

        // The lookup expression evaluates to a vertex, which cannot be a
        // property value.
        let plan = LogicalOperator::ScanAllByLabelPropertyValue(ScanAllByLabelPropertyValue {
            input: Box::new(LogicalOperator::ScanAll(ScanAll {
                input: once_input(),
                output_symbol: m.clone(),
                view: View::New,
            })),
            output_symbol: n.clone(),
            label: person,
            property: age,
            expression: Expression::ident(&m),
            view: View::New,
        });
        db.insert_vertex();

        let err = count_pulls(&plan, &table, &db).unwrap_err();
        assert!(err.to_string().contains("cannot be used as a property value"));
    }

    #[test]
    fn scan_by_property_range() {
        let (_, db) = memory_graph();
        let person = db.label_id("Person");
        let age = db.property_id("age");
        for n in [1i64, 5, 10] {
            let v = db.insert_vertex();
            db.add_vertex_label(v, person).unwrap();
            db.set_vertex_property(v, age, PropertyValue::Int(n)).unwrap();
        }

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let plan = LogicalOperator::ScanAllByLabelPropertyRange(ScanAllByLabelPropertyRange {
            input: once_input(),
            output_symbol: n.clone(),
            label: person,
            property: age,
            lower_bound: Some(Bound {
                value: Expression::literal(1i64),
                kind: BoundKind::Exclusive,
            }),
            upper_bound: Some(Bound {
                value: Expression::literal(10i64),
                kind: BoundKind::Inclusive,
            }),
            view: View::New,
        });

        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 2);
    }

    #[test]
    fn scan_by_property_range_null_bound_yields_no_rows() {
        let (_, db) = memory_graph();
        let person = db.label_id("Person");
        let age = db.property_id("age");
        let v = db.insert_vertex();
        db.add_vertex_label(v, person).unwrap();
        db.set_vertex_property(v, age, PropertyValue::Int(5)).unwrap();

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let plan = LogicalOperator::ScanAllByLabelPropertyRange(ScanAllByLabelPropertyRange {
            input: once_input(),
            output_symbol: n.clone(),
            label: person,
            property: age,
            lower_bound: Some(Bound { value: Expression::null(), kind: BoundKind::Inclusive }),
            upper_bound: None,
            view: View::New,
        });

        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 0);
    }

    #[test]
    fn scan_aborts_cooperatively() {
        let (graph, db) = memory_graph();
        db.insert_vertex();

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let plan = LogicalOperator::ScanAll(ScanAll {
            input: once_input(),
            output_symbol: n.clone(),
            view: View::New,
        });

        graph.request_abort();
        let err = count_pulls(&plan, &table, &db).unwrap_err();
        assert!(matches!(err, ExecError::Aborted));
    }
}
