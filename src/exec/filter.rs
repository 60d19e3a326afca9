//! Predicate filtering.

use crate::error::{ExecError, ExecResult};
use crate::eval::ExpressionEvaluator;
use crate::exec::{BoxedCursor, Cursor};
use crate::graph::View;
use crate::plan::Filter;
use crate::symbol::Frame;
use crate::value::Value;

/// Cursor for [`Filter`].
///
/// The predicate runs under the OLD view: a filter reasons about the
/// matched subgraph as it was at statement start, not about mutations made
/// within the same statement. A Null result filters the row; a non-boolean
/// result is a type error.
pub(crate) struct FilterCursor<'a> {
    self_: &'a Filter,
    input: BoxedCursor<'a>,
}

impl<'a> FilterCursor<'a> {
    pub(crate) fn new(self_: &'a Filter, input: BoxedCursor<'a>) -> Self {
        Self { self_, input }
    }
}

impl<'a> Cursor for FilterCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        while self.input.pull(frame)? {
            let evaluator = ExpressionEvaluator::new(frame, View::Old);
            match evaluator.eval(&self.self_.expression)? {
                Value::Bool(true) => return Ok(true),
                Value::Bool(false) | Value::Null => {}
                other => {
                    return Err(ExecError::type_error(format!(
                        "filter expression must be a bool or null, got {}",
                        other.type_name()
                    )))
                }
            }
        }
        Ok(false)
    }

    fn reset(&mut self) {
        self.input.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::{count_pulls, memory_graph, once_input};
    use crate::expr::Expression;
    use crate::graph::{GraphBackend, PropertyValue};
    use crate::plan::{LogicalOperator, ScanAll, Unwind};
    use crate::symbol::SymbolTable;

    fn unwind_filter(
        items: Vec<Expression>,
        predicate: impl FnOnce(&crate::symbol::Symbol) -> Expression,
    ) -> (SymbolTable, LogicalOperator) {
        let mut table = SymbolTable::new();
        let x = table.create_symbol("x", true);
        let plan = LogicalOperator::Filter(Filter {
            input: Box::new(LogicalOperator::Unwind(Unwind {
                input: once_input(),
                input_expression: Expression::ListLiteral(items),
                output_symbol: x.clone(),
            })),
            expression: predicate(&x),
        });
        (table, plan)
    }

    #[test]
    fn keeps_only_true_rows() {
        let (_, db) = memory_graph();
        let (table, plan) = unwind_filter(
            (1..=4i64).map(Expression::literal).collect(),
            |x| Expression::ident(x).gt(Expression::literal(2i64)),
        );
        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 2);
    }

    #[test]
    fn null_counts_as_false() {
        let (_, db) = memory_graph();
        let (table, plan) = unwind_filter(
            vec![Expression::literal(1i64), Expression::null(), Expression::literal(3i64)],
            |x| Expression::ident(x).gt(Expression::literal(0i64)),
        );
        // The Null element compares to Null, which filters the row.
        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 2);
    }

    #[test]
    fn non_boolean_result_raises() {
        let (_, db) = memory_graph();
        let (table, plan) = unwind_filter(
            vec![Expression::literal(1i64)],
            |x| Expression::ident(x).add(Expression::literal(1i64)),
        );
        let err = count_pulls(&plan, &table, &db).unwrap_err();
        assert!(matches!(err, ExecError::Type(_)));
    }

    #[test]
    fn filter_reads_old_view() {
        let (_, db) = memory_graph();
        let age = db.property_id("age");
        let v = db.insert_vertex();
        db.set_vertex_property(v, age, PropertyValue::Int(1)).unwrap();
        db.advance_command();
        // Mutate within the current command; the filter must not see it.
        db.set_vertex_property(v, age, PropertyValue::Int(99)).unwrap();

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let plan = LogicalOperator::Filter(Filter {
            input: Box::new(LogicalOperator::ScanAll(ScanAll {
                input: once_input(),
                output_symbol: n.clone(),
                view: View::Old,
            })),
            expression: Expression::ident(&n)
                .property(age)
                .eq(Expression::literal(1i64)),
        });

        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 1);
    }
}
