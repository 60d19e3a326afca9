//! List unwinding.

use crate::error::{ExecError, ExecResult};
use crate::eval::ExpressionEvaluator;
use crate::exec::{BoxedCursor, Cursor};
use crate::graph::DynGraph;
use crate::plan::Unwind;
use crate::symbol::Frame;
use crate::value::Value;

/// Cursor for [`Unwind`]: per input row, one output row per element of the
/// list expression. Null evaluates to zero rows; any other non-list is a
/// type error.
pub(crate) struct UnwindCursor<'a> {
    self_: &'a Unwind,
    db: DynGraph,
    input: BoxedCursor<'a>,
    elements: Option<std::vec::IntoIter<Value>>,
}

impl<'a> UnwindCursor<'a> {
    pub(crate) fn new(self_: &'a Unwind, db: DynGraph, input: BoxedCursor<'a>) -> Self {
        Self { self_, db, input, elements: None }
    }
}

impl<'a> Cursor for UnwindCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        loop {
            if self.db.should_abort() {
                return Err(ExecError::Aborted);
            }
            if let Some(element) = self.elements.as_mut().and_then(Iterator::next) {
                frame[&self.self_.output_symbol] = element;
                return Ok(true);
            }

            if !self.input.pull(frame)? {
                return Ok(false);
            }
            let value =
                ExpressionEvaluator::as_is(frame).eval(&self.self_.input_expression)?;
            self.elements = match value {
                Value::List(elements) => Some(elements.into_iter()),
                // A Null list contributes no rows for this input row.
                Value::Null => None,
                other => {
                    return Err(ExecError::type_error(format!(
                        "UNWIND only accepts list values, got {}",
                        other.type_name()
                    )))
                }
            };
        }
    }

    fn reset(&mut self) {
        self.input.reset();
        self.elements = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::{count_pulls, memory_graph, once_input};
    use crate::expr::Expression;
    use crate::plan::LogicalOperator;
    use crate::symbol::SymbolTable;

    fn unwind_plan(table: &mut SymbolTable, expression: Expression) -> LogicalOperator {
        let x = table.create_symbol("x", true);
        LogicalOperator::Unwind(Unwind {
            input: once_input(),
            input_expression: expression,
            output_symbol: x,
        })
    }

    #[test]
    fn emits_one_row_per_element() {
        let (_, db) = memory_graph();
        let mut table = SymbolTable::new();
        let plan = unwind_plan(
            &mut table,
            Expression::ListLiteral((1..=3i64).map(Expression::literal).collect()),
        );
        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 3);
    }

    #[test]
    fn binds_elements_in_order() {
        let (_, db) = memory_graph();
        let mut table = SymbolTable::new();
        let x = table.create_symbol("x", true);
        let plan = LogicalOperator::Unwind(Unwind {
            input: once_input(),
            input_expression: Expression::ListLiteral(vec![
                Expression::literal(10i64),
                Expression::literal(20i64),
            ]),
            output_symbol: x.clone(),
        });

        let mut cursor = plan.make_cursor(&db);
        let mut frame = Frame::new(table.max_position());
        assert!(cursor.pull(&mut frame).unwrap());
        assert_eq!(frame[&x], Value::Int(10));
        assert!(cursor.pull(&mut frame).unwrap());
        assert_eq!(frame[&x], Value::Int(20));
        assert!(!cursor.pull(&mut frame).unwrap());
    }

    #[test]
    fn empty_list_yields_nothing() {
        let (_, db) = memory_graph();
        let mut table = SymbolTable::new();
        let plan = unwind_plan(&mut table, Expression::ListLiteral(vec![]));
        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 0);
    }

    #[test]
    fn null_yields_nothing() {
        let (_, db) = memory_graph();
        let mut table = SymbolTable::new();
        let plan = unwind_plan(&mut table, Expression::null());
        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 0);
    }

    #[test]
    fn non_list_raises() {
        let (_, db) = memory_graph();
        let mut table = SymbolTable::new();
        let plan = unwind_plan(&mut table, Expression::literal(42i64));
        let err = count_pulls(&plan, &table, &db).unwrap_err();
        assert!(matches!(err, ExecError::Type(_)));
    }

    #[test]
    fn reset_restarts_the_list() {
        let (_, db) = memory_graph();
        let mut table = SymbolTable::new();
        let x = table.create_symbol("x", true);
        let plan = LogicalOperator::Unwind(Unwind {
            input: once_input(),
            input_expression: Expression::ListLiteral(vec![Expression::literal(1i64)]),
            output_symbol: x.clone(),
        });

        let mut cursor = plan.make_cursor(&db);
        let mut frame = Frame::new(table.max_position());
        assert!(cursor.pull(&mut frame).unwrap());
        assert!(!cursor.pull(&mut frame).unwrap());

        cursor.reset();
        assert!(cursor.pull(&mut frame).unwrap());
        assert_eq!(frame[&x], Value::Int(1));
    }
}
