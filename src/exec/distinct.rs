//! Duplicate row elimination.

use std::collections::HashMap;

use crate::error::ExecResult;
use crate::exec::{BoxedCursor, Cursor};
use crate::plan::Distinct;
use crate::symbol::Frame;
use crate::value::{hash_value_list, list_bool_equal, Value};

/// Cursor for [`Distinct`].
///
/// Streaming with a memo: a row passes if its value-symbol tuple was not
/// seen before. Tuple identity is pairwise value equality with Null keys
/// never coinciding, so rows carrying Null all pass. First occurrences
/// come out in input order.
pub(crate) struct DistinctCursor<'a> {
    self_: &'a Distinct,
    input: BoxedCursor<'a>,
    /// Tuple hash -> tuples; probed with pairwise equality.
    seen: HashMap<u64, Vec<Vec<Value>>>,
}

impl<'a> DistinctCursor<'a> {
    pub(crate) fn new(self_: &'a Distinct, input: BoxedCursor<'a>) -> Self {
        Self { self_, input, seen: HashMap::new() }
    }

    /// Records the tuple; `true` if it was new.
    fn insert_if_new(&mut self, row: Vec<Value>) -> bool {
        let hash = hash_value_list(&row);
        let bucket = self.seen.entry(hash).or_default();
        if bucket.iter().any(|seen| list_bool_equal(seen, &row)) {
            return false;
        }
        bucket.push(row);
        true
    }
}

impl<'a> Cursor for DistinctCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        while self.input.pull(frame)? {
            let row: Vec<Value> =
                self.self_.value_symbols.iter().map(|symbol| frame[symbol].clone()).collect();
            if self.insert_if_new(row) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn reset(&mut self) {
        self.input.reset();
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::{memory_graph, once_input};
    use crate::expr::Expression;
    use crate::plan::{LogicalOperator, Unwind};
    use crate::symbol::{Symbol, SymbolTable};

    fn distinct_plan(
        table: &mut SymbolTable,
        items: Vec<Expression>,
    ) -> (Symbol, LogicalOperator) {
        let x = table.create_symbol("x", true);
        let plan = LogicalOperator::Distinct(Distinct {
            input: Box::new(LogicalOperator::Unwind(Unwind {
                input: once_input(),
                input_expression: Expression::ListLiteral(items),
                output_symbol: x.clone(),
            })),
            value_symbols: vec![x.clone()],
        });
        (x, plan)
    }

    fn collect(
        plan: &LogicalOperator,
        table: &SymbolTable,
        x: &Symbol,
        db: &crate::graph::DynGraph,
    ) -> Vec<Value> {
        let mut cursor = plan.make_cursor(db);
        let mut frame = Frame::new(table.max_position());
        let mut values = Vec::new();
        while cursor.pull(&mut frame).unwrap() {
            values.push(frame[x].clone());
        }
        values
    }

    #[test]
    fn keeps_first_occurrence_in_order() {
        let (_, db) = memory_graph();
        let mut table = SymbolTable::new();
        let (x, plan) = distinct_plan(
            &mut table,
            [2i64, 1, 2, 3, 1, 2].into_iter().map(Expression::literal).collect(),
        );

        assert_eq!(
            collect(&plan, &table, &x, &db),
            vec![Value::Int(2), Value::Int(1), Value::Int(3)]
        );
    }

    #[test]
    fn int_and_double_coincide() {
        let (_, db) = memory_graph();
        let mut table = SymbolTable::new();
        let (x, plan) = distinct_plan(
            &mut table,
            vec![Expression::literal(1i64), Expression::literal(1.0f64)],
        );

        assert_eq!(collect(&plan, &table, &x, &db), vec![Value::Int(1)]);
    }

    #[test]
    fn null_rows_all_pass() {
        let (_, db) = memory_graph();
        let mut table = SymbolTable::new();
        let (x, plan) =
            distinct_plan(&mut table, vec![Expression::null(), Expression::null()]);

        assert_eq!(collect(&plan, &table, &x, &db), vec![Value::Null, Value::Null]);
    }

    #[test]
    fn reset_forgets_the_memo() {
        let (_, db) = memory_graph();
        let mut table = SymbolTable::new();
        let (x, plan) = distinct_plan(
            &mut table,
            vec![Expression::literal(1i64), Expression::literal(1i64)],
        );

        let mut cursor = plan.make_cursor(&db);
        let mut frame = Frame::new(table.max_position());
        assert!(cursor.pull(&mut frame).unwrap());
        assert!(!cursor.pull(&mut frame).unwrap());

        cursor.reset();
        assert!(cursor.pull(&mut frame).unwrap());
        assert_eq!(frame[&x], Value::Int(1));
    }
}
