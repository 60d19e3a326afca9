//! Ordering.

use std::cmp::Ordering as CmpOrdering;

use crate::error::{ExecError, ExecResult};
use crate::eval::ExpressionEvaluator;
use crate::exec::{BoxedCursor, Cursor};
use crate::graph::DynGraph;
use crate::plan::{OrderBy, Ordering};
use crate::symbol::Frame;
use crate::value::Value;

/// Compares two key lists lexicographically, applying each key's direction.
/// `Desc` reverses the whole per-key comparison, null placement included.
fn compare_key_lists(
    left: &[Value],
    right: &[Value],
    order: &[(Ordering, crate::expr::Expression)],
) -> ExecResult<CmpOrdering> {
    for ((ordering, _), (a, b)) in order.iter().zip(left.iter().zip(right.iter())) {
        if a.sort_less(b)? {
            return Ok(match ordering {
                Ordering::Asc => CmpOrdering::Less,
                Ordering::Desc => CmpOrdering::Greater,
            });
        }
        if b.sort_less(a)? {
            return Ok(match ordering {
                Ordering::Asc => CmpOrdering::Greater,
                Ordering::Desc => CmpOrdering::Less,
            });
        }
    }
    Ok(CmpOrdering::Equal)
}

/// Cursor for [`OrderBy`].
///
/// Blocking: the first pull drains the input into `(keys, outputs)` pairs,
/// sorts them stably, then emits the outputs row by row. Keys are
/// evaluated with no view; the values were bound by the input pipeline.
pub(crate) struct OrderByCursor<'a> {
    self_: &'a OrderBy,
    db: DynGraph,
    input: BoxedCursor<'a>,
    cache: Vec<(Vec<Value>, Vec<Value>)>,
    next: usize,
    pulled_all_input: bool,
}

impl<'a> OrderByCursor<'a> {
    pub(crate) fn new(self_: &'a OrderBy, db: DynGraph, input: BoxedCursor<'a>) -> Self {
        Self { self_, db, input, cache: Vec::new(), next: 0, pulled_all_input: false }
    }

    fn drain_and_sort(&mut self, frame: &mut Frame) -> ExecResult<()> {
        while self.input.pull(frame)? {
            if self.db.should_abort() {
                return Err(ExecError::Aborted);
            }
            let evaluator = ExpressionEvaluator::as_is(frame);
            let keys: Vec<Value> = self
                .self_
                .order_by
                .iter()
                .map(|(_, expression)| evaluator.eval(expression))
                .collect::<ExecResult<_>>()?;
            let outputs: Vec<Value> =
                self.self_.output_symbols.iter().map(|symbol| frame[symbol].clone()).collect();
            self.cache.push((keys, outputs));
        }

        // sort_by takes an infallible comparator; park the first failure
        // and surface it after the sort.
        let mut failure: Option<ExecError> = None;
        let order = &self.self_.order_by;
        self.cache.sort_by(|a, b| match compare_key_lists(&a.0, &b.0, order) {
            Ok(ordering) => ordering,
            Err(error) => {
                failure.get_or_insert(error);
                CmpOrdering::Equal
            }
        });
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(())
    }
}

impl<'a> Cursor for OrderByCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        if !self.pulled_all_input {
            self.drain_and_sort(frame)?;
            self.pulled_all_input = true;
        }

        if self.next >= self.cache.len() {
            return Ok(false);
        }
        let (_, outputs) = &mut self.cache[self.next];
        let outputs = std::mem::take(outputs);
        self.next += 1;
        for (symbol, value) in self.self_.output_symbols.iter().zip(outputs) {
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
