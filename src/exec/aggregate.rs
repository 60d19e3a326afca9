//! Group-by aggregation.

use std::collections::HashMap;

use crate::error::{ExecError, ExecResult};
use crate::eval::ExpressionEvaluator;
use crate::exec::{BoxedCursor, Cursor};
use crate::graph::{DynGraph, View};
use crate::plan::{Aggregate, AggregationOp};
use crate::symbol::Frame;
use crate::value::{hash_value_list, list_bool_equal, Value};

/// Accumulated state of one group.
struct Group {
    /// The group-by key values.
    key: Vec<Value>,
    /// One running value per aggregation.
    values: Vec<Value>,
    /// Non-null input count per aggregation; drives COUNT and AVG.
    counts: Vec<i64>,
    /// First-row values of the remember symbols.
    remember: Vec<Value>,
}

/// Cursor for [`Aggregate`].
///
/// Blocking: the first pull drains the input under the NEW view, hashing
/// group keys with pairwise value equality (Int/Double coalesce, Null keys
/// never coincide). Groups emit in first-seen order. With no input rows and
/// no group-by, exactly one row of per-op identity values is emitted.
pub(crate) struct AggregateCursor<'a> {
    self_: &'a Aggregate,
    db: DynGraph,
    input: BoxedCursor<'a>,
    groups: Vec<Group>,
    /// Group-key hash -> indices into `groups`; buckets are probed with
    /// pairwise equality, so keys that hash together but are not equal
    /// (e.g. Null) stay distinct.
    index: HashMap<u64, Vec<usize>>,
    next: usize,
    pulled_all_input: bool,
}

impl<'a> AggregateCursor<'a> {
    pub(crate) fn new(self_: &'a Aggregate, db: DynGraph, input: BoxedCursor<'a>) -> Self {
        Self {
            self_,
            db,
            input,
            groups: Vec::new(),
            index: HashMap::new(),
            next: 0,
            pulled_all_input: false,
        }
    }

    /// The value an aggregation starts from, also emitted on zero input.
    fn identity(op: AggregationOp) -> Value {
        match op {
            AggregationOp::Count => Value::Int(0),
            AggregationOp::Sum
            | AggregationOp::Min
            | AggregationOp::Max
            | AggregationOp::Avg => Value::Null,
            AggregationOp::Collect => Value::List(Vec::new()),
        }
    }

    fn ensure_ok_for_min_max(value: &Value) -> ExecResult<()> {
        match value {
            Value::Bool(_) | Value::Int(_) | Value::Double(_) | Value::String(_) => Ok(()),
            other => Err(ExecError::runtime(format!(
                "only Bool, Int, Double and String values are allowed in MIN and MAX \
                 aggregations, got {}",
                other.type_name()
            ))),
        }
    }

    fn ensure_ok_for_sum_avg(value: &Value) -> ExecResult<()> {
        match value {
            Value::Int(_) | Value::Double(_) => Ok(()),
            other => Err(ExecError::runtime(format!(
                "only numeric values are allowed in SUM and AVG aggregations, got {}",
                other.type_name()
            ))),
        }
    }

    /// Finds the row's group by key, creating it on first sight.
    fn find_or_create_group(&mut self, key: Vec<Value>, frame: &Frame) -> usize {
        let hash = hash_value_list(&key);
        let bucket = self.index.entry(hash).or_default();
        for &group_index in bucket.iter() {
            if list_bool_equal(&self.groups[group_index].key, &key) {
                return group_index;
            }
        }
        let group = Group {
            key,
            values: self.self_.aggregations.iter().map(|a| Self::identity(a.op)).collect(),
            counts: vec![0; self.self_.aggregations.len()],
            remember: self.self_.remember.iter().map(|symbol| frame[symbol].clone()).collect(),
        };
        self.groups.push(group);
        bucket.push(self.groups.len() - 1);
        self.groups.len() - 1
    }

    /// Folds one input row into its group.
    fn update_group(&mut self, group_index: usize, frame: &Frame) -> ExecResult<()> {
        let evaluator = ExpressionEvaluator::new(frame, View::New);
        let group = &mut self.groups[group_index];

        for (position, aggregation) in self.self_.aggregations.iter().enumerate() {
            let count = &mut group.counts[position];
            let value = &mut group.values[position];

            // COUNT(*) has no input expression and counts every row.
            let Some(input_expression) = &aggregation.input else {
                *count += 1;
                *value = Value::Int(*count);
                continue;
            };

            let input_value = evaluator.eval(input_expression)?;
            // Aggregations skip Null inputs, COLLECT included.
            if input_value.is_null() {
                continue;
            }
            *count += 1;

            if *count == 1 {
                // First value: check the type, set, move on.
                match aggregation.op {
                    AggregationOp::Min | AggregationOp::Max => {
                        Self::ensure_ok_for_min_max(&input_value)?;
                        *value = input_value;
                    }
                    AggregationOp::Sum | AggregationOp::Avg => {
                        Self::ensure_ok_for_sum_avg(&input_value)?;
                        *value = input_value;
                    }
                    AggregationOp::Count => *value = Value::Int(1),
                    AggregationOp::Collect => {
                        if let Value::List(elements) = value {
                            elements.push(input_value);
                        }
                    }
                }
                continue;
            }

            match aggregation.op {
                AggregationOp::Count => *value = Value::Int(*count),
                AggregationOp::Min => {
                    Self::ensure_ok_for_min_max(&input_value)?;
                    let less = input_value.sort_less(value).map_err(|_| {
                        ExecError::runtime(format!(
                            "unable to get MIN of {} and {}",
                            input_value.type_name(),
                            value.type_name()
                        ))
                    })?;
                    if less {
                        *value = input_value;
                    }
                }
                AggregationOp::Max => {
                    Self::ensure_ok_for_min_max(&input_value)?;
                    let greater = value.sort_less(&input_value).map_err(|_| {
                        ExecError::runtime(format!(
                            "unable to get MAX of {} and {}",
                            input_value.type_name(),
                            value.type_name()
                        ))
                    })?;
                    if greater {
                        *value = input_value;
                    }
                }
                // AVG sums here and divides once the input is drained.
                AggregationOp::Sum | AggregationOp::Avg => {
                    Self::ensure_ok_for_sum_avg(&input_value)?;
                    *value = value.add(&input_value)?;
                }
                AggregationOp::Collect => {
                    if let Value::List(elements) = value {
                        elements.push(input_value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Drains the input, then finalizes AVG values.
    fn process_all(&mut self, frame: &mut Frame) -> ExecResult<()> {
        while self.input.pull(frame)? {
            if self.db.should_abort() {
                return Err(ExecError::Aborted);
            }
            let evaluator = ExpressionEvaluator::new(frame, View::New);
            let key: Vec<Value> = self
                .self_
                .group_by
                .iter()
                .map(|expression| evaluator.eval(expression))
                .collect::<ExecResult<_>>()?;
            let group_index = self.find_or_create_group(key, frame);
            self.update_group(group_index, frame)?;
        }

        for (position, aggregation) in self.self_.aggregations.iter().enumerate() {
            if aggregation.op != AggregationOp::Avg {
                continue;
            }
            for group in &mut self.groups {
                let count = group.counts[position];
                if count > 0 {
                    group.values[position] =
                        group.values[position].div(&Value::Double(count as f64))?;
                }
            }
        }
        Ok(())
    }
}

impl<'a> Cursor for AggregateCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        if !self.pulled_all_input {
            self.process_all(frame)?;
            self.pulled_all_input = true;

            // No input and no group-by: one row of identity values, with
            // the remember symbols nulled.
            if self.groups.is_empty() && self.self_.group_by.is_empty() {
                for aggregation in &self.self_.aggregations {
                    frame[&aggregation.output_symbol] = Self::identity(aggregation.op);
                }
                for symbol in &self.self_.remember {
                    frame[symbol] = Value::Null;
                }
                return Ok(true);
            }
        }

        if self.next >= self.groups.len() {
            return Ok(false);
        }
        let group = &mut self.groups[self.next];
        self.next += 1;
        for (aggregation, value) in
            self.self_.aggregations.iter().zip(std::mem::take(&mut group.values))
        {
            frame[&aggregation.output_symbol] = value;
        }
        for (symbol, value) in self.self_.remember.iter().zip(std::mem::take(&mut group.remember))
        {
            frame[symbol] = value;
        }
        Ok(true)
    }

    fn reset(&mut self) {
        self.input.reset();
        self.groups.clear();
        self.index.clear();
        self.next = 0;
        self.pulled_all_input = false;
    }
}
