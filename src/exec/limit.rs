//! Skip and Limit.
//!
//! Both evaluate their row-count expression exactly once, on the first
//! pull, with no view (the expression may not reference entities). The
//! result must be a non-negative Int.

use crate::error::{ExecError, ExecResult};
use crate::eval::ExpressionEvaluator;
use crate::exec::{BoxedCursor, Cursor};
use crate::expr::Expression;
use crate::plan::{Limit, Skip};
use crate::symbol::Frame;
use crate::value::Value;

fn evaluate_count(expression: &Expression, frame: &Frame, clause: &str) -> ExecResult<i64> {
    match ExpressionEvaluator::as_is(frame).eval(expression)? {
        Value::Int(count) if count >= 0 => Ok(count),
        Value::Int(_) => Err(ExecError::runtime(format!(
            "result of the {clause} expression must be greater than or equal to zero"
        ))),
        other => Err(ExecError::runtime(format!(
            "result of the {clause} expression must be an Int, got {}",
            other.type_name()
        ))),
    }
}

/// Cursor for [`Skip`]: discards the first N input rows.
pub(crate) struct SkipCursor<'a> {
    self_: &'a Skip,
    input: BoxedCursor<'a>,
    /// Evaluated on the first successful input pull.
    to_skip: Option<i64>,
    skipped: i64,
}

impl<'a> SkipCursor<'a> {
    pub(crate) fn new(self_: &'a Skip, input: BoxedCursor<'a>) -> Self {
        Self { self_, input, to_skip: None, skipped: 0 }
    }
}

impl<'a> Cursor for SkipCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        while self.input.pull(frame)? {
            let to_skip = match self.to_skip {
                Some(to_skip) => to_skip,
                None => {
                    let to_skip = evaluate_count(&self.self_.expression, frame, "SKIP")?;
                    self.to_skip = Some(to_skip);
                    to_skip
                }
            };
            if self.skipped < to_skip {
                self.skipped += 1;
                continue;
            }
            return Ok(true);
        }
        Ok(false)
    }

    fn reset(&mut self) {
        self.input.reset();
        self.to_skip = None;
        self.skipped = 0;
    }
}

/// Cursor for [`Limit`]: passes through at most N input rows.
pub(crate) struct LimitCursor<'a> {
    self_: &'a Limit,
    input: BoxedCursor<'a>,
    /// Evaluated before the first input pull, so a zero limit never
    /// touches its input.
    limit: Option<i64>,
    pulled: i64,
}

impl<'a> LimitCursor<'a> {
    pub(crate) fn new(self_: &'a Limit, input: BoxedCursor<'a>) -> Self {
        Self { self_, input, limit: None, pulled: 0 }
    }
}

impl<'a> Cursor for LimitCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        let limit = match self.limit {
            Some(limit) => limit,
            None => {
                let limit = evaluate_count(&self.self_.expression, frame, "LIMIT")?;
                self.limit = Some(limit);
                limit
            }
        };
        if self.pulled >= limit {
            return Ok(false);
        }
        self.pulled += 1;
        self.input.pull(frame)
    }

    fn reset(&mut self) {
        self.input.reset();
        self.limit = None;
        self.pulled = 0;
    }
}
