//! Expression evaluation against the frame.
//!
//! The evaluator is a fold over [`Expression`]. It carries the frame and an
//! optional [`View`]: with a view set, entity handles read from the frame
//! are rebound to that view before use (recursively through lists and
//! maps), so an operator decides once whether it observes pre-statement or
//! intra-statement state. Without a view, values are used exactly as bound.

use crate::error::{ExecError, ExecResult};
use crate::expr::{BinaryOp, Expression, UnaryOp};
use crate::graph::{RecordAccessor, View};
use crate::symbol::Frame;
use crate::value::Value;

/// Evaluates expressions against a frame under a chosen view.
pub struct ExpressionEvaluator<'a> {
    frame: &'a Frame,
    view: Option<View>,
}

impl<'a> ExpressionEvaluator<'a> {
    /// Creates an evaluator that rebinds entity reads to `view`.
    #[must_use]
    pub fn new(frame: &'a Frame, view: View) -> Self {
        Self { frame, view: Some(view) }
    }

    /// Creates an evaluator that uses values exactly as bound on the frame.
    #[must_use]
    pub fn as_is(frame: &'a Frame) -> Self {
        Self { frame, view: None }
    }

    /// Evaluates one expression.
    pub fn eval(&self, expression: &Expression) -> ExecResult<Value> {
        match expression {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Identifier(symbol) => {
                let mut value = self.frame[symbol].clone();
                self.switch_value(&mut value);
                Ok(value)
            }
            Expression::PropertyLookup { expression, property } => {
                match self.eval(expression)? {
                    Value::Null => Ok(Value::Null),
                    Value::Vertex(vertex) => vertex.property(*property),
                    Value::Edge(edge) => edge.property(*property),
                    other => Err(ExecError::type_error(format!(
                        "property lookup requires a vertex or an edge, got {}",
                        other.type_name()
                    ))),
                }
            }
            Expression::LabelsTest { expression, labels } => match self.eval(expression)? {
                Value::Null => Ok(Value::Null),
                Value::Vertex(vertex) => {
                    for label in labels {
                        if !vertex.has_label(*label)? {
                            return Ok(Value::Bool(false));
                        }
                    }
                    Ok(Value::Bool(true))
                }
                other => Err(ExecError::type_error(format!(
                    "labels test requires a vertex, got {}",
                    other.type_name()
                ))),
            },
            Expression::EdgeTypeTest { expression, edge_types } => {
                match self.eval(expression)? {
                    Value::Null => Ok(Value::Null),
                    Value::Edge(edge) => {
                        let actual = edge.edge_type();
                        Ok(Value::Bool(edge_types.iter().any(|t| *t == actual)))
                    }
                    other => Err(ExecError::type_error(format!(
                        "edge type test requires an edge, got {}",
                        other.type_name()
                    ))),
                }
            }
            Expression::Unary { op, expression } => {
                let value = self.eval(expression)?;
                match op {
                    UnaryOp::Not => value.not(),
                    UnaryOp::Plus => value.unary_plus(),
                    UnaryOp::Minus => value.unary_minus(),
                }
            }
            Expression::Binary { op, lhs, rhs } => {
                let left = self.eval(lhs)?;
                let right = self.eval(rhs)?;
                match op {
                    BinaryOp::Or => left.or(&right),
                    BinaryOp::Xor => left.xor(&right),
                    BinaryOp::And => left.and(&right),
                    BinaryOp::Add => left.add(&right),
                    BinaryOp::Sub => left.sub(&right),
                    BinaryOp::Mul => left.mul(&right),
                    BinaryOp::Div => left.div(&right),
                    BinaryOp::Mod => left.rem(&right),
                    BinaryOp::Eq => Ok(left.equal(&right)),
                    BinaryOp::Ne => left.equal(&right).not(),
                    BinaryOp::Lt => left.less(&right),
                    BinaryOp::Gt => left.greater(&right),
                    BinaryOp::Le => left.less_equal(&right),
                    BinaryOp::Ge => left.greater_equal(&right),
                }
            }
            Expression::IsNull(expression) => {
                Ok(Value::Bool(self.eval(expression)?.is_null()))
            }
            Expression::ListLiteral(elements) => Ok(Value::List(
                elements.iter().map(|e| self.eval(e)).collect::<ExecResult<_>>()?,
            )),
            Expression::MapLiteral(entries) => Ok(Value::Map(
                entries
                    .iter()
                    .map(|(k, e)| Ok((k.clone(), self.eval(e)?)))
                    .collect::<ExecResult<_>>()?,
            )),
            Expression::ListIndexing { list, index } => self.eval_list_indexing(list, index),
            Expression::ListSlicing { list, lower, upper } => {
                self.eval_list_slicing(list, lower.as_deref(), upper.as_deref())
            }
            Expression::InList { element, list } => self.eval_in_list(element, list),
        }
    }

    fn eval_list_indexing(&self, list: &Expression, index: &Expression) -> ExecResult<Value> {
        // Type errors win over null propagation.
        let list_value = self.eval(list)?;
        if !matches!(list_value, Value::List(_) | Value::Null) {
            return Err(ExecError::type_error(format!(
                "expected a list to index with '[]', got {}",
                list_value.type_name()
            )));
        }
        let index_value = self.eval(index)?;
        if !matches!(index_value, Value::Int(_) | Value::Null) {
            return Err(ExecError::type_error(format!(
                "expected an integer as a list index, got {}",
                index_value.type_name()
            )));
        }
        let (Value::List(elements), Value::Int(mut index)) = (list_value, index_value) else {
            return Ok(Value::Null);
        };
        if index < 0 {
            index += elements.len() as i64;
        }
        if index < 0 || index >= elements.len() as i64 {
            return Ok(Value::Null);
        }
        Ok(elements[index as usize].clone())
    }

    /// Evaluates one slice bound; the flag reports a Null bound.
    fn slice_bound(
        &self,
        expression: Option<&Expression>,
        default: i64,
    ) -> ExecResult<(i64, bool)> {
        let Some(expression) = expression else { return Ok((default, false)) };
        match self.eval(expression)? {
            Value::Null => Ok((default, true)),
            Value::Int(i) => Ok((i, false)),
            other => Err(ExecError::type_error(format!(
                "expected an integer as a slice bound, got {}",
                other.type_name()
            ))),
        }
    }

    fn eval_list_slicing(
        &self,
        list: &Expression,
        lower: Option<&Expression>,
        upper: Option<&Expression>,
    ) -> ExecResult<Value> {
        // Type errors on any operand win over null propagation.
        let (upper_value, upper_null) = self.slice_bound(upper, i64::MAX)?;
        let (lower_value, lower_null) = self.slice_bound(lower, 0)?;
        let mut saw_null = upper_null || lower_null;

        let list_value = self.eval(list)?;
        let elements = match list_value {
            Value::List(elements) => elements,
            Value::Null => {
                saw_null = true;
                Vec::new()
            }
            other => {
                return Err(ExecError::type_error(format!(
                    "expected a list to slice, got {}",
                    other.type_name()
                )))
            }
        };
        if saw_null {
            return Ok(Value::Null);
        }

        let normalize = |mut bound: i64| -> usize {
            if bound < 0 {
                bound += elements.len() as i64;
            }
            bound.clamp(0, elements.len() as i64) as usize
        };
        let lower_value = normalize(lower_value);
        let upper_value = normalize(upper_value);
        if upper_value <= lower_value {
            return Ok(Value::List(Vec::new()));
        }
        Ok(Value::List(elements[lower_value..upper_value].to_vec()))
    }

    fn eval_in_list(&self, element: &Expression, list: &Expression) -> ExecResult<Value> {
        let needle = self.eval(element)?;
        let haystack = self.eval(list)?;
        if haystack.is_null() {
            return Ok(Value::Null);
        }
        // A non-list has higher priority than null propagation.
        let elements = match haystack {
            Value::List(elements) => elements,
            other => {
                return Err(ExecError::type_error(format!(
                    "'IN' expected a list, got {}",
                    other.type_name()
                )))
            }
        };
        if needle.is_null() {
            return Ok(Value::Null);
        }
        let mut saw_null = false;
        for element in &elements {
            match needle.equal(element) {
                Value::Bool(true) => return Ok(Value::Bool(true)),
                Value::Bool(false) => {}
                _ => saw_null = true,
            }
        }
        if saw_null {
            Ok(Value::Null)
        } else {
            Ok(Value::Bool(false))
        }
    }

    /// Rebinds any accessors inside the value to the evaluator's view.
    fn switch_value(&self, value: &mut Value) {
        let Some(view) = self.view else { return };
        match value {
            Value::Vertex(vertex) => vertex.switch(view),
            Value::Edge(edge) => edge.switch(view),
            Value::List(elements) => {
                for element in elements {
                    self.switch_value(element);
                }
            }
            Value::Map(entries) => {
                for element in entries.values_mut() {
                    self.switch_value(element);
                }
            }
            _ => {}
        }
    }
}
