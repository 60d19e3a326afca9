//! The dynamic value model used on the frame and in expressions.
//!
//! Query execution is weakly typed: every frame slot and every expression
//! result is a [`Value`]. The arithmetic, logic and comparison rules live
//! here so that the evaluator and the operators can pattern-match instead of
//! re-deriving coercions.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::error::{ExecError, ExecResult};
use crate::graph::{EdgeAccessor, Path, VertexAccessor};

/// A value flowing through the execution pipeline.
///
/// Scalars, collections and graph entity handles share one representation.
/// `Vertex` and `Edge` hold live accessors into the transaction's version
/// chain; their equality is record identity, not content.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null/missing value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point number
    Double(f64),
    /// UTF-8 string
    String(String),
    /// List of values
    List(Vec<Value>),
    /// String-keyed map of values
    Map(BTreeMap<String, Value>),
    /// Handle to a stored vertex
    Vertex(VertexAccessor),
    /// Handle to a stored edge
    Edge(EdgeAccessor),
    /// Alternating vertex/edge sequence
    Path(Path),
}

impl Value {
    /// Returns the name of this value's type, for error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::List(_) => "List",
            Self::Map(_) => "Map",
            Self::Vertex(_) => "Vertex",
            Self::Edge(_) => "Edge",
            Self::Path(_) => "Path",
        }
    }

    /// Returns `true` if the value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` if the value is an Int or a Double.
    #[inline]
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Double(_))
    }

    /// Returns the value as a boolean if it is one.
    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an integer if it is one.
    #[inline]
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a double if it is one.
    #[inline]
    #[must_use]
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the value as a string slice if it is one.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a list slice if it is one.
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the value as a vertex accessor if it is one.
    #[inline]
    #[must_use]
    pub const fn as_vertex(&self) -> Option<&VertexAccessor> {
        match self {
            Self::Vertex(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value as an edge accessor if it is one.
    #[inline]
    #[must_use]
    pub const fn as_edge(&self) -> Option<&EdgeAccessor> {
        match self {
            Self::Edge(e) => Some(e),
            _ => None,
        }
    }

    // ========================================================================
    // Logic (three-valued)
    // ========================================================================

    /// Logical AND with Kleene semantics: `false AND x` is false for any
    /// valid `x`, otherwise Null propagates.
    pub fn and(&self, other: &Value) -> ExecResult<Value> {
        match (self.logic_operand(other, "AND")?, other.logic_operand(self, "AND")?) {
            (Some(false), _) | (_, Some(false)) => Ok(Value::Bool(false)),
            (Some(a), Some(b)) => Ok(Value::Bool(a && b)),
            _ => Ok(Value::Null),
        }
    }

    /// Logical OR with Kleene semantics: `true OR x` is true for any valid
    /// `x`, otherwise Null propagates.
    pub fn or(&self, other: &Value) -> ExecResult<Value> {
        match (self.logic_operand(other, "OR")?, other.logic_operand(self, "OR")?) {
            (Some(true), _) | (_, Some(true)) => Ok(Value::Bool(true)),
            (Some(a), Some(b)) => Ok(Value::Bool(a || b)),
            _ => Ok(Value::Null),
        }
    }

    /// Logical XOR; Null propagates.
    pub fn xor(&self, other: &Value) -> ExecResult<Value> {
        match (self.logic_operand(other, "XOR")?, other.logic_operand(self, "XOR")?) {
            (Some(a), Some(b)) => Ok(Value::Bool(a != b)),
            _ => Ok(Value::Null),
        }
    }

    /// Logical NOT; Null propagates.
    pub fn not(&self) -> ExecResult<Value> {
        match self {
            Self::Null => Ok(Value::Null),
            Self::Bool(b) => Ok(Value::Bool(!b)),
            other => {
                Err(ExecError::type_error(format!("invalid type {} for 'NOT'", other.type_name())))
            }
        }
    }

    fn logic_operand(&self, other: &Value, op: &str) -> ExecResult<Option<bool>> {
        match self {
            Self::Null => Ok(None),
            Self::Bool(b) => Ok(Some(*b)),
            _ => Err(ExecError::type_error(format!(
                "invalid types {} and {} for '{}'",
                self.type_name(),
                other.type_name(),
                op
            ))),
        }
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// Addition. Also concatenates String + String and List + List.
    pub fn add(&self, other: &Value) -> ExecResult<Value> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => Ok(Value::Null),
            (Self::Int(a), Self::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| ExecError::runtime("integer overflow in '+'")),
            (Self::String(a), Self::String(b)) => {
                let mut result = a.clone();
                result.push_str(b);
                Ok(Value::String(result))
            }
            (Self::List(a), Self::List(b)) => {
                let mut result = a.clone();
                result.extend(b.iter().cloned());
                Ok(Value::List(result))
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => Ok(Value::Double(a + b)),
                _ => Err(self.arithmetic_type_error(other, "+")),
            },
        }
    }

    /// Subtraction; numeric only.
    pub fn sub(&self, other: &Value) -> ExecResult<Value> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => Ok(Value::Null),
            (Self::Int(a), Self::Int(b)) => a
                .checked_sub(*b)
                .map(Value::Int)
                .ok_or_else(|| ExecError::runtime("integer overflow in '-'")),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => Ok(Value::Double(a - b)),
                _ => Err(self.arithmetic_type_error(other, "-")),
            },
        }
    }

    /// Multiplication; numeric only.
    pub fn mul(&self, other: &Value) -> ExecResult<Value> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => Ok(Value::Null),
            (Self::Int(a), Self::Int(b)) => a
                .checked_mul(*b)
                .map(Value::Int)
                .ok_or_else(|| ExecError::runtime("integer overflow in '*'")),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => Ok(Value::Double(a * b)),
                _ => Err(self.arithmetic_type_error(other, "*")),
            },
        }
    }

    /// Division. Int / Int truncates; division by integer zero is a runtime
    /// error, floating point division follows IEEE rules.
    pub fn div(&self, other: &Value) -> ExecResult<Value> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => Ok(Value::Null),
            (Self::Int(a), Self::Int(b)) => {
                if *b == 0 {
                    return Err(ExecError::runtime("division by zero"));
                }
                a.checked_div(*b)
                    .map(Value::Int)
                    .ok_or_else(|| ExecError::runtime("integer overflow in '/'"))
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => Ok(Value::Double(a / b)),
                _ => Err(self.arithmetic_type_error(other, "/")),
            },
        }
    }

    /// Modulo, with the same zero and overflow rules as division.
    pub fn rem(&self, other: &Value) -> ExecResult<Value> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => Ok(Value::Null),
            (Self::Int(a), Self::Int(b)) => {
                if *b == 0 {
                    return Err(ExecError::runtime("modulo by zero"));
                }
                a.checked_rem(*b)
                    .map(Value::Int)
                    .ok_or_else(|| ExecError::runtime("integer overflow in '%'"))
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => Ok(Value::Double(a % b)),
                _ => Err(self.arithmetic_type_error(other, "%")),
            },
        }
    }

    /// Unary minus; numeric only.
    pub fn unary_minus(&self) -> ExecResult<Value> {
        match self {
            Self::Null => Ok(Value::Null),
            Self::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| ExecError::runtime("integer overflow in unary '-'")),
            Self::Double(d) => Ok(Value::Double(-d)),
            other => Err(ExecError::type_error(format!(
                "invalid type {} for unary '-'",
                other.type_name()
            ))),
        }
    }

    /// Unary plus; validates the operand is numeric and returns it.
    pub fn unary_plus(&self) -> ExecResult<Value> {
        match self {
            Self::Null | Self::Int(_) | Self::Double(_) => Ok(self.clone()),
            other => Err(ExecError::type_error(format!(
                "invalid type {} for unary '+'",
                other.type_name()
            ))),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    fn arithmetic_type_error(&self, other: &Value, op: &str) -> ExecError {
        ExecError::type_error(format!(
            "invalid types {} and {} for '{}'",
            self.type_name(),
            other.type_name(),
            op
        ))
    }

    // ========================================================================
    // Equality and ordering
    // ========================================================================

    /// Three-valued equality. Any Null operand yields Null; Int and Double
    /// coalesce; lists and maps compare element-wise (an inner Null
    /// comparison makes the whole result Null); vertices, edges and paths
    /// compare by record identity; remaining cross-type pairs are false.
    #[must_use]
    pub fn equal(&self, other: &Value) -> Value {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => Value::Null,
            (Self::Bool(a), Self::Bool(b)) => Value::Bool(a == b),
            (Self::Int(a), Self::Int(b)) => Value::Bool(a == b),
            (Self::Int(a), Self::Double(b)) => Value::Bool((*a as f64) == *b),
            (Self::Double(a), Self::Int(b)) => Value::Bool(*a == (*b as f64)),
            (Self::Double(a), Self::Double(b)) => Value::Bool(a == b),
            (Self::String(a), Self::String(b)) => Value::Bool(a == b),
            (Self::List(a), Self::List(b)) => elementwise_equal(
                a.len() == b.len(),
                a.iter().zip(b.iter()).map(|(x, y)| x.equal(y)),
            ),
            (Self::Map(a), Self::Map(b)) => elementwise_equal(
                a.len() == b.len() && a.keys().eq(b.keys()),
                a.values().zip(b.values()).map(|(x, y)| x.equal(y)),
            ),
            (Self::Vertex(a), Self::Vertex(b)) => Value::Bool(a == b),
            (Self::Edge(a), Self::Edge(b)) => Value::Bool(a == b),
            (Self::Path(a), Self::Path(b)) => Value::Bool(a == b),
            _ => Value::Bool(false),
        }
    }

    /// Equality collapsed to two values, used for Distinct and group-by
    /// keys. A Null result of [`Value::equal`] counts as not equal, so Null
    /// keys never coincide.
    #[must_use]
    pub fn bool_equal(&self, other: &Value) -> bool {
        matches!(self.equal(other), Value::Bool(true))
    }

    /// Three-valued `<`. Null propagates; comparing non-numeric values of
    /// different types, or values without an order, is a type error.
    pub fn less(&self, other: &Value) -> ExecResult<Value> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => Ok(Value::Null),
            (Self::Int(a), Self::Int(b)) => Ok(Value::Bool(a < b)),
            (Self::Int(a), Self::Double(b)) => Ok(Value::Bool((*a as f64) < *b)),
            (Self::Double(a), Self::Int(b)) => Ok(Value::Bool(*a < (*b as f64))),
            (Self::Double(a), Self::Double(b)) => Ok(Value::Bool(a < b)),
            (Self::String(a), Self::String(b)) => Ok(Value::Bool(a < b)),
            _ => Err(ExecError::type_error(format!(
                "can't compare value of type {} to value of type {}",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    /// Three-valued `<=`, derived from [`Value::less`] and [`Value::equal`].
    pub fn less_equal(&self, other: &Value) -> ExecResult<Value> {
        match self.less(other)? {
            Value::Bool(true) => Ok(Value::Bool(true)),
            Value::Null => Ok(Value::Null),
            _ => Ok(self.equal(other)),
        }
    }

    /// Three-valued `>`.
    pub fn greater(&self, other: &Value) -> ExecResult<Value> {
        other.less(self)
    }

    /// Three-valued `>=`.
    pub fn greater_equal(&self, other: &Value) -> ExecResult<Value> {
        other.less_equal(self)
    }

    /// The sort comparator used by OrderBy and MIN/MAX: is `self` ordered
    /// strictly before `other`?
    ///
    /// Null sorts after every non-null value and is not less than Null.
    /// Bools order false before true, numbers order across Int/Double,
    /// strings lexicographically. Lists, maps, vertices, edges and paths
    /// have no order.
    pub fn sort_less(&self, other: &Value) -> ExecResult<bool> {
        // Null < anything is false; anything < Null is true.
        if self.is_null() {
            return Ok(false);
        }
        if other.is_null() {
            return Ok(true);
        }
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Ok(!*a && *b),
            (Self::Int(a), Self::Int(b)) => Ok(a < b),
            (Self::Int(a), Self::Double(b)) => Ok((*a as f64) < *b),
            (Self::Double(a), Self::Int(b)) => Ok(*a < (*b as f64)),
            (Self::Double(a), Self::Double(b)) => Ok(a < b),
            (Self::String(a), Self::String(b)) => Ok(a < b),
            (a, b) if a.type_name() == b.type_name() => Err(ExecError::type_error(format!(
                "comparison is not defined for values of type {}",
                a.type_name()
            ))),
            (a, b) => Err(ExecError::type_error(format!(
                "can't compare value of type {} to value of type {}",
                a.type_name(),
                b.type_name()
            ))),
        }
    }

    /// Feeds this value into a hasher, compatibly with [`Value::bool_equal`]:
    /// a Double holding an exactly-representable integer hashes like the
    /// corresponding Int.
    pub fn hash_group<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => state.write_u8(0),
            Self::Bool(b) => {
                state.write_u8(1);
                b.hash(state);
            }
            Self::Int(i) => {
                state.write_u8(2);
                i.hash(state);
            }
            Self::Double(d) => {
                state.write_u8(2);
                // Int(n) and Double(n.0) are equal, so they must hash alike.
                if d.fract() == 0.0 && *d >= i64::MIN as f64 && *d <= i64::MAX as f64 {
                    (*d as i64).hash(state);
                } else {
                    d.to_bits().hash(state);
                }
            }
            Self::String(s) => {
                state.write_u8(3);
                s.hash(state);
            }
            Self::List(l) => {
                state.write_u8(4);
                state.write_usize(l.len());
                for v in l {
                    v.hash_group(state);
                }
            }
            Self::Map(m) => {
                state.write_u8(5);
                state.write_usize(m.len());
                for (k, v) in m {
                    k.hash(state);
                    v.hash_group(state);
                }
            }
            Self::Vertex(v) => {
                state.write_u8(6);
                v.id().hash(state);
            }
            Self::Edge(e) => {
                state.write_u8(7);
                e.id().hash(state);
            }
            Self::Path(p) => {
                state.write_u8(8);
                for v in p.vertices() {
                    v.id().hash(state);
                }
                for e in p.edges() {
                    e.id().hash(state);
                }
            }
        }
    }
}

/// Folds element-wise three-valued equality results: all true is true, any
/// false is false, otherwise Null. `shape_matches` short-circuits on
/// length/key mismatches.
fn elementwise_equal(shape_matches: bool, results: impl Iterator<Item = Value>) -> Value {
    if !shape_matches {
        return Value::Bool(false);
    }
    let mut saw_null = false;
    for result in results {
        match result {
            Value::Bool(false) => return Value::Bool(false),
            Value::Bool(true) => {}
            _ => saw_null = true,
        }
    }
    if saw_null {
        Value::Null
    } else {
        Value::Bool(true)
    }
}

/// Compares two key lists for Distinct and group-by identity.
#[must_use]
pub(crate) fn list_bool_equal(left: &[Value], right: &[Value]) -> bool {
    left.len() == right.len() && left.iter().zip(right.iter()).all(|(a, b)| a.bool_equal(b))
}

/// Hashes a key list compatibly with [`list_bool_equal`].
#[must_use]
pub(crate) fn hash_value_list(values: &[Value]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for value in values {
        value.hash_group(&mut hasher);
    }
    hasher.finish()
}

impl From<bool> for Value {
    #[inline]
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<String> for Value {
    #[inline]
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<Vec<Value>> for Value {
    #[inline]
    fn from(l: Vec<Value>) -> Self {
        Self::List(l)
    }
}
