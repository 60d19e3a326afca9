//! Logical operators and cursor construction.
//!
//! A plan is a tree of [`LogicalOperator`] variants, each wrapping one
//! configuration struct. Plans are immutable after construction; executing
//! one means asking the root for a cursor, which recursively wraps the
//! input cursors ([`LogicalOperator::make_cursor`]).
//!
//! Most operators take their input as an owned boxed child. `Merge` and
//! `Optional` additionally own the branch subtrees they drive per input
//! row.

use crate::exec::accumulate::AccumulateCursor;
use crate::exec::aggregate::AggregateCursor;
use crate::exec::create::{CreateExpandCursor, CreateNodeCursor};
use crate::exec::delete::DeleteCursor;
use crate::exec::distinct::DistinctCursor;
use crate::exec::expand::{ExpandCursor, ExpandUniquenessFilterCursor};
use crate::exec::filter::FilterCursor;
use crate::exec::index::CreateIndexCursor;
use crate::exec::limit::{LimitCursor, SkipCursor};
use crate::exec::merge::{MergeCursor, OptionalCursor};
use crate::exec::project::ProduceCursor;
use crate::exec::remove::{RemoveLabelsCursor, RemovePropertyCursor};
use crate::exec::scan::{OnceCursor, ScanCursor};
use crate::exec::set::{SetLabelsCursor, SetPropertiesCursor, SetPropertyCursor};
use crate::exec::sort::OrderByCursor;
use crate::exec::unwind::UnwindCursor;
use crate::exec::BoxedCursor;
use crate::eval::ExpressionEvaluator;
use crate::expr::Expression;
use crate::graph::{
    BoundKind, Direction, DynGraph, EdgeTypeId, LabelId, PropertyId, PropertyValue, RangeBound,
    View,
};
use crate::symbol::{Frame, Symbol};
use std::sync::Arc;

/// Sort direction for one OrderBy key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    /// Ascending; nulls come last.
    Asc,
    /// Descending; the ascending comparison reversed, nulls first.
    Desc,
}

/// An aggregation reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationOp {
    /// Row/value count.
    Count,
    /// Numeric sum.
    Sum,
    /// Minimum under the sort order.
    Min,
    /// Maximum under the sort order.
    Max,
    /// Numeric average.
    Avg,
    /// Collect values into a list.
    Collect,
}

/// One aggregation: an optional input expression, a reducer and an output
/// symbol. A missing input expression is `COUNT(*)`.
#[derive(Debug, Clone)]
pub struct AggregationSpec {
    /// What to aggregate; absent for `COUNT(*)`.
    pub input: Option<Expression>,
    /// The reducer.
    pub op: AggregationOp,
    /// Where the result lands on the frame.
    pub output_symbol: Symbol,
}

/// One projection of [`Produce`].
#[derive(Debug, Clone)]
pub struct NamedExpression {
    /// The user-facing column name.
    pub name: String,
    /// The projected expression.
    pub expression: Expression,
    /// Where the result lands on the frame.
    pub symbol: Symbol,
}

/// A node pattern to create: symbol, labels and property initializers.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    /// Where the created vertex lands on the frame.
    pub symbol: Symbol,
    /// Labels to assign.
    pub labels: Vec<LabelId>,
    /// Property initializers, evaluated under the NEW view.
    pub properties: Vec<(PropertyId, Expression)>,
}

/// An edge pattern to create.
#[derive(Debug, Clone)]
pub struct EdgeSpec {
    /// Where the created edge lands on the frame.
    pub symbol: Symbol,
    /// The edge type.
    pub edge_type: EdgeTypeId,
    /// Direction relative to the origin vertex.
    pub direction: Direction,
    /// Property initializers, evaluated under the NEW view.
    pub properties: Vec<(PropertyId, Expression)>,
}

/// A range scan bound: an expression evaluated per parent row plus
/// inclusivity.
#[derive(Debug, Clone)]
pub struct Bound {
    /// The bound expression.
    pub value: Expression,
    /// Whether the bound is inclusive or exclusive.
    pub kind: BoundKind,
}

/// Whether [`ExpandUniquenessFilter`] compares vertices or edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniquenessKind {
    /// Compare vertex handles.
    Vertex,
    /// Compare edge handles.
    Edge,
}

/// How [`SetProperties`] treats the target's existing properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertiesOp {
    /// Merge the source properties into the existing ones.
    Update,
    /// Clear existing properties first.
    Replace,
}

/// Yields exactly one empty row. The leaf of mutation-only pipelines.
#[derive(Debug, Clone, Default)]
pub struct Once;

/// Creates a vertex per input row. See [`NodeSpec`].
#[derive(Debug)]
pub struct CreateNode {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// What to create.
    pub node: NodeSpec,
}

/// Creates an edge (and possibly its far vertex) per input row, starting
/// from an already-bound origin vertex.
#[derive(Debug)]
pub struct CreateExpand {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Symbol holding the origin vertex.
    pub input_symbol: Symbol,
    /// The far vertex; created unless `existing_node`.
    pub node: NodeSpec,
    /// The edge to create. A `Both` direction picks an arbitrary one; the
    /// planner only produces it for MERGE.
    pub edge: EdgeSpec,
    /// Read the far vertex from the frame instead of creating it.
    pub existing_node: bool,
}

/// Scans all vertices under a view.
#[derive(Debug)]
pub struct ScanAll {
    /// The input operator; the scan restarts per input row.
    pub input: Box<LogicalOperator>,
    /// Where scanned vertices land on the frame.
    pub output_symbol: Symbol,
    /// The view the scan observes.
    pub view: View,
}

/// Scans vertices carrying a label.
#[derive(Debug)]
pub struct ScanAllByLabel {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Where scanned vertices land on the frame.
    pub output_symbol: Symbol,
    /// The label to scan.
    pub label: LabelId,
    /// The view the scan observes.
    pub view: View,
}

/// Scans vertices whose property equals an expression evaluated per input
/// row. A Null value yields no rows for that input row.
#[derive(Debug)]
pub struct ScanAllByLabelPropertyValue {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Where scanned vertices land on the frame.
    pub output_symbol: Symbol,
    /// The label to scan.
    pub label: LabelId,
    /// The indexed property.
    pub property: PropertyId,
    /// The lookup value, evaluated per input row.
    pub expression: Expression,
    /// The view the scan observes.
    pub view: View,
}

/// Scans vertices whose property falls in a range; at least one bound must
/// be present. A Null bound yields no rows for that input row.
#[derive(Debug)]
pub struct ScanAllByLabelPropertyRange {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Where scanned vertices land on the frame.
    pub output_symbol: Symbol,
    /// The label to scan.
    pub label: LabelId,
    /// The indexed property.
    pub property: PropertyId,
    /// Lower bound, if present.
    pub lower_bound: Option<Bound>,
    /// Upper bound, if present.
    pub upper_bound: Option<Bound>,
    /// The view the scan observes.
    pub view: View,
}

/// Produces one row per edge incident to a bound origin vertex.
#[derive(Debug)]
pub struct Expand {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Symbol holding the origin vertex.
    pub input_symbol: Symbol,
    /// Where the far vertex lands, or is matched from if `existing_node`.
    pub node_symbol: Symbol,
    /// Where the edge lands, or is matched from if `existing_edge`.
    pub edge_symbol: Symbol,
    /// Which incident edges to enumerate.
    pub direction: Direction,
    /// Compare against an already-bound far vertex instead of binding.
    pub existing_node: bool,
    /// Compare against an already-bound edge instead of binding.
    pub existing_edge: bool,
    /// The view the expansion observes.
    pub view: View,
}

/// Rejects rows whose expansion handle equals any previously bound one;
/// Cypher's edge-uniqueness rule.
#[derive(Debug)]
pub struct ExpandUniquenessFilter {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// The freshly bound handle.
    pub expand_symbol: Symbol,
    /// Previously bound handles to compare against.
    pub previous_symbols: Vec<Symbol>,
    /// Whether vertices or edges are compared.
    pub kind: UniquenessKind,
}

/// Keeps rows whose predicate evaluates to true under the OLD view; Null is
/// treated as false.
#[derive(Debug)]
pub struct Filter {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// The predicate.
    pub expression: Expression,
}

/// Evaluates named expressions under the NEW view and writes them to their
/// output symbols. Streaming.
#[derive(Debug)]
pub struct Produce {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// The projections.
    pub named_expressions: Vec<NamedExpression>,
}

/// Deletes the entities its expressions evaluate to; edges before vertices.
#[derive(Debug)]
pub struct Delete {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Expressions naming the entities to delete.
    pub expressions: Vec<Expression>,
    /// Also remove incident edges of deleted vertices.
    pub detach: bool,
}

/// Sets one property on the entity a lookup expression names.
#[derive(Debug)]
pub struct SetProperty {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Expression yielding the target vertex or edge.
    pub lhs_expression: Expression,
    /// The property to set.
    pub property: PropertyId,
    /// The value, evaluated under the NEW view.
    pub rhs: Expression,
}

/// Copies properties onto a bound entity from a record or a map.
#[derive(Debug)]
pub struct SetProperties {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Symbol holding the target vertex or edge.
    pub input_symbol: Symbol,
    /// The property source, evaluated under the NEW view.
    pub rhs: Expression,
    /// Merge or replace semantics.
    pub op: PropertiesOp,
}

/// Adds labels to a bound vertex, idempotently.
#[derive(Debug)]
pub struct SetLabels {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Symbol holding the target vertex.
    pub input_symbol: Symbol,
    /// Labels to add.
    pub labels: Vec<LabelId>,
}

/// Removes one property from the entity a lookup expression names.
#[derive(Debug)]
pub struct RemoveProperty {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Expression yielding the target vertex or edge.
    pub lhs_expression: Expression,
    /// The property to remove.
    pub property: PropertyId,
}

/// Removes labels from a bound vertex, idempotently.
#[derive(Debug)]
pub struct RemoveLabels {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Symbol holding the target vertex.
    pub input_symbol: Symbol,
    /// Labels to remove.
    pub labels: Vec<LabelId>,
}

/// Blocking cache of the declared symbols; optionally ends the command
/// before emitting, reconstructing every cached accessor.
#[derive(Debug)]
pub struct Accumulate {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Symbols to cache and re-emit.
    pub symbols: Vec<Symbol>,
    /// Call `advance_command` after draining the input.
    pub advance_command: bool,
}

/// Blocking group-by aggregation.
#[derive(Debug)]
pub struct Aggregate {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// The aggregations to compute per group.
    pub aggregations: Vec<AggregationSpec>,
    /// Group key expressions; empty means one global group.
    pub group_by: Vec<Expression>,
    /// Symbols whose first-row values are re-emitted per group.
    pub remember: Vec<Symbol>,
}

/// Discards the first N input rows; N evaluated once, must be Int ≥ 0.
#[derive(Debug)]
pub struct Skip {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// The row count expression.
    pub expression: Expression,
}

/// Passes through at most N input rows; N evaluated once, must be Int ≥ 0.
#[derive(Debug)]
pub struct Limit {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// The row count expression.
    pub expression: Expression,
}

/// Blocking sort over the input; emits the output symbols in sorted order.
#[derive(Debug)]
pub struct OrderBy {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Key expressions with their directions, most significant first.
    pub order_by: Vec<(Ordering, Expression)>,
    /// Symbols whose values are carried through and re-emitted.
    pub output_symbols: Vec<Symbol>,
}

/// Emits only rows whose value-symbol tuple has not been seen before.
#[derive(Debug)]
pub struct Distinct {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// Symbols forming the identity tuple.
    pub value_symbols: Vec<Symbol>,
}

/// MERGE: per input row, iterate all matches, or create exactly once when
/// there are none.
#[derive(Debug)]
pub struct Merge {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// The match branch, reset per input row.
    pub merge_match: Box<LogicalOperator>,
    /// The create branch, pulled once when the match branch yields nothing.
    pub merge_create: Box<LogicalOperator>,
}

/// OPTIONAL MATCH: per input row, emit the branch's rows, or one row with
/// the optional symbols nulled when the branch yields nothing.
#[derive(Debug)]
pub struct Optional {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// The optional branch, reset per input row.
    pub optional: Box<LogicalOperator>,
    /// Symbols nulled when the branch yields nothing.
    pub optional_symbols: Vec<Symbol>,
}

/// Emits one row per element of a list expression.
#[derive(Debug)]
pub struct Unwind {
    /// The input operator.
    pub input: Box<LogicalOperator>,
    /// The list expression, evaluated per input row.
    pub input_expression: Expression,
    /// Where elements land on the frame.
    pub output_symbol: Symbol,
}

/// DDL: builds an index on `(label, property)` on the first pull. An
/// already-existing index is ignored.
#[derive(Debug)]
pub struct CreateIndex {
    /// The label to index.
    pub label: LabelId,
    /// The property to index.
    pub property: PropertyId,
}

/// A logical plan operator.
///
/// The variant set mirrors the runtime pipeline one to one; each variant's
/// struct documents its semantics.
#[derive(Debug)]
pub enum LogicalOperator {
    /// See [`Once`].
    Once(Once),
    /// See [`CreateNode`].
    CreateNode(CreateNode),
    /// See [`CreateExpand`].
    CreateExpand(CreateExpand),
    /// See [`ScanAll`].
    ScanAll(ScanAll),
    /// See [`ScanAllByLabel`].
    ScanAllByLabel(ScanAllByLabel),
    /// See [`ScanAllByLabelPropertyValue`].
    ScanAllByLabelPropertyValue(ScanAllByLabelPropertyValue),
    /// See [`ScanAllByLabelPropertyRange`].
    ScanAllByLabelPropertyRange(ScanAllByLabelPropertyRange),
    /// See [`Expand`].
    Expand(Expand),
    /// See [`ExpandUniquenessFilter`].
    ExpandUniquenessFilter(ExpandUniquenessFilter),
    /// See [`Filter`].
    Filter(Filter),
    /// See [`Produce`].
    Produce(Produce),
    /// See [`Delete`].
    Delete(Delete),
    /// See [`SetProperty`].
    SetProperty(SetProperty),
    /// See [`SetProperties`].
    SetProperties(SetProperties),
    /// See [`SetLabels`].
    SetLabels(SetLabels),
    /// See [`RemoveProperty`].
    RemoveProperty(RemoveProperty),
    /// See [`RemoveLabels`].
    RemoveLabels(RemoveLabels),
    /// See [`Accumulate`].
    Accumulate(Accumulate),
    /// See [`Aggregate`].
    Aggregate(Aggregate),
    /// See [`Skip`].
    Skip(Skip),
    /// See [`Limit`].
    Limit(Limit),
    /// See [`OrderBy`].
    OrderBy(OrderBy),
    /// See [`Distinct`].
    Distinct(Distinct),
    /// See [`Merge`].
    Merge(Merge),
    /// See [`Optional`].
    Optional(Optional),
    /// See [`Unwind`].
    Unwind(Unwind),
    /// See [`CreateIndex`].
    CreateIndex(CreateIndex),
}

impl LogicalOperator {
    /// Compiles this operator (and recursively its inputs) into a cursor.
    ///
    /// The cursor borrows the plan; plans outlive their executions.
    pub fn make_cursor<'a>(&'a self, db: &DynGraph) -> BoxedCursor<'a> {
        match self {
            Self::Once(_) => Box::new(OnceCursor::new()),
            Self::CreateNode(node) => {
                Box::new(CreateNodeCursor::new(node, Arc::clone(db), node.input.make_cursor(db)))
            }
            Self::CreateExpand(node) => {
                Box::new(CreateExpandCursor::new(node, Arc::clone(db), node.input.make_cursor(db)))
            }
            Self::ScanAll(node) => {
                let graph = Arc::clone(db);
                let view = node.view;
                let produce = move |_frame: &Frame| Ok(Some(graph.vertices(view)));
                Box::new(ScanCursor::new(
                    &node.output_symbol,
                    view,
                    node.input.make_cursor(db),
                    Arc::clone(db),
                    produce,
                ))
            }
            Self::ScanAllByLabel(node) => {
                let graph = Arc::clone(db);
                let view = node.view;
                let label = node.label;
                let produce = move |_frame: &Frame| Ok(Some(graph.vertices_by_label(label, view)));
                Box::new(ScanCursor::new(
                    &node.output_symbol,
                    view,
                    node.input.make_cursor(db),
                    Arc::clone(db),
                    produce,
                ))
            }
            Self::ScanAllByLabelPropertyValue(node) => {
                let graph = Arc::clone(db);
                let produce = move |frame: &Frame| {
                    let evaluator = ExpressionEvaluator::new(frame, node.view);
                    let value = evaluator.eval(&node.expression)?;
                    if value.is_null() {
                        return Ok(None);
                    }
                    let stored = PropertyValue::try_from(&value)?;
                    Ok(Some(graph.vertices_by_property_value(
                        node.label,
                        node.property,
                        &stored,
                        node.view,
                    )))
                };
                Box::new(ScanCursor::new(
                    &node.output_symbol,
                    node.view,
                    node.input.make_cursor(db),
                    Arc::clone(db),
                    produce,
                ))
            }
            Self::ScanAllByLabelPropertyRange(node) => {
                debug_assert!(
                    node.lower_bound.is_some() || node.upper_bound.is_some(),
                    "a range scan needs at least one bound"
                );
                let graph = Arc::clone(db);
                let produce = move |frame: &Frame| {
                    let evaluator = ExpressionEvaluator::new(frame, node.view);
                    let mut lower = None;
                    if let Some(bound) = &node.lower_bound {
                        let value = evaluator.eval(&bound.value)?;
                        if value.is_null() {
                            return Ok(None);
                        }
                        lower =
                            Some(RangeBound { value: PropertyValue::try_from(&value)?, kind: bound.kind });
                    }
                    let mut upper = None;
                    if let Some(bound) = &node.upper_bound {
                        let value = evaluator.eval(&bound.value)?;
                        if value.is_null() {
                            return Ok(None);
                        }
                        upper =
                            Some(RangeBound { value: PropertyValue::try_from(&value)?, kind: bound.kind });
                    }
                    Ok(Some(graph.vertices_by_property_range(
                        node.label,
                        node.property,
                        lower.as_ref(),
                        upper.as_ref(),
                        node.view,
                    )))
                };
                Box::new(ScanCursor::new(
                    &node.output_symbol,
                    node.view,
                    node.input.make_cursor(db),
                    Arc::clone(db),
                    produce,
                ))
            }
            Self::Expand(node) => {
                Box::new(ExpandCursor::new(node, Arc::clone(db), node.input.make_cursor(db)))
            }
            Self::ExpandUniquenessFilter(node) => {
                Box::new(ExpandUniquenessFilterCursor::new(node, node.input.make_cursor(db)))
            }
            Self::Filter(node) => Box::new(FilterCursor::new(node, node.input.make_cursor(db))),
            Self::Produce(node) => Box::new(ProduceCursor::new(node, node.input.make_cursor(db))),
            Self::Delete(node) => {
                Box::new(DeleteCursor::new(node, Arc::clone(db), node.input.make_cursor(db)))
            }
            Self::SetProperty(node) => {
                Box::new(SetPropertyCursor::new(node, node.input.make_cursor(db)))
            }
            Self::SetProperties(node) => {
                Box::new(SetPropertiesCursor::new(node, Arc::clone(db), node.input.make_cursor(db)))
            }
            Self::SetLabels(node) => {
                Box::new(SetLabelsCursor::new(node, node.input.make_cursor(db)))
            }
            Self::RemoveProperty(node) => {
                Box::new(RemovePropertyCursor::new(node, node.input.make_cursor(db)))
            }
            Self::RemoveLabels(node) => {
                Box::new(RemoveLabelsCursor::new(node, node.input.make_cursor(db)))
            }
            Self::Accumulate(node) => {
                Box::new(AccumulateCursor::new(node, Arc::clone(db), node.input.make_cursor(db)))
            }
            Self::Aggregate(node) => {
                Box::new(AggregateCursor::new(node, Arc::clone(db), node.input.make_cursor(db)))
            }
            Self::Skip(node) => Box::new(SkipCursor::new(node, node.input.make_cursor(db))),
            Self::Limit(node) => Box::new(LimitCursor::new(node, node.input.make_cursor(db))),
            Self::OrderBy(node) => {
                Box::new(OrderByCursor::new(node, Arc::clone(db), node.input.make_cursor(db)))
            }
            Self::Distinct(node) => {
                Box::new(DistinctCursor::new(node, node.input.make_cursor(db)))
            }
            Self::Merge(node) => Box::new(MergeCursor::new(
                node.input.make_cursor(db),
                node.merge_match.make_cursor(db),
                node.merge_create.make_cursor(db),
            )),
            Self::Optional(node) => Box::new(OptionalCursor::new(
                node,
                node.input.make_cursor(db),
                node.optional.make_cursor(db),
            )),
            Self::Unwind(node) => {
                Box::new(UnwindCursor::new(node, Arc::clone(db), node.input.make_cursor(db)))
            }
            Self::CreateIndex(node) => Box::new(CreateIndexCursor::new(node, Arc::clone(db))),
        }
    }
}
