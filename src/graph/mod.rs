//! Graph storage contract for query execution.
//!
//! This module defines the [`GraphBackend`] trait the engine pulls records
//! through, the cheap accessor handles that live on the frame
//! ([`VertexAccessor`], [`EdgeAccessor`]), and the storable
//! [`PropertyValue`] subset of the value model. The trait is object-safe;
//! cursors hold it as `Arc<dyn GraphBackend>`.

pub mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ExecError, ExecResult};
use crate::value::Value;

/// Identifier of a stored vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(u64);

impl VertexId {
    /// Creates a vertex id from its raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// Identifier of a stored edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u64);

impl EdgeId {
    /// Creates an edge id from its raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// Interned label name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(u32);

impl LabelId {
    /// Creates a label id from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Interned property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(u32);

impl PropertyId {
    /// Creates a property id from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Interned edge type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeTypeId(u32);

impl EdgeTypeId {
    /// Creates an edge type id from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Which state of the transaction a read observes.
///
/// `Old` is the state at the last command boundary, `New` additionally sees
/// the changes made by the current command. Evaluating "as is" (no
/// rebinding) is expressed by the absence of a view, not a third variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// The state at the last command boundary.
    Old,
    /// The working state of the current command.
    New,
}

/// Direction of an expansion relative to the origin vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow edges pointing at the origin.
    In,
    /// Follow edges leaving the origin.
    Out,
    /// Follow edges in both directions.
    Both,
}

/// A value that can be stored as a property on a vertex or edge.
///
/// This is the storable subset of [`Value`]: entity handles and paths are
/// not property material. Conversion from `Value` is the single storability
/// check used by every mutating operator.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point number
    Double(f64),
    /// UTF-8 string
    String(String),
    /// List of property values
    List(Vec<PropertyValue>),
    /// String-keyed map of property values
    Map(BTreeMap<String, PropertyValue>),
}

impl TryFrom<&Value> for PropertyValue {
    type Error = ExecError;

    fn try_from(value: &Value) -> ExecResult<Self> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Int(i) => Ok(Self::Int(*i)),
            Value::Double(d) => Ok(Self::Double(*d)),
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::List(l) => {
                Ok(Self::List(l.iter().map(Self::try_from).collect::<ExecResult<_>>()?))
            }
            Value::Map(m) => Ok(Self::Map(
                m.iter()
                    .map(|(k, v)| Ok((k.clone(), Self::try_from(v)?)))
                    .collect::<ExecResult<_>>()?,
            )),
            other => Err(ExecError::runtime(format!(
                "'{}' cannot be used as a property value",
                other.type_name()
            ))),
        }
    }
}

impl From<PropertyValue> for Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Null => Self::Null,
            PropertyValue::Bool(b) => Self::Bool(b),
            PropertyValue::Int(i) => Self::Int(i),
            PropertyValue::Double(d) => Self::Double(d),
            PropertyValue::String(s) => Self::String(s),
            PropertyValue::List(l) => Self::List(l.into_iter().map(Value::from).collect()),
            PropertyValue::Map(m) => {
                Self::Map(m.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Whether a range scan bound includes its endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    /// The endpoint itself satisfies the bound.
    Inclusive,
    /// The endpoint does not satisfy the bound.
    Exclusive,
}

/// An evaluated bound handed to an index range scan.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    /// The bound's value.
    pub value: PropertyValue,
    /// Whether the bound is inclusive or exclusive.
    pub kind: BoundKind,
}

/// The contract the engine requires from the storage layer.
///
/// All record operations are addressed by id plus [`View`]. A read or write
/// aimed at a record whose version under the requested view is gone fails
/// with a [`ExecError::Runtime`] deleted-record error; this is what stops
/// mutation downstream of a DELETE in the same query.
pub trait GraphBackend: Send + Sync {
    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Inserts a new vertex, visible to the NEW view of the current command.
    fn insert_vertex(&self) -> VertexId;

    /// Inserts a new edge between two vertices.
    fn insert_edge(
        &self,
        from: VertexId,
        to: VertexId,
        edge_type: EdgeTypeId,
    ) -> ExecResult<EdgeId>;

    /// Removes a vertex. Without `detach`, returns `Ok(false)` if the vertex
    /// still has incident edges in the NEW view; with `detach`, incident
    /// edges are removed first.
    fn remove_vertex(&self, vertex: VertexId, detach: bool) -> ExecResult<bool>;

    /// Removes an edge. Removing an already-removed edge is a no-op.
    fn remove_edge(&self, edge: EdgeId) -> ExecResult<()>;

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// All vertices visible under the view, in insertion order.
    fn vertices(&self, view: View) -> Vec<VertexId>;

    /// Vertices carrying the label, through the label index.
    fn vertices_by_label(&self, label: LabelId, view: View) -> Vec<VertexId>;

    /// Vertices with the label whose property equals the value. Numeric
    /// equality coalesces Int and Double.
    fn vertices_by_property_value(
        &self,
        label: LabelId,
        property: PropertyId,
        value: &PropertyValue,
        view: View,
    ) -> Vec<VertexId>;

    /// Vertices with the label whose property falls in the range. Rows whose
    /// property type cannot be ordered against a bound are filtered out
    /// silently.
    fn vertices_by_property_range(
        &self,
        label: LabelId,
        property: PropertyId,
        lower: Option<&RangeBound>,
        upper: Option<&RangeBound>,
        view: View,
    ) -> Vec<VertexId>;

    // ------------------------------------------------------------------
    // Vertex record operations
    // ------------------------------------------------------------------

    /// Is the vertex visible under the view?
    fn vertex_exists(&self, vertex: VertexId, view: View) -> bool;

    /// Reads one property; `None` when the vertex has no such property.
    fn vertex_property(
        &self,
        vertex: VertexId,
        view: View,
        property: PropertyId,
    ) -> ExecResult<Option<PropertyValue>>;

    /// Reads all properties of the vertex under the view.
    fn vertex_properties(
        &self,
        vertex: VertexId,
        view: View,
    ) -> ExecResult<Vec<(PropertyId, PropertyValue)>>;

    /// Writes one property on the working version.
    fn set_vertex_property(
        &self,
        vertex: VertexId,
        property: PropertyId,
        value: PropertyValue,
    ) -> ExecResult<()>;

    /// Erases one property from the working version.
    fn erase_vertex_property(&self, vertex: VertexId, property: PropertyId) -> ExecResult<()>;

    /// Erases all properties from the working version.
    fn clear_vertex_properties(&self, vertex: VertexId) -> ExecResult<()>;

    /// Adds a label; adding a present label is a no-op.
    fn add_vertex_label(&self, vertex: VertexId, label: LabelId) -> ExecResult<()>;

    /// Removes a label; removing an absent label is a no-op.
    fn remove_vertex_label(&self, vertex: VertexId, label: LabelId) -> ExecResult<()>;

    /// Reads the labels of the vertex under the view.
    fn vertex_labels(&self, vertex: VertexId, view: View) -> ExecResult<Vec<LabelId>>;

    /// Edges pointing at the vertex, under the view.
    fn vertex_in_edges(&self, vertex: VertexId, view: View) -> ExecResult<Vec<EdgeId>>;

    /// Edges leaving the vertex, under the view.
    fn vertex_out_edges(&self, vertex: VertexId, view: View) -> ExecResult<Vec<EdgeId>>;

    // ------------------------------------------------------------------
    // Edge record operations
    // ------------------------------------------------------------------

    /// Is the edge visible under the view?
    fn edge_exists(&self, edge: EdgeId, view: View) -> bool;

    /// Reads one property; `None` when the edge has no such property.
    fn edge_property(
        &self,
        edge: EdgeId,
        view: View,
        property: PropertyId,
    ) -> ExecResult<Option<PropertyValue>>;

    /// Reads all properties of the edge under the view.
    fn edge_properties(
        &self,
        edge: EdgeId,
        view: View,
    ) -> ExecResult<Vec<(PropertyId, PropertyValue)>>;

    /// Writes one property on the working version.
    fn set_edge_property(
        &self,
        edge: EdgeId,
        property: PropertyId,
        value: PropertyValue,
    ) -> ExecResult<()>;

    /// Erases one property from the working version.
    fn erase_edge_property(&self, edge: EdgeId, property: PropertyId) -> ExecResult<()>;

    /// Erases all properties from the working version.
    fn clear_edge_properties(&self, edge: EdgeId) -> ExecResult<()>;

    /// The edge's endpoints as `(from, to)`. Endpoints are immutable.
    fn edge_endpoints(&self, edge: EdgeId) -> (VertexId, VertexId);

    /// The edge's type. Immutable.
    fn edge_type(&self, edge: EdgeId) -> EdgeTypeId;

    // ------------------------------------------------------------------
    // Name interning
    // ------------------------------------------------------------------

    /// Interns a label name.
    fn label_id(&self, name: &str) -> LabelId;

    /// Resolves a label id back to its name.
    fn label_name(&self, label: LabelId) -> String;

    /// Interns a property name.
    fn property_id(&self, name: &str) -> PropertyId;

    /// Resolves a property id back to its name.
    fn property_name(&self, property: PropertyId) -> String;

    /// Interns an edge type name.
    fn edge_type_id(&self, name: &str) -> EdgeTypeId;

    /// Resolves an edge type id back to its name.
    fn edge_type_name(&self, edge_type: EdgeTypeId) -> String;

    // ------------------------------------------------------------------
    // Index and estimates
    // ------------------------------------------------------------------

    /// Builds an index over `(label, property)`. Fails with
    /// [`ExecError::IndexExists`] if one is already present.
    fn build_index(&self, label: LabelId, property: PropertyId) -> ExecResult<()>;

    /// Estimated vertex count. May over-estimate, never under-reports
    /// visible rows.
    fn vertices_count(&self) -> usize;

    /// Estimated count of vertices with the label.
    fn vertices_count_by_label(&self, label: LabelId) -> usize;

    /// Estimated count of vertices with the label whose property equals the
    /// value.
    fn vertices_count_by_property_value(
        &self,
        label: LabelId,
        property: PropertyId,
        value: &PropertyValue,
    ) -> usize;

    /// Estimated count of vertices with the label whose property falls in
    /// the range.
    fn vertices_count_by_property_range(
        &self,
        label: LabelId,
        property: PropertyId,
        lower: Option<&RangeBound>,
        upper: Option<&RangeBound>,
    ) -> usize;

    // ------------------------------------------------------------------
    // Transaction clock and cancellation
    // ------------------------------------------------------------------

    /// Ends the current command: the NEW state becomes the OLD state of the
    /// next command.
    fn advance_command(&self);

    /// Cooperative cancellation signal, polled before row-producing steps.
    fn should_abort(&self) -> bool;
}

/// Shared handle to a graph backend.
pub type DynGraph = Arc<dyn GraphBackend>;

/// Property and version operations shared by vertex and edge accessors.
pub trait RecordAccessor {
    /// Rebinds the accessor to the requested view.
    fn switch(&mut self, view: View);

    /// Re-resolves visibility under the current command. Returns `false`
    /// when the record is no longer visible (deleted in this transaction).
    fn reconstruct(&mut self) -> bool;

    /// Reads one property under the accessor's view; missing properties
    /// read as Null.
    fn property(&self, property: PropertyId) -> ExecResult<Value>;

    /// Reads all properties under the accessor's view.
    fn properties(&self) -> ExecResult<Vec<(PropertyId, PropertyValue)>>;

    /// Writes one property on the working version.
    fn set_property(&self, property: PropertyId, value: PropertyValue) -> ExecResult<()>;

    /// Erases one property from the working version.
    fn erase_property(&self, property: PropertyId) -> ExecResult<()>;

    /// Erases all properties from the working version.
    fn clear_properties(&self) -> ExecResult<()>;
}

/// A cheap handle to a stored vertex: id, view and a backend reference.
///
/// Equality is record identity; the view does not participate.
#[derive(Clone)]
pub struct VertexAccessor {
    id: VertexId,
    view: View,
    graph: DynGraph,
}

impl VertexAccessor {
    /// Creates an accessor for the vertex under the given view.
    #[must_use]
    pub fn new(id: VertexId, view: View, graph: DynGraph) -> Self {
        Self { id, view, graph }
    }

    /// Returns the vertex id.
    #[must_use]
    pub const fn id(&self) -> VertexId {
        self.id
    }

    /// Returns the accessor's current view.
    #[must_use]
    pub const fn view(&self) -> View {
        self.view
    }

    /// Adds a label to the working version; idempotent.
    pub fn add_label(&self, label: LabelId) -> ExecResult<()> {
        self.graph.add_vertex_label(self.id, label)
    }

    /// Removes a label from the working version; idempotent.
    pub fn remove_label(&self, label: LabelId) -> ExecResult<()> {
        self.graph.remove_vertex_label(self.id, label)
    }

    /// Tests a label under the accessor's view.
    pub fn has_label(&self, label: LabelId) -> ExecResult<bool> {
        Ok(self.graph.vertex_labels(self.id, self.view)?.contains(&label))
    }

    /// Reads the labels under the accessor's view.
    pub fn labels(&self) -> ExecResult<Vec<LabelId>> {
        self.graph.vertex_labels(self.id, self.view)
    }

    /// Edges pointing at this vertex under the accessor's view.
    pub fn in_edges(&self) -> ExecResult<Vec<EdgeAccessor>> {
        Ok(self
            .graph
            .vertex_in_edges(self.id, self.view)?
            .into_iter()
            .map(|id| EdgeAccessor::new(id, self.view, Arc::clone(&self.graph)))
            .collect())
    }

    /// Edges leaving this vertex under the accessor's view.
    pub fn out_edges(&self) -> ExecResult<Vec<EdgeAccessor>> {
        Ok(self
            .graph
            .vertex_out_edges(self.id, self.view)?
            .into_iter()
            .map(|id| EdgeAccessor::new(id, self.view, Arc::clone(&self.graph)))
            .collect())
    }
}

impl RecordAccessor for VertexAccessor {
    fn switch(&mut self, view: View) {
        self.view = view;
    }

    fn reconstruct(&mut self) -> bool {
        self.graph.vertex_exists(self.id, View::New)
    }

    fn property(&self, property: PropertyId) -> ExecResult<Value> {
        Ok(self
            .graph
            .vertex_property(self.id, self.view, property)?
            .map_or(Value::Null, Value::from))
    }

    fn properties(&self) -> ExecResult<Vec<(PropertyId, PropertyValue)>> {
        self.graph.vertex_properties(self.id, self.view)
    }

    fn set_property(&self, property: PropertyId, value: PropertyValue) -> ExecResult<()> {
        self.graph.set_vertex_property(self.id, property, value)
    }

    fn erase_property(&self, property: PropertyId) -> ExecResult<()> {
        self.graph.erase_vertex_property(self.id, property)
    }

    fn clear_properties(&self) -> ExecResult<()> {
        self.graph.clear_vertex_properties(self.id)
    }
}

impl fmt::Debug for VertexAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexAccessor").field("id", &self.id).field("view", &self.view).finish()
    }
}

impl PartialEq for VertexAccessor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A cheap handle to a stored edge.
///
/// Equality is record identity; the view does not participate.
#[derive(Clone)]
pub struct EdgeAccessor {
    id: EdgeId,
    view: View,
    graph: DynGraph,
}

impl EdgeAccessor {
    /// Creates an accessor for the edge under the given view.
    #[must_use]
    pub fn new(id: EdgeId, view: View, graph: DynGraph) -> Self {
        Self { id, view, graph }
    }

    /// Returns the edge id.
    #[must_use]
    pub const fn id(&self) -> EdgeId {
        self.id
    }

    /// Returns the accessor's current view.
    #[must_use]
    pub const fn view(&self) -> View {
        self.view
    }

    /// The origin vertex, under this accessor's view.
    #[must_use]
    pub fn from(&self) -> VertexAccessor {
        let (from, _) = self.graph.edge_endpoints(self.id);
        VertexAccessor::new(from, self.view, Arc::clone(&self.graph))
    }

    /// The destination vertex, under this accessor's view.
    #[must_use]
    pub fn to(&self) -> VertexAccessor {
        let (_, to) = self.graph.edge_endpoints(self.id);
        VertexAccessor::new(to, self.view, Arc::clone(&self.graph))
    }

    /// The edge's type.
    #[must_use]
    pub fn edge_type(&self) -> EdgeTypeId {
        self.graph.edge_type(self.id)
    }

    /// Returns `true` for a self-loop (origin equals destination).
    #[must_use]
    pub fn is_loop(&self) -> bool {
        let (from, to) = self.graph.edge_endpoints(self.id);
        from == to
    }
}

impl RecordAccessor for EdgeAccessor {
    fn switch(&mut self, view: View) {
        self.view = view;
    }

    fn reconstruct(&mut self) -> bool {
        self.graph.edge_exists(self.id, View::New)
    }

    fn property(&self, property: PropertyId) -> ExecResult<Value> {
        Ok(self
            .graph
            .edge_property(self.id, self.view, property)?
            .map_or(Value::Null, Value::from))
    }

    fn properties(&self) -> ExecResult<Vec<(PropertyId, PropertyValue)>> {
        self.graph.edge_properties(self.id, self.view)
    }

    fn set_property(&self, property: PropertyId, value: PropertyValue) -> ExecResult<()> {
        self.graph.set_edge_property(self.id, property, value)
    }

    fn erase_property(&self, property: PropertyId) -> ExecResult<()> {
        self.graph.erase_edge_property(self.id, property)
    }

    fn clear_properties(&self) -> ExecResult<()> {
        self.graph.clear_edge_properties(self.id)
    }
}

impl fmt::Debug for EdgeAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeAccessor").field("id", &self.id).field("view", &self.view).finish()
    }
}

impl PartialEq for EdgeAccessor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// An alternating vertex/edge sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    vertices: Vec<VertexAccessor>,
    edges: Vec<EdgeAccessor>,
}

impl Path {
    /// Creates a path consisting of a single vertex.
    #[must_use]
    pub fn new(start: VertexAccessor) -> Self {
        Self { vertices: vec![start], edges: Vec::new() }
    }

    /// Appends one expansion step.
    pub fn expand(&mut self, edge: EdgeAccessor, vertex: VertexAccessor) {
        self.edges.push(edge);
        self.vertices.push(vertex);
    }

    /// The vertices along the path, in order.
    #[must_use]
    pub fn vertices(&self) -> &[VertexAccessor] {
        &self.vertices
    }

    /// The edges along the path, in order.
    #[must_use]
    pub fn edges(&self) -> &[EdgeAccessor] {
        &self.edges
    }

    /// The path length in edges.
    #[must_use]
    pub fn size(&self) -> usize {
        self.edges.len()
    }

    /// Re-resolves every contained accessor under the current command;
    /// `false` when any of them is gone.
    pub fn reconstruct(&mut self) -> bool {
        let mut ok = true;
        for vertex in &mut self.vertices {
            ok &= vertex.reconstruct();
        }
        for edge in &mut self.edges {
            ok &= edge.reconstruct();
        }
        ok
    }
}
