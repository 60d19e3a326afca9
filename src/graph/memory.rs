//! In-memory reference backend.
//!
//! [`MemoryGraph`] implements [`GraphBackend`] with per-record two-version
//! state: `old` is the record as of the last command boundary, `cur` is the
//! working state of the current command. [`GraphBackend::advance_command`]
//! folds `cur` into `old`. Deleted records stay resident so stale accessor
//! handles resolve to the deleted-record error instead of dangling.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::RwLock;

use tracing::{debug, trace};

use crate::error::{ExecError, ExecResult};

use super::{
    BoundKind, EdgeId, EdgeTypeId, GraphBackend, LabelId, PropertyId, PropertyValue, RangeBound,
    VertexId, View,
};

#[derive(Debug, Clone, Default)]
struct VertexData {
    labels: BTreeSet<LabelId>,
    properties: HashMap<PropertyId, PropertyValue>,
    in_edges: Vec<EdgeId>,
    out_edges: Vec<EdgeId>,
}

#[derive(Debug, Default)]
struct VertexRecord {
    /// State at the last command boundary; `None` until the creating
    /// command is folded in, or after a folded-in deletion.
    old: Option<VertexData>,
    /// Working state; `None` once deleted in the current command.
    cur: Option<VertexData>,
}

#[derive(Debug, Clone, Default)]
struct EdgeData {
    properties: HashMap<PropertyId, PropertyValue>,
}

#[derive(Debug)]
struct EdgeRecord {
    from: VertexId,
    to: VertexId,
    edge_type: EdgeTypeId,
    old: Option<EdgeData>,
    cur: Option<EdgeData>,
}

/// Bidirectional name ↔ id interning table.
#[derive(Debug, Default)]
struct NameTable {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl NameTable {
    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    fn name(&self, id: u32) -> String {
        self.names.get(id as usize).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct Inner {
    vertices: Vec<VertexRecord>,
    edges: Vec<EdgeRecord>,
    labels: NameTable,
    properties: NameTable,
    edge_types: NameTable,
    indexes: BTreeSet<(LabelId, PropertyId)>,
}

impl Inner {
    fn vertex_data(&self, vertex: VertexId, view: View) -> ExecResult<&VertexData> {
        let record = self
            .vertices
            .get(vertex.as_u64() as usize)
            .ok_or_else(|| ExecError::Storage(format!("unknown vertex {}", vertex.as_u64())))?;
        let data = match view {
            View::Old => record.old.as_ref(),
            View::New => record.cur.as_ref(),
        };
        data.ok_or_else(|| ExecError::runtime("cannot access a deleted record"))
    }

    fn vertex_cur_mut(&mut self, vertex: VertexId) -> ExecResult<&mut VertexData> {
        let record = self
            .vertices
            .get_mut(vertex.as_u64() as usize)
            .ok_or_else(|| ExecError::Storage(format!("unknown vertex {}", vertex.as_u64())))?;
        record.cur.as_mut().ok_or_else(|| ExecError::runtime("cannot update a deleted record"))
    }

    fn edge_data(&self, edge: EdgeId, view: View) -> ExecResult<&EdgeData> {
        let record = self
            .edges
            .get(edge.as_u64() as usize)
            .ok_or_else(|| ExecError::Storage(format!("unknown edge {}", edge.as_u64())))?;
        let data = match view {
            View::Old => record.old.as_ref(),
            View::New => record.cur.as_ref(),
        };
        data.ok_or_else(|| ExecError::runtime("cannot access a deleted record"))
    }

    fn edge_cur_mut(&mut self, edge: EdgeId) -> ExecResult<&mut EdgeData> {
        let record = self
            .edges
            .get_mut(edge.as_u64() as usize)
            .ok_or_else(|| ExecError::Storage(format!("unknown edge {}", edge.as_u64())))?;
        record.cur.as_mut().ok_or_else(|| ExecError::runtime("cannot update a deleted record"))
    }

    /// Removes the edge from its record and both endpoint adjacency lists.
    fn unlink_edge(&mut self, edge: EdgeId) {
        let record = &mut self.edges[edge.as_u64() as usize];
        if record.cur.take().is_none() {
            return;
        }
        let (from, to) = (record.from, record.to);
        if let Some(data) = self.vertices[from.as_u64() as usize].cur.as_mut() {
            data.out_edges.retain(|&e| e != edge);
        }
        if let Some(data) = self.vertices[to.as_u64() as usize].cur.as_mut() {
            data.in_edges.retain(|&e| e != edge);
        }
        trace!(edge = edge.as_u64(), "removed edge");
    }

    fn matching_vertices(
        &self,
        label: LabelId,
        view: View,
        mut predicate: impl FnMut(&PropertyValue) -> bool,
        property: PropertyId,
    ) -> Vec<VertexId> {
        self.visible_with_label(label, view)
            .into_iter()
            .filter(|id| {
                self.vertex_data(*id, view)
                    .ok()
                    .and_then(|data| data.properties.get(&property))
                    .is_some_and(&mut predicate)
            })
            .collect()
    }

    fn visible_with_label(&self, label: LabelId, view: View) -> Vec<VertexId> {
        self.visible_vertices(view)
            .into_iter()
            .filter(|id| {
                self.vertex_data(*id, view).map(|data| data.labels.contains(&label)).unwrap_or(false)
            })
            .collect()
    }

    fn visible_vertices(&self, view: View) -> Vec<VertexId> {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, record)| match view {
                View::Old => record.old.is_some(),
                View::New => record.cur.is_some(),
            })
            .map(|(i, _)| VertexId::new(i as u64))
            .collect()
    }
}

/// An in-memory [`GraphBackend`] scoped to a single transaction.
///
/// Interior mutability keeps the trait object usable behind `Arc`; an atomic
/// flag carries the cooperative abort signal.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    inner: RwLock<Inner>,
    abort: AtomicBool,
}

impl MemoryGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cooperative abort; running cursors observe it on their next
    /// abort check.
    pub fn request_abort(&self) {
        self.abort.store(true, AtomicOrdering::Relaxed);
    }

    /// Number of edges visible under the view.
    #[must_use]
    pub fn edges_count(&self, view: View) -> usize {
        let inner = self.read();
        inner
            .edges
            .iter()
            .filter(|record| match view {
                View::Old => record.old.is_some(),
                View::New => record.cur.is_some(),
            })
            .count()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl GraphBackend for MemoryGraph {
    fn insert_vertex(&self) -> VertexId {
        let mut inner = self.write();
        let id = VertexId::new(inner.vertices.len() as u64);
        inner.vertices.push(VertexRecord { old: None, cur: Some(VertexData::default()) });
        trace!(vertex = id.as_u64(), "inserted vertex");
        id
    }

    fn insert_edge(
        &self,
        from: VertexId,
        to: VertexId,
        edge_type: EdgeTypeId,
    ) -> ExecResult<EdgeId> {
        let mut inner = self.write();
        if inner.vertices[from.as_u64() as usize].cur.is_none()
            || inner.vertices[to.as_u64() as usize].cur.is_none()
        {
            return Err(ExecError::runtime("cannot attach an edge to a deleted record"));
        }
        let id = EdgeId::new(inner.edges.len() as u64);
        inner.edges.push(EdgeRecord { from, to, edge_type, old: None, cur: Some(EdgeData::default()) });
        inner.vertices[from.as_u64() as usize]
            .cur
            .as_mut()
            .expect("checked above")
            .out_edges
            .push(id);
        inner.vertices[to.as_u64() as usize]
            .cur
            .as_mut()
            .expect("checked above")
            .in_edges
            .push(id);
        trace!(edge = id.as_u64(), from = from.as_u64(), to = to.as_u64(), "inserted edge");
        Ok(id)
    }

    fn remove_vertex(&self, vertex: VertexId, detach: bool) -> ExecResult<bool> {
        let mut inner = self.write();
        let record = inner
            .vertices
            .get(vertex.as_u64() as usize)
            .ok_or_else(|| ExecError::Storage(format!("unknown vertex {}", vertex.as_u64())))?;
        let Some(data) = record.cur.as_ref() else {
            // Already gone in this command; deleting twice is a no-op.
            return Ok(true);
        };
        let incident: Vec<EdgeId> =
            data.in_edges.iter().chain(data.out_edges.iter()).copied().collect();
        if !incident.is_empty() {
            if !detach {
                return Ok(false);
            }
            for edge in incident {
                inner.unlink_edge(edge);
            }
        }
        inner.vertices[vertex.as_u64() as usize].cur = None;
        debug!(vertex = vertex.as_u64(), detach, "removed vertex");
        Ok(true)
    }

    fn remove_edge(&self, edge: EdgeId) -> ExecResult<()> {
        let mut inner = self.write();
        if edge.as_u64() as usize >= inner.edges.len() {
            return Err(ExecError::Storage(format!("unknown edge {}", edge.as_u64())));
        }
        inner.unlink_edge(edge);
        Ok(())
    }

    fn vertices(&self, view: View) -> Vec<VertexId> {
        self.read().visible_vertices(view)
    }

    fn vertices_by_label(&self, label: LabelId, view: View) -> Vec<VertexId> {
        self.read().visible_with_label(label, view)
    }

    fn vertices_by_property_value(
        &self,
        label: LabelId,
        property: PropertyId,
        value: &PropertyValue,
        view: View,
    ) -> Vec<VertexId> {
        self.read().matching_vertices(label, view, |stored| property_equal(stored, value), property)
    }

    fn vertices_by_property_range(
        &self,
        label: LabelId,
        property: PropertyId,
        lower: Option<&RangeBound>,
        upper: Option<&RangeBound>,
        view: View,
    ) -> Vec<VertexId> {
        self.read().matching_vertices(
            label,
            view,
            |stored| in_range(stored, lower, upper),
            property,
        )
    }

    fn vertex_exists(&self, vertex: VertexId, view: View) -> bool {
        self.read().vertex_data(vertex, view).is_ok()
    }

    fn vertex_property(
        &self,
        vertex: VertexId,
        view: View,
        property: PropertyId,
    ) -> ExecResult<Option<PropertyValue>> {
        Ok(self.read().vertex_data(vertex, view)?.properties.get(&property).cloned())
    }

    fn vertex_properties(
        &self,
        vertex: VertexId,
        view: View,
    ) -> ExecResult<Vec<(PropertyId, PropertyValue)>> {
        let inner = self.read();
        let mut properties: Vec<_> =
            inner.vertex_data(vertex, view)?.properties.iter().map(|(k, v)| (*k, v.clone())).collect();
        properties.sort_by_key(|(k, _)| *k);
        Ok(properties)
    }

    fn set_vertex_property(
        &self,
        vertex: VertexId,
        property: PropertyId,
        value: PropertyValue,
    ) -> ExecResult<()> {
        self.write().vertex_cur_mut(vertex)?.properties.insert(property, value);
        Ok(())
    }

    fn erase_vertex_property(&self, vertex: VertexId, property: PropertyId) -> ExecResult<()> {
        self.write().vertex_cur_mut(vertex)?.properties.remove(&property);
        Ok(())
    }

    fn clear_vertex_properties(&self, vertex: VertexId) -> ExecResult<()> {
        self.write().vertex_cur_mut(vertex)?.properties.clear();
        Ok(())
    }

    fn add_vertex_label(&self, vertex: VertexId, label: LabelId) -> ExecResult<()> {
        self.write().vertex_cur_mut(vertex)?.labels.insert(label);
        Ok(())
    }

    fn remove_vertex_label(&self, vertex: VertexId, label: LabelId) -> ExecResult<()> {
        self.write().vertex_cur_mut(vertex)?.labels.remove(&label);
        Ok(())
    }

    fn vertex_labels(&self, vertex: VertexId, view: View) -> ExecResult<Vec<LabelId>> {
        Ok(self.read().vertex_data(vertex, view)?.labels.iter().copied().collect())
    }

    fn vertex_in_edges(&self, vertex: VertexId, view: View) -> ExecResult<Vec<EdgeId>> {
        Ok(self.read().vertex_data(vertex, view)?.in_edges.clone())
    }

    fn vertex_out_edges(&self, vertex: VertexId, view: View) -> ExecResult<Vec<EdgeId>> {
        Ok(self.read().vertex_data(vertex, view)?.out_edges.clone())
    }

    fn edge_exists(&self, edge: EdgeId, view: View) -> bool {
        self.read().edge_data(edge, view).is_ok()
    }

    fn edge_property(
        &self,
        edge: EdgeId,
        view: View,
        property: PropertyId,
    ) -> ExecResult<Option<PropertyValue>> {
        Ok(self.read().edge_data(edge, view)?.properties.get(&property).cloned())
    }

    fn edge_properties(
        &self,
        edge: EdgeId,
        view: View,
    ) -> ExecResult<Vec<(PropertyId, PropertyValue)>> {
        let inner = self.read();
        let mut properties: Vec<_> =
            inner.edge_data(edge, view)?.properties.iter().map(|(k, v)| (*k, v.clone())).collect();
        properties.sort_by_key(|(k, _)| *k);
        Ok(properties)
    }

    fn set_edge_property(
        &self,
        edge: EdgeId,
        property: PropertyId,
        value: PropertyValue,
    ) -> ExecResult<()> {
        self.write().edge_cur_mut(edge)?.properties.insert(property, value);
        Ok(())
    }

    fn erase_edge_property(&self, edge: EdgeId, property: PropertyId) -> ExecResult<()> {
        self.write().edge_cur_mut(edge)?.properties.remove(&property);
        Ok(())
    }

    fn clear_edge_properties(&self, edge: EdgeId) -> ExecResult<()> {
        self.write().edge_cur_mut(edge)?.properties.clear();
        Ok(())
    }

    fn edge_endpoints(&self, edge: EdgeId) -> (VertexId, VertexId) {
        let inner = self.read();
        let record = &inner.edges[edge.as_u64() as usize];
        (record.from, record.to)
    }

    fn edge_type(&self, edge: EdgeId) -> EdgeTypeId {
        self.read().edges[edge.as_u64() as usize].edge_type
    }

    fn label_id(&self, name: &str) -> LabelId {
        LabelId::new(self.write().labels.intern(name))
    }

    fn label_name(&self, label: LabelId) -> String {
        self.read().labels.name(label.as_u32())
    }

    fn property_id(&self, name: &str) -> PropertyId {
        PropertyId::new(self.write().properties.intern(name))
    }

    fn property_name(&self, property: PropertyId) -> String {
        self.read().properties.name(property.as_u32())
    }

    fn edge_type_id(&self, name: &str) -> EdgeTypeId {
        EdgeTypeId::new(self.write().edge_types.intern(name))
    }

    fn edge_type_name(&self, edge_type: EdgeTypeId) -> String {
        self.read().edge_types.name(edge_type.as_u32())
    }

    fn build_index(&self, label: LabelId, property: PropertyId) -> ExecResult<()> {
        let mut inner = self.write();
        if !inner.indexes.insert((label, property)) {
            return Err(ExecError::IndexExists);
        }
        debug!(label = label.as_u32(), property = property.as_u32(), "built index");
        Ok(())
    }

    fn vertices_count(&self) -> usize {
        self.read().visible_vertices(View::New).len()
    }

    fn vertices_count_by_label(&self, label: LabelId) -> usize {
        self.read().visible_with_label(label, View::New).len()
    }

    fn vertices_count_by_property_value(
        &self,
        label: LabelId,
        property: PropertyId,
        value: &PropertyValue,
    ) -> usize {
        self.vertices_by_property_value(label, property, value, View::New).len()
    }

    fn vertices_count_by_property_range(
        &self,
        label: LabelId,
        property: PropertyId,
        lower: Option<&RangeBound>,
        upper: Option<&RangeBound>,
    ) -> usize {
        self.vertices_by_property_range(label, property, lower, upper, View::New).len()
    }

    fn advance_command(&self) {
        let mut inner = self.write();
        for record in &mut inner.vertices {
            record.old = record.cur.clone();
        }
        for record in &mut inner.edges {
            record.old = record.cur.clone();
        }
        debug!(
            vertices = inner.vertices.len(),
            edges = inner.edges.len(),
            "advanced command clock"
        );
    }

    fn should_abort(&self) -> bool {
        self.abort.load(AtomicOrdering::Relaxed)
    }
}

/// Storage-level equality for index lookups: Int and Double coalesce, Null
/// matches Null, everything else compares structurally.
fn property_equal(a: &PropertyValue, b: &PropertyValue) -> bool {
    match (a, b) {
        (PropertyValue::Int(x), PropertyValue::Double(y))
        | (PropertyValue::Double(y), PropertyValue::Int(x)) => (*x as f64) == *y,
        (PropertyValue::List(x), PropertyValue::List(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| property_equal(a, b))
        }
        (PropertyValue::Map(x), PropertyValue::Map(y)) => {
            x.len() == y.len()
                && x.iter().zip(y.iter()).all(|((ka, va), (kb, vb))| {
                    ka == kb && property_equal(va, vb)
                })
        }
        _ => a == b,
    }
}

/// Storage-level ordering for range scans; `None` for pairs without an
/// order, which range filtering drops silently.
fn property_cmp(a: &PropertyValue, b: &PropertyValue) -> Option<Ordering> {
    match (a, b) {
        (PropertyValue::Bool(x), PropertyValue::Bool(y)) => Some(x.cmp(y)),
        (PropertyValue::Int(x), PropertyValue::Int(y)) => Some(x.cmp(y)),
        (PropertyValue::Int(x), PropertyValue::Double(y)) => (*x as f64).partial_cmp(y),
        (PropertyValue::Double(x), PropertyValue::Int(y)) => x.partial_cmp(&(*y as f64)),
        (PropertyValue::Double(x), PropertyValue::Double(y)) => x.partial_cmp(y),
        (PropertyValue::String(x), PropertyValue::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn in_range(value: &PropertyValue, lower: Option<&RangeBound>, upper: Option<&RangeBound>) -> bool {
    if let Some(bound) = lower {
        match property_cmp(value, &bound.value) {
            Some(Ordering::Greater) => {}
            Some(Ordering::Equal) if bound.kind == BoundKind::Inclusive => {}
            _ => return false,
        }
    }
    if let Some(bound) = upper {
        match property_cmp(value, &bound.value) {
            Some(Ordering::Less) => {}
            Some(Ordering::Equal) if bound.kind == BoundKind::Inclusive => {}
            _ => return false,
        }
    }
    true
}
