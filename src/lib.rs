//! QuiverDB query execution engine.
//!
//! This crate executes logically planned queries against a versioned
//! property-graph store. A plan is a tree of [`plan::LogicalOperator`]
//! nodes; asking the root for a cursor compiles the tree into a pipeline of
//! pull-based [`exec::Cursor`] values that stream result rows one frame at
//! a time.
//!
//! # Modules
//!
//! - [`value`] - The dynamic value model used on the frame and in expressions
//! - [`symbol`] - Symbols, the symbol table and the positional frame
//! - [`expr`] - Expression trees embedded in plans
//! - [`eval`] - The expression evaluator
//! - [`graph`] - Graph storage contract, accessor handles and the in-memory
//!   reference backend
//! - [`plan`] - Logical operator variants and cursor construction
//! - [`exec`] - Operator cursors and the top-level execution loop
//! - [`error`] - Runtime error model
//!
//! # Quick Start
//!
//! Scan every vertex and project it:
//!
//! ```
//! use std::sync::Arc;
//! use quiverdb_exec::{
//!     DynGraph, Expression, GraphBackend, LogicalOperator, MemoryGraph, NamedExpression, Once,
//!     Produce, QueryExecution, ScanAll, SymbolTable, View,
//! };
//!
//! let db: DynGraph = Arc::new(MemoryGraph::new());
//! db.insert_vertex();
//!
//! let mut symbols = SymbolTable::new();
//! let n = symbols.create_symbol("n", true);
//! let out = symbols.create_symbol("n", false);
//!
//! let plan = LogicalOperator::Produce(Produce {
//!     input: Box::new(LogicalOperator::ScanAll(ScanAll {
//!         input: Box::new(LogicalOperator::Once(Once)),
//!         output_symbol: n.clone(),
//!         view: View::Old,
//!     })),
//!     named_expressions: vec![NamedExpression {
//!         name: "n".to_string(),
//!         expression: Expression::ident(&n),
//!         symbol: out.clone(),
//!     }],
//! });
//!
//! let mut execution = QueryExecution::new(&plan, &symbols, &db, vec![out]);
//! assert_eq!(execution.collect_rows().unwrap().len(), 0); // OLD view: nothing yet
//! db.advance_command();
//! execution.reset();
//! assert_eq!(execution.collect_rows().unwrap().len(), 1);
//! ```

pub mod error;
pub mod eval;
pub mod exec;
pub mod expr;
pub mod graph;
pub mod plan;
pub mod symbol;
pub mod value;

// Re-export commonly used items at the crate root
pub use error::{ExecError, ExecResult};
pub use eval::ExpressionEvaluator;
pub use exec::{executor::QueryExecution, BoxedCursor, Cursor};
pub use expr::{BinaryOp, Expression, UnaryOp};
pub use graph::memory::MemoryGraph;
pub use graph::{
    BoundKind, Direction, DynGraph, EdgeAccessor, EdgeId, EdgeTypeId, GraphBackend, LabelId, Path,
    PropertyId, PropertyValue, RangeBound, RecordAccessor, VertexAccessor, VertexId, View,
};
pub use plan::{
    Accumulate, Aggregate, AggregationOp, AggregationSpec, Bound, CreateExpand, CreateIndex,
    CreateNode, Delete, Distinct, EdgeSpec, Expand, ExpandUniquenessFilter, Filter, Limit,
    LogicalOperator, Merge, NamedExpression, NodeSpec, Once, Optional, OrderBy, Ordering, Produce,
    PropertiesOp, RemoveLabels, RemoveProperty, ScanAll, ScanAllByLabel,
    ScanAllByLabelPropertyRange, ScanAllByLabelPropertyValue, SetLabels, SetProperties,
    SetProperty, Skip, UniquenessKind, Unwind,
};
pub use symbol::{Frame, Symbol, SymbolTable};
pub use value::Value;
