//! End-to-end plans covering matching, filtering and row-shaping clauses.

use std::sync::Arc;

use quiverdb_exec::{
    Direction, Distinct, DynGraph, Expand, Expression, Filter, GraphBackend, Limit,
    LogicalOperator, MemoryGraph, Merge, NodeSpec, Once, Optional, PropertyValue, QueryExecution,
    ScanAll, ScanAllByLabel, Skip, Symbol, SymbolTable, Unwind, Value, View,
};

fn memory_graph() -> DynGraph {
    let db: DynGraph = Arc::new(MemoryGraph::new());
    db
}

fn once() -> Box<LogicalOperator> {
    Box::new(LogicalOperator::Once(Once))
}

fn scan_all(symbol: &Symbol, view: View) -> Box<LogicalOperator> {
    Box::new(LogicalOperator::ScanAll(ScanAll {
        input: once(),
        output_symbol: symbol.clone(),
        view,
    }))
}

fn unwind_ints(symbol: &Symbol, values: impl IntoIterator<Item = i64>) -> Box<LogicalOperator> {
    Box::new(LogicalOperator::Unwind(Unwind {
        input: once(),
        input_expression: Expression::ListLiteral(
            values.into_iter().map(Expression::literal).collect(),
        ),
        output_symbol: symbol.clone(),
    }))
}

#[test]
fn match_filter_return() {
    // MATCH (n) WHERE n.age > 30 RETURN n
    let db = memory_graph();
    let age = db.property_id("age");
    for years in [25i64, 35, 45] {
        let v = db.insert_vertex();
        db.set_vertex_property(v, age, PropertyValue::Int(years)).unwrap();
    }
    db.advance_command();

    let mut symbols = SymbolTable::new();
    let n = symbols.create_symbol("n", true);

    let plan = LogicalOperator::Filter(Filter {
        input: scan_all(&n, View::Old),
        expression: Expression::ident(&n).property(age).gt(Expression::literal(30i64)),
    });

    let mut execution = QueryExecution::new(&plan, &symbols, &db, vec![n.clone()]);
    assert_eq!(execution.collect_rows().unwrap().len(), 2);
}

#[test]
fn match_two_hop_pattern() {
    // MATCH (a)-[e1]->(b)-[e2]->(c): a chain a->b->c yields exactly one row.
    let db = memory_graph();
    let t = db.edge_type_id("T");
    let a = db.insert_vertex();
    let b = db.insert_vertex();
    let c = db.insert_vertex();
    db.insert_edge(a, b, t).unwrap();
    db.insert_edge(b, c, t).unwrap();
    db.advance_command();

    let mut symbols = SymbolTable::new();
    let va = symbols.create_symbol("a", true);
    let e1 = symbols.create_symbol("e1", true);
    let vb = symbols.create_symbol("b", true);
    let e2 = symbols.create_symbol("e2", true);
    let vc = symbols.create_symbol("c", true);

    let plan = LogicalOperator::Expand(Expand {
        input: Box::new(LogicalOperator::Expand(Expand {
            input: scan_all(&va, View::Old),
            input_symbol: va.clone(),
            node_symbol: vb.clone(),
            edge_symbol: e1.clone(),
            direction: Direction::Out,
            existing_node: false,
            existing_edge: false,
            view: View::Old,
        })),
        input_symbol: vb.clone(),
        node_symbol: vc.clone(),
        edge_symbol: e2.clone(),
        direction: Direction::Out,
        existing_node: false,
        existing_edge: false,
        view: View::Old,
    });

    let mut execution =
        QueryExecution::new(&plan, &symbols, &db, vec![va.clone(), vc.clone()]);
    let rows = execution.collect_rows().unwrap();
    assert_eq!(rows.len(), 1);
    match (&rows[0][0], &rows[0][1]) {
        (Value::Vertex(first), Value::Vertex(last)) => {
            assert_eq!(first.id(), a);
            assert_eq!(last.id(), c);
        }
        other => panic!("expected two vertices, got {other:?}"),
    }
}

#[test]
fn scan_by_label_then_filter() {
    let db = memory_graph();
    let person = db.label_id("Person");
    let age = db.property_id("age");
    for (years, labeled) in [(20i64, true), (40, true), (40, false)] {
        let v = db.insert_vertex();
        db.set_vertex_property(v, age, PropertyValue::Int(years)).unwrap();
        if labeled {
            db.add_vertex_label(v, person).unwrap();
        }
    }
    db.advance_command();

    let mut symbols = SymbolTable::new();
    let n = symbols.create_symbol("n", true);

    let plan = LogicalOperator::Filter(Filter {
        input: Box::new(LogicalOperator::ScanAllByLabel(ScanAllByLabel {
            input: once(),
            output_symbol: n.clone(),
            label: person,
            view: View::Old,
        })),
        expression: Expression::ident(&n).property(age).ge(Expression::literal(30i64)),
    });

    let mut execution = QueryExecution::new(&plan, &symbols, &db, vec![n.clone()]);
    assert_eq!(execution.collect_rows().unwrap().len(), 1);
}

#[test]
fn skip_limit_composition_returns_middle_window() {
    // Limit(5, Skip(3, 10 rows)): rows 4 through 8.
    let db = memory_graph();
    let mut symbols = SymbolTable::new();
    let x = symbols.create_symbol("x", true);

    let plan = LogicalOperator::Limit(Limit {
        input: Box::new(LogicalOperator::Skip(Skip {
            input: unwind_ints(&x, 1..=10),
            expression: Expression::literal(3i64),
        })),
        expression: Expression::literal(5i64),
    });

    let mut execution = QueryExecution::new(&plan, &symbols, &db, vec![x.clone()]);
    let rows = execution.collect_rows().unwrap();
    let values: Vec<i64> = rows.iter().map(|row| row[0].as_int().unwrap()).collect();
    assert_eq!(values, vec![4, 5, 6, 7, 8]);
}

#[test]
fn distinct_deduplicates_projection() {
    let db = memory_graph();
    let mut symbols = SymbolTable::new();
    let x = symbols.create_symbol("x", true);

    let plan = LogicalOperator::Distinct(Distinct {
        input: unwind_ints(&x, [1, 2, 1, 3, 2, 1]),
        value_symbols: vec![x.clone()],
    });

    let mut execution = QueryExecution::new(&plan, &symbols, &db, vec![x.clone()]);
    let rows = execution.collect_rows().unwrap();
    let values: Vec<i64> = rows.iter().map(|row| row[0].as_int().unwrap()).collect();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn optional_match_nulls_unmatched_branches() {
    let db = memory_graph();
    let t = db.edge_type_id("T");
    let a = db.insert_vertex();
    let b = db.insert_vertex();
    db.insert_edge(a, b, t).unwrap();
    db.advance_command();

    let mut symbols = SymbolTable::new();
    let n = symbols.create_symbol("n", true);
    let e = symbols.create_symbol("e", true);
    let m = symbols.create_symbol("m", true);

    // MATCH (n) OPTIONAL MATCH (n)-[e]->(m) RETURN n, m
    let plan = LogicalOperator::Optional(Optional {
        input: scan_all(&n, View::Old),
        optional: Box::new(LogicalOperator::Expand(Expand {
            input: once(),
            input_symbol: n.clone(),
            node_symbol: m.clone(),
            edge_symbol: e.clone(),
            direction: Direction::Out,
            existing_node: false,
            existing_edge: false,
            view: View::Old,
        })),
        optional_symbols: vec![e.clone(), m.clone()],
    });

    let mut execution = QueryExecution::new(&plan, &symbols, &db, vec![n.clone(), m.clone()]);
    let rows = execution.collect_rows().unwrap();
    assert_eq!(rows.len(), 2);

    // a matched, b did not.
    assert!(matches!(rows[0][1], Value::Vertex(_)));
    assert_eq!(rows[1][1], Value::Null);
}

#[test]
fn merge_matches_or_creates_per_row() {
    // UNWIND [1, 2, 3] MERGE (n:Person): created once, matched twice.
    let db = memory_graph();
    let person = db.label_id("Person");

    let mut symbols = SymbolTable::new();
    let x = symbols.create_symbol("x", true);
    let n = symbols.create_symbol("n", true);

    let plan = LogicalOperator::Merge(Merge {
        input: unwind_ints(&x, [1, 2, 3]),
        merge_match: Box::new(LogicalOperator::ScanAllByLabel(ScanAllByLabel {
            input: once(),
            output_symbol: n.clone(),
            label: person,
            view: View::New,
        })),
        merge_create: Box::new(LogicalOperator::CreateNode(quiverdb_exec::CreateNode {
            input: once(),
            node: NodeSpec { symbol: n.clone(), labels: vec![person], properties: vec![] },
        })),
    });

    let mut execution = QueryExecution::new(&plan, &symbols, &db, vec![n.clone()]);
    assert_eq!(execution.collect_rows().unwrap().len(), 3);
    assert_eq!(db.vertices_count_by_label(person), 1);
}

#[test]
fn nested_scans_form_cartesian_product() {
    let db = memory_graph();
    for _ in 0..3 {
        db.insert_vertex();
    }
    db.advance_command();

    let mut symbols = SymbolTable::new();
    let n = symbols.create_symbol("n", true);
    let m = symbols.create_symbol("m", true);

    let plan = LogicalOperator::ScanAll(ScanAll {
        input: scan_all(&n, View::Old),
        output_symbol: m.clone(),
        view: View::Old,
    });

    let mut execution = QueryExecution::new(&plan, &symbols, &db, vec![n.clone(), m.clone()]);
    assert_eq!(execution.collect_rows().unwrap().len(), 9);
}
