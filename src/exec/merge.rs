//! MERGE and OPTIONAL MATCH.
//!
//! Both drive a branch subtree once per input row. The shared shape: a
//! `pull_input` flag decides whether the next pull fetches a fresh input
//! row (resetting the branch cursors, whose expand iterators keep state)
//! or continues emitting the current row's branch matches.

use crate::error::ExecResult;
use crate::exec::{BoxedCursor, Cursor};
use crate::plan::Optional;
use crate::symbol::Frame;
use crate::value::Value;

/// Cursor for [`crate::plan::Merge`].
///
/// Per input row: emit every row of the match branch; if the branch yields
/// nothing at all, pull the create branch exactly once and emit that.
pub(crate) struct MergeCursor<'a> {
    input: BoxedCursor<'a>,
    merge_match: BoxedCursor<'a>,
    merge_create: BoxedCursor<'a>,
    pull_input: bool,
}

impl<'a> MergeCursor<'a> {
    pub(crate) fn new(
        input: BoxedCursor<'a>,
        merge_match: BoxedCursor<'a>,
        merge_create: BoxedCursor<'a>,
    ) -> Self {
        Self { input, merge_match, merge_create, pull_input: true }
    }
}

impl<'a> Cursor for MergeCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        loop {
            if self.pull_input {
                if !self.input.pull(frame)? {
                    return Ok(false);
                }
                // Fresh input row: both branches restart.
                self.merge_match.reset();
                self.merge_create.reset();
            }

            if self.merge_match.pull(frame)? {
                // Keep draining the match branch on subsequent pulls.
                self.pull_input = false;
                return Ok(true);
            }

            if self.pull_input {
                // The branch yielded nothing for a fresh input row:
                // create. The create branch is built to always produce.
                let created = self.merge_create.pull(frame)?;
                debug_assert!(created, "merge create branch must produce a row");
                return Ok(true);
            }

            // Match branch exhausted after one or more emissions; move to
            // the next input row.
            self.pull_input = true;
        }
    }

    fn reset(&mut self) {
        self.input.reset();
        self.merge_match.reset();
        self.merge_create.reset();
        self.pull_input = true;
    }
}

/// Cursor for [`Optional`].
///
/// Per input row: emit every row of the optional branch; if it yields
/// nothing, null the optional symbols and emit the row once.
pub(crate) struct OptionalCursor<'a> {
    self_: &'a Optional,
    input: BoxedCursor<'a>,
    optional: BoxedCursor<'a>,
    pull_input: bool,
}

impl<'a> OptionalCursor<'a> {
    pub(crate) fn new(
        self_: &'a Optional,
        input: BoxedCursor<'a>,
        optional: BoxedCursor<'a>,
    ) -> Self {
        Self { self_, input, optional, pull_input: true }
    }
}

impl<'a> Cursor for OptionalCursor<'a> {
    fn pull(&mut self, frame: &mut Frame) -> ExecResult<bool> {
        loop {
            if self.pull_input {
                if !self.input.pull(frame)? {
                    return Ok(false);
                }
                self.optional.reset();
            }

            if self.optional.pull(frame)? {
                self.pull_input = false;
                return Ok(true);
            }

            if self.pull_input {
                // Zero branch rows for a fresh input row: emit it once
                // with the optional symbols nulled.
                for symbol in &self.self_.optional_symbols {
                    frame[symbol] = Value::Null;
                }
                return Ok(true);
            }

            self.pull_input = true;
        }
    }

    fn reset(&mut self) {
        self.input.reset();
        self.optional.reset();
        self.pull_input = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::{count_pulls, memory_graph, once_input};
    use crate::expr::Expression;
    use crate::graph::{Direction, GraphBackend, View};
    use crate::plan::{
        CreateNode, Expand, Filter, LogicalOperator, Merge, NodeSpec, Once, ScanAllByLabel,
        ScanAll,
    };
    use crate::symbol::SymbolTable;

    #[test]
    fn merge_emits_all_matches_when_present() {
        let (_, db) = memory_graph();
        let person = db.label_id("Person");
        for _ in 0..2 {
            let v = db.insert_vertex();
            db.add_vertex_label(v, person).unwrap();
        }

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);

        let plan = LogicalOperator::Merge(Merge {
            input: once_input(),
            merge_match: Box::new(LogicalOperator::ScanAllByLabel(ScanAllByLabel {
                input: Box::new(LogicalOperator::Once(Once)),
                output_symbol: n.clone(),
                label: person,
                view: View::New,
            })),
            merge_create: Box::new(LogicalOperator::CreateNode(CreateNode {
                input: Box::new(LogicalOperator::Once(Once)),
                node: NodeSpec { symbol: n.clone(), labels: vec![person], properties: vec![] },
            })),
        });

        // Both existing vertices match; nothing is created.
        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 2);
        assert_eq!(db.vertices_count(), 2);
    }

    #[test]
    fn merge_creates_exactly_once_on_no_match() {
        let (_, db) = memory_graph();
        let person = db.label_id("Person");

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);

        let plan = LogicalOperator::Merge(Merge {
            input: once_input(),
            merge_match: Box::new(LogicalOperator::ScanAllByLabel(ScanAllByLabel {
                input: Box::new(LogicalOperator::Once(Once)),
                output_symbol: n.clone(),
                label: person,
                view: View::New,
            })),
            merge_create: Box::new(LogicalOperator::CreateNode(CreateNode {
                input: Box::new(LogicalOperator::Once(Once)),
                node: NodeSpec { symbol: n.clone(), labels: vec![person], properties: vec![] },
            })),
        });

        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 1);
        assert_eq!(db.vertices_count(), 1);
        assert_eq!(db.vertices_count_by_label(person), 1);
    }

    #[test]
    fn merge_decides_per_input_row() {
        // Two input rows; the first finds no match and creates, the second
        // matches what the first created (scanning NEW).
        let (_, db) = memory_graph();
        let person = db.label_id("Person");

        let mut table = SymbolTable::new();
        let x = table.create_symbol("x", true);
        let n = table.create_symbol("n", true);

        let plan = LogicalOperator::Merge(Merge {
            input: Box::new(LogicalOperator::Unwind(crate::plan::Unwind {
                input: once_input(),
                input_expression: Expression::ListLiteral(vec![
                    Expression::literal(1i64),
                    Expression::literal(2i64),
                ]),
                output_symbol: x.clone(),
            })),
            merge_match: Box::new(LogicalOperator::ScanAllByLabel(ScanAllByLabel {
                input: Box::new(LogicalOperator::Once(Once)),
                output_symbol: n.clone(),
                label: person,
                view: View::New,
            })),
            merge_create: Box::new(LogicalOperator::CreateNode(CreateNode {
                input: Box::new(LogicalOperator::Once(Once)),
                node: NodeSpec { symbol: n.clone(), labels: vec![person], properties: vec![] },
            })),
        });

        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 2);
        assert_eq!(db.vertices_count(), 1);
    }

    #[test]
    fn optional_emits_branch_rows() {
        let (_, db) = memory_graph();
        let t = db.edge_type_id("T");
        let a = db.insert_vertex();
        let b = db.insert_vertex();
        db.insert_edge(a, b, t).unwrap();

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let e = table.create_symbol("e", true);
        let m = table.create_symbol("m", true);

        // MATCH (n) OPTIONAL MATCH (n)-[e]->(m)
        let plan = LogicalOperator::Optional(Optional {
            input: Box::new(LogicalOperator::ScanAll(ScanAll {
                input: once_input(),
                output_symbol: n.clone(),
                view: View::New,
            })),
            optional: Box::new(LogicalOperator::Expand(Expand {
                input: Box::new(LogicalOperator::Once(Once)),
                input_symbol: n.clone(),
                node_symbol: m.clone(),
                edge_symbol: e.clone(),
                direction: Direction::Out,
                existing_node: false,
                existing_edge: false,
                view: View::New,
            })),
            optional_symbols: vec![e.clone(), m.clone()],
        });

        let mut cursor = plan.make_cursor(&db);
        let mut frame = Frame::new(table.max_position());

        // Row for a: the expansion matched.
        assert!(cursor.pull(&mut frame).unwrap());
        assert!(!frame[&e].is_null());
        assert!(!frame[&m].is_null());

        // Row for b: no outgoing edge, optional symbols nulled.
        assert!(cursor.pull(&mut frame).unwrap());
        assert!(frame[&e].is_null());
        assert!(frame[&m].is_null());

        assert!(!cursor.pull(&mut frame).unwrap());
    }

    #[test]
    fn optional_row_count_is_max_of_one_and_branch_rows() {
        let (_, db) = memory_graph();
        let t = db.edge_type_id("T");
        let a = db.insert_vertex();
        let b = db.insert_vertex();
        let c = db.insert_vertex();
        db.insert_edge(a, b, t).unwrap();
        db.insert_edge(a, c, t).unwrap();

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let e = table.create_symbol("e", true);
        let m = table.create_symbol("m", true);

        let plan = LogicalOperator::Optional(Optional {
            input: Box::new(LogicalOperator::ScanAll(ScanAll {
                input: once_input(),
                output_symbol: n.clone(),
                view: View::New,
            })),
            optional: Box::new(LogicalOperator::Expand(Expand {
                input: Box::new(LogicalOperator::Once(Once)),
                input_symbol: n.clone(),
                node_symbol: m.clone(),
                edge_symbol: e.clone(),
                direction: Direction::Out,
                existing_node: false,
                existing_edge: false,
                view: View::New,
            })),
            optional_symbols: vec![e.clone(), m.clone()],
        });

        // a yields 2 branch rows; b and c yield one null row each.
        assert_eq!(count_pulls(&plan, &table, &db).unwrap(), 4);
    }

    #[test]
    fn optional_with_failing_filter_nulls_symbols() {
        let (_, db) = memory_graph();
        db.insert_vertex();

        let mut table = SymbolTable::new();
        let n = table.create_symbol("n", true);
        let m = table.create_symbol("m", true);

        let plan = LogicalOperator::Optional(Optional {
            input: Box::new(LogicalOperator::ScanAll(ScanAll {
                input: once_input(),
                output_symbol: n.clone(),
                view: View::New,
            })),
            optional: Box::new(LogicalOperator::Filter(Filter {
                input: Box::new(LogicalOperator::ScanAll(ScanAll {
                    input: Box::new(LogicalOperator::Once(Once)),
                    output_symbol: m.clone(),
                    view: View::New,
                })),
                expression: Expression::literal(false),
            })),
            optional_symbols: vec![m.clone()],
        });

        let mut cursor = plan.make_cursor(&db);
        let mut frame = Frame::new(table.max_position());
        assert!(cursor.pull(&mut frame).unwrap());
        assert!(frame[&m].is_null());
        assert!(!cursor.pull(&mut frame).unwrap());
    }
}
