//! Top-level execution: one pull context over a plan.

use crate::error::ExecResult;
use crate::exec::BoxedCursor;
use crate::graph::DynGraph;
use crate::plan::LogicalOperator;
use crate::symbol::{Frame, Symbol, SymbolTable};
use crate::value::Value;

/// A running query: the root cursor plus the frame it executes over.
///
/// The execution borrows the plan; the frame is sized from the symbol
/// table once and reused across rows. Each [`QueryExecution::pull_row`]
/// returns the declared output symbols as a row of values, which is what
/// the protocol layer serializes.
pub struct QueryExecution<'a> {
    cursor: BoxedCursor<'a>,
    frame: Frame,
    output_symbols: Vec<Symbol>,
}

impl<'a> QueryExecution<'a> {
    /// Compiles the plan into a cursor tree and sets up the frame.
    #[must_use]
    pub fn new(
        plan: &'a LogicalOperator,
        symbol_table: &SymbolTable,
        db: &DynGraph,
        output_symbols: Vec<Symbol>,
    ) -> Self {
        Self {
            cursor: plan.make_cursor(db),
            frame: Frame::new(symbol_table.max_position()),
            output_symbols,
        }
    }

    /// Pulls one result row; `None` on exhaustion.
    pub fn pull_row(&mut self) -> ExecResult<Option<Vec<Value>>> {
        if !self.cursor.pull(&mut self.frame)? {
            return Ok(None);
        }
        Ok(Some(self.output_symbols.iter().map(|symbol| self.frame[symbol].clone()).collect()))
    }

    /// Pulls the query to exhaustion.
    pub fn collect_rows(&mut self) -> ExecResult<Vec<Vec<Value>>> {
        let mut rows = Vec::new();
        while let Some(row) = self.pull_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Restores the pre-first-pull state.
    pub fn reset(&mut self) {
        self.cursor.reset();
    }
}
