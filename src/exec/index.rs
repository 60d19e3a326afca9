//! Index creation (DDL).

use crate::error::{ExecError, ExecResult};
use crate::exec::Cursor;
use crate::graph::DynGraph;
use crate::plan::CreateIndex;
use crate::symbol::Frame;

/// Cursor for [`CreateIndex`]: asks the storage to build the index on the
/// first pull and emits a single row. An already-existing index is the one
/// error the engine swallows; everything else propagates.
pub(crate) struct CreateIndexCursor<'a> {
    self_: &'a CreateIndex,
    db: DynGraph,
    did_create: bool,
}

impl<'a> CreateIndexCursor<'a> {
    pub(crate) fn new(self_: &'a CreateIndex, db: DynGraph) -> Self {
        Self { self_, db, did_create: false }
    }
}

impl<'a> Cursor for CreateIndexCursor<'a> {
    fn pull(&mut self, _frame: &mut Frame) -> ExecResult<bool> {
        if self.did_create {
            return Ok(false);
        }
        match self.db.build_index(self.self_.label, self.self_.property) {
            Ok(()) | Err(ExecError::IndexExists) => {}
            Err(error) => return Err(error),
        }
        self.did_create = true;
        Ok(true)
    }

    fn reset(&mut self) {
        self.did_create = false;
    }
}
