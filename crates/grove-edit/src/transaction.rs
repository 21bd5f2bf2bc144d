//! Transactions: staged, non-overlapping edits committed as one graph patch

use std::collections::BTreeMap;
use std::sync::Arc;

use grove_core::edit::check_range;
use grove_core::{ByteRange, EditLedger, FileId, GraphDiff, GroveError, Result, TextEdit, TxId};
use grove_indexer::Codebase;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Open,
    Editing,
    Committed,
    Discarded,
}

/// A set of pending edits against one codebase.
///
/// Staged ranges are reserved in the codebase's [`EditLedger`] until the
/// transaction commits, is discarded or is dropped.
#[derive(Debug)]
pub struct Transaction {
    id: TxId,
    ledger: Arc<EditLedger>,
    state: TxState,
    staged: BTreeMap<FileId, Vec<TextEdit>>,
    /// File revisions observed when the first edit of each file was staged.
    revisions: BTreeMap<FileId, u64>,
}

impl Transaction {
    pub fn begin(codebase: &Codebase) -> Self {
        let ledger = codebase.ledger().clone();
        Transaction {
            id: ledger.next_tx(),
            ledger,
            state: TxState::Open,
            staged: BTreeMap::new(),
            revisions: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Number of staged edits.
    pub fn len(&self) -> usize {
        self.staged.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn staged(&self, file: FileId) -> &[TextEdit] {
        self.staged.get(&file).map(Vec::as_slice).unwrap_or_default()
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            TxState::Open | TxState::Editing => Ok(()),
            TxState::Committed => Err(GroveError::TransactionClosed("committed")),
            TxState::Discarded => Err(GroveError::TransactionClosed("discarded")),
        }
    }

    /// Stage replacing `range` of `file` with `text`.
    pub fn stage_edit(&mut self, codebase: &Codebase, file: FileId, range: ByteRange, text: impl Into<String>) -> Result<()> {
        self.ensure_open()?;
        let source = codebase
            .source(file)
            .ok_or_else(|| GroveError::FileNotFound(format!("{file:?}")))?;
        let path = source.path.display().to_string();
        check_range(file, source.text(), range)?;

        let revision = *self.revisions.entry(file).or_insert(source.revision());
        if revision != source.revision() {
            return Err(GroveError::StaleEdit { file, path });
        }
        if let Some(existing) = self.staged(file).iter().find(|e| e.range.conflicts_with(&range)) {
            return Err(GroveError::Overlap {
                file,
                path,
                existing: existing.range,
                new: range,
            });
        }
        self.ledger.reserve(self.id, file, range).map_err(|held| GroveError::Overlap {
            file,
            path: path.clone(),
            existing: held.range,
            new: range,
        })?;

        debug!("tx {:?}: staged {} in {}", self.id, range, path);
        self.staged.entry(file).or_default().push(TextEdit::new(range, text));
        self.state = TxState::Editing;
        Ok(())
    }

    /// Apply every staged edit and patch the graph.
    pub fn commit(&mut self, codebase: &mut Codebase) -> Result<GraphDiff> {
        self.ensure_open()?;
        let stale = self
            .revisions
            .iter()
            .find(|&(file, revision)| codebase.revision(*file) != Some(*revision))
            .map(|(file, _)| *file);
        if let Some(file) = stale {
            let path = codebase
                .source(file)
                .map(|s| s.path.display().to_string())
                .unwrap_or_default();
            self.close(TxState::Discarded);
            return Err(GroveError::StaleEdit { file, path });
        }

        let staged = std::mem::take(&mut self.staged);
        let result = codebase.apply_edits(staged);
        match &result {
            Ok(diff) => {
                info!("tx {:?}: committed diff {}", self.id, diff.sequence);
                self.close(TxState::Committed);
            }
            Err(_) => self.close(TxState::Discarded),
        }
        result
    }

    /// Drop every staged edit. The graph is untouched.
    pub fn discard(&mut self) {
        if matches!(self.state, TxState::Open | TxState::Editing) {
            debug!("tx {:?}: discarded {} edits", self.id, self.len());
            self.close(TxState::Discarded);
        }
    }

    fn close(&mut self, state: TxState) {
        self.staged.clear();
        self.revisions.clear();
        self.ledger.release(self.id);
        self.state = state;
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.ledger.release(self.id);
    }
}

pub trait CodebaseExt {
    fn begin_transaction(&self) -> Transaction;
}

impl CodebaseExt for Codebase {
    fn begin_transaction(&self) -> Transaction {
        Transaction::begin(self)
    }
}
