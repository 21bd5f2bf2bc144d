//! Cross-transaction reservations of staged edit ranges

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::edit::ByteRange;
use crate::model::FileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub tx: TxId,
    pub range: ByteRange,
}

/// Shared record of which byte ranges open transactions hold, per file.
///
/// Reservation is atomic per file, so two transactions can never both hold
/// conflicting ranges of one file.
#[derive(Debug, Default)]
pub struct EditLedger {
    next_tx: AtomicU64,
    reservations: DashMap<FileId, Vec<Reservation>>,
}

impl EditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_tx(&self) -> TxId {
        TxId(self.next_tx.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Reserve `range` for `tx`, or return the reservation it conflicts with.
    pub fn reserve(&self, tx: TxId, file: FileId, range: ByteRange) -> Result<(), Reservation> {
        let mut held = self.reservations.entry(file).or_default();
        if let Some(existing) = held.iter().find(|r| r.range.conflicts_with(&range)) {
            return Err(*existing);
        }
        held.push(Reservation { tx, range });
        Ok(())
    }

    /// Drop every reservation held by `tx`.
    pub fn release(&self, tx: TxId) {
        for mut entry in self.reservations.iter_mut() {
            entry.value_mut().retain(|r| r.tx != tx);
        }
        self.reservations.retain(|_, held| !held.is_empty());
    }

    pub fn reserved(&self, file: FileId) -> Vec<Reservation> {
        self.reservations
            .get(&file)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn is_idle(&self) -> bool {
        self.reservations.is_empty()
    }
}
