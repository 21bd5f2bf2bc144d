//! Transactions and codemods over a Grove [`Codebase`](grove_indexer::Codebase)

pub mod codemods;
pub mod transaction;


pub use transaction::{CodebaseExt, Transaction, TxState};
