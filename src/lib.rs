//! Grove: multi-language source graph with transactional codemods
//!
//! ```no_run
//! use grove::{CodebaseExt, LanguageSet};
//!
//! # fn main() -> grove::Result<()> {
//! let mut codebase = grove::open("path/to/repo", LanguageSet::all())?;
//! let add = codebase.find_symbols("add")[0].id;
//!
//! let mut tx = codebase.begin_transaction();
//! tx.rename_symbol(&codebase, add, "sum_")?;
//! let diff = tx.commit(&mut codebase)?;
//! println!("{} symbols rebuilt", diff.added_symbols.len());
//! # Ok(())
//! # }
//! ```

use std::path::Path;

pub use grove_core::{
    ByteRange, Diagnostic, DiagnosticKind, FileId, GraphDiff, GroveError, ImportEdge, ImportedName, Language,
    LanguageSet, NodeId, Resolution, ResolvedTarget, Result, Severity, Symbol, SymbolKind, TextEdit, Unresolved,
    Usage, UsageRole,
};
pub use grove_edit::{CodebaseExt, Transaction, TxState};
pub use grove_indexer::{Codebase, FileView, GroveConfig, ParseStatus, ProjectConfig, TypedNode};

/// Index every supported file under `root`.
pub fn open(root: impl AsRef<Path>, languages: LanguageSet) -> Result<Codebase> {
    let root = root.as_ref();
    tracing::debug!("opening {}", root.display());
    Codebase::open(root, languages)
}

/// Like [`open`], with an explicit `grove.toml`-equivalent configuration.
pub fn open_with_config(root: impl AsRef<Path>, languages: LanguageSet, config: GroveConfig) -> Result<Codebase> {
    Codebase::open_with_config(root, languages, config)
}
