//! Grove Core — source graph model, symbol table, edits and diffs

pub mod codebase_graph;
pub mod diff;
pub mod edit;
pub mod error;
pub mod graph;
pub mod ledger;
pub mod model;
pub mod symbols;
pub mod workspace;


pub use codebase_graph::{CodebaseGraph, FileRecord, Reconciled};
pub use diff::{DiffEngine, GraphDiff};
pub use edit::{ByteRange, TextEdit};
pub use error::{Diagnostic, DiagnosticKind, GroveError, Result, Severity};
pub use graph::Graph;
pub use ledger::{EditLedger, Reservation, TxId};
pub use model::{
    EdgeId, EdgeKind, FileExtraction, FileId, FileNode, GraphEdge, GraphNode, ImportEdge, ImportId,
    ImportedName, Language, LanguageSet, LocalScope, LocalSymbol, NodeId, RawImport, RawUsage,
    Resolution, ResolvedTarget, Scope, ScopeIdx, ScopeKind, Symbol, SymbolKind, Unresolved, Usage,
    UsageId, UsageRole,
};
pub use symbols::SymbolTable;
pub use workspace::{WorkspaceType, detect_workspace};
