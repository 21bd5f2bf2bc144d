//! Per-scope symbol table for name resolution

use crate::model::{FileId, NodeId, ScopeIdx};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

type ScopedName = (FileId, ScopeIdx, String);

/// Maps (file, scope, name) to the declaring symbol. Thread-safe for concurrent access.
///
/// The first declaration of a name in a scope is its binding; later ones are
/// kept in the graph but never shadow it.
pub struct SymbolTable {
    symbols: DashMap<ScopedName, NodeId>,
    /// For fast file lookup: file -> names bound in that file
    file_symbols: DashMap<FileId, Vec<(ScopeIdx, String)>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            symbols: DashMap::new(),
            file_symbols: DashMap::new(),
        }
    }

    /// Bind `name` in a scope. Returns false if the name was already bound there.
    pub fn insert(&self, file: FileId, scope: ScopeIdx, name: &str, node_id: NodeId) -> bool {
        match self.symbols.entry((file, scope, name.to_string())) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(node_id);
                self.file_symbols
                    .entry(file)
                    .or_default()
                    .push((scope, name.to_string()));
                true
            }
        }
    }

    /// Look up the binding of `name` in exactly this scope.
    pub fn lookup(&self, file: FileId, scope: ScopeIdx, name: &str) -> Option<NodeId> {
        self.symbols
            .get(&(file, scope, name.to_string()))
            .map(|r| *r.value())
    }

    /// Get all bindings of a file.
    pub fn symbols_in_file(&self, file: FileId) -> Vec<NodeId> {
        self.file_symbols
            .get(&file)
            .map(|r| {
                r.value()
                    .iter()
                    .filter_map(|(scope, name)| self.lookup(file, *scope, name))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove all bindings for a file (used on re-extraction).
    pub fn remove_file(&self, file: FileId) {
        if let Some((_, names)) = self.file_symbols.remove(&file) {
            for (scope, name) in names {
                self.symbols.remove(&(file, scope, name));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
