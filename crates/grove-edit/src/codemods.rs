//! Codemods built on [`Transaction::stage_edit`]

use std::collections::BTreeSet;

use grove_core::{ByteRange, FileId, GroveError, ImportedName, NodeId, ResolvedTarget, Result, Symbol};
use grove_indexer::{Codebase, spec_for};
use tracing::debug;

use crate::transaction::Transaction;

fn symbol_of(codebase: &Codebase, id: NodeId) -> Result<&Symbol> {
    codebase.symbol(id).ok_or(GroveError::UnknownSymbol(id))
}

/// Whole statement of a symbol: decorators, attributes and export wrappers
/// included. Falls back to the symbol range when the file has no tree.
fn statement_of(codebase: &Codebase, symbol: &Symbol) -> ByteRange {
    codebase
        .file(symbol.file)
        .and_then(|view| view.symbol_node(symbol))
        .map(|node| node.extent())
        .unwrap_or(symbol.range)
}

impl Transaction {
    /// Rename a symbol at its definition and every usage resolved to it.
    ///
    /// Import specifiers naming the symbol are left alone; see
    /// [`Transaction::rename_import_bindings`]. Returns the number of staged edits.
    pub fn rename_symbol(&mut self, codebase: &Codebase, symbol: NodeId, new_name: &str) -> Result<usize> {
        let sym = symbol_of(codebase, symbol)?;
        let mut sites: BTreeSet<(FileId, ByteRange)> = BTreeSet::new();
        sites.insert((sym.file, sym.name_range));
        for usage in codebase.usages_of(symbol) {
            sites.insert((usage.file, usage.range));
        }

        debug!("rename {} -> {}: {} sites", sym.name, new_name, sites.len());
        for (file, range) in &sites {
            self.stage_edit(codebase, *file, *range, new_name)?;
        }
        Ok(sites.len())
    }

    /// Rename un-aliased import specifiers that bind `symbol` by name.
    ///
    /// `from util import add` becomes `from util import sum_`; `from util import
    /// add as plus` is untouched since the local name does not change.
    pub fn rename_import_bindings(&mut self, codebase: &Codebase, symbol: NodeId, new_name: &str) -> Result<usize> {
        let sym = symbol_of(codebase, symbol)?;
        let mut sites = BTreeSet::new();
        for edge in codebase.imports() {
            if edge.target != ResolvedTarget::Symbol(symbol) {
                continue;
            }
            let ImportedName::Name(imported) = &edge.imported else {
                continue;
            };
            if *imported != sym.name {
                continue;
            }
            let local = edge.alias.and_then(|alias| codebase.symbol(alias));
            if local.is_some_and(|alias| alias.name != *imported) {
                continue;
            }
            if let Some(range) = edge.name_range {
                sites.insert((edge.file, range));
            }
        }
        for (file, range) in &sites {
            self.stage_edit(codebase, *file, *range, new_name)?;
        }
        Ok(sites.len())
    }

    /// Append a line comment at the end of the last line of a symbol's
    /// statement.
    pub fn flag_symbol(&mut self, codebase: &Codebase, symbol: NodeId, message: &str) -> Result<()> {
        let sym = symbol_of(codebase, symbol)?;
        let source = codebase
            .source(sym.file)
            .ok_or_else(|| GroveError::FileNotFound(format!("{:?}", sym.file)))?;
        let prefix = spec_for(source.language).map(|s| s.comment_prefix()).unwrap_or("//");
        let at = ByteRange::point(line_end(source.text(), statement_of(codebase, sym).end));
        self.stage_edit(codebase, sym.file, at, format!(" {prefix} {message}"))
    }

    /// Delete a symbol's whole statement. A statement alone on its lines takes
    /// its indentation and trailing newline with it.
    pub fn remove_symbol(&mut self, codebase: &Codebase, symbol: NodeId) -> Result<()> {
        let sym = symbol_of(codebase, symbol)?;
        let text = codebase.source(sym.file).map(|s| s.text()).unwrap_or_default();
        let statement = statement_of(codebase, sym);
        let range = whole_lines(text, statement);
        self.stage_edit(codebase, sym.file, range, "")
    }

    /// Insert `text` in front of a symbol's statement.
    pub fn insert_before(&mut self, codebase: &Codebase, symbol: NodeId, text: &str) -> Result<()> {
        let sym = symbol_of(codebase, symbol)?;
        let at = statement_of(codebase, sym).start;
        self.stage_edit(codebase, sym.file, ByteRange::point(at), text)
    }

    /// Insert `text` right after a symbol's statement.
    pub fn insert_after(&mut self, codebase: &Codebase, symbol: NodeId, text: &str) -> Result<()> {
        let sym = symbol_of(codebase, symbol)?;
        let at = statement_of(codebase, sym).end;
        self.stage_edit(codebase, sym.file, ByteRange::point(at), text)
    }
}

/// Offset of the line break ending the line that contains `offset`.
fn line_end(text: &str, offset: usize) -> usize {
    let bytes = text.as_bytes();
    let end = bytes[offset..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(bytes.len(), |i| offset + i);
    if end > 0 && bytes[end - 1] == b'\r' { end - 1 } else { end }
}

/// Widen `range` to full lines when only whitespace surrounds it.
fn whole_lines(text: &str, range: ByteRange) -> ByteRange {
    let bytes = text.as_bytes();
    let mut start = range.start;
    while start > 0 && matches!(bytes[start - 1], b' ' | b'\t') {
        start -= 1;
    }
    if start > 0 && bytes[start - 1] != b'\n' {
        return range;
    }
    let mut end = range.end;
    while end < bytes.len() && matches!(bytes[end], b' ' | b'\t' | b'\r') {
        end += 1;
    }
    match bytes.get(end) {
        Some(b'\n') => ByteRange::new(start, end + 1),
        None => ByteRange::new(start, end),
        Some(_) => range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_lines_widens_standalone_statements() {
        let text = "a = 1\n    def f(): pass\nb = 2\n";
        let f = text.find("def").unwrap();
        let end = text.find("\nb").unwrap();
        assert_eq!(whole_lines(text, ByteRange::new(f, end)), ByteRange::new(6, end + 1));
    }

    #[test]
    fn line_end_skips_to_the_line_break() {
        let text = "def f(a, b):\r\n    pass\n";
        assert_eq!(line_end(text, 6), 12);
        assert_eq!(line_end(text, 12), 12);
        assert_eq!(line_end(text, text.len()), text.len());
        assert_eq!(line_end("x = 1", 1), 5);
    }

    #[test]
    fn whole_lines_keeps_inline_statements() {
        let text = "x = 1; y = 2\n";
        assert_eq!(whole_lines(text, ByteRange::new(7, 12)), ByteRange::new(7, 12));
        assert_eq!(whole_lines(text, ByteRange::new(0, 5)), ByteRange::new(0, 5));
    }
}
