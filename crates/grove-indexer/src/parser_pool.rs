//! Thread-safe parser pool for tree-sitter parsers
//!
//! Tree-sitter parsers are not `Sync`, so each worker thread owns one parser
//! and requests reach the workers over a channel.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

use grove_core::edit::descending;
use grove_core::{GroveError, Language, Result, TextEdit};
use tree_sitter::{InputEdit, Parser, Point, Tree};

/// Get the tree-sitter grammar for a language.
pub fn grammar(language: Language) -> Option<tree_sitter::Language> {
    match language {
        Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
        Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        Language::Tsx => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
        Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
        Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
        Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
        Language::Other => None,
    }
}

/// A parsing request sent to the parser pool
#[derive(Debug)]
pub struct ParseRequest {
    pub language: Language,
    pub content: String,
    pub path: PathBuf,
    /// Previous tree, already adjusted with `Tree::edit`, for incremental parsing.
    pub old_tree: Option<Tree>,
}

impl ParseRequest {
    pub fn new(path: PathBuf, language: Language, content: String) -> Self {
        ParseRequest { language, content, path, old_tree: None }
    }
}

/// Result of a parsing operation
#[derive(Debug)]
pub struct ParseResult {
    pub tree: Tree,
    pub path: PathBuf,
    pub content: String,
}

impl ParseResult {
    /// Whether the tree contains ERROR or MISSING nodes.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

/// Internal message for the parser worker
#[derive(Debug)]
struct WorkerRequest {
    request: ParseRequest,
    response_sender: Sender<Result<ParseResult>>,
}

/// Thread-safe parser pool
pub struct ParserPool {
    sender: Sender<WorkerRequest>,
    workers: usize,
}

impl std::fmt::Debug for ParserPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserPool").field("workers", &self.workers).finish()
    }
}

impl ParserPool {
    /// Create a new parser pool with the specified number of worker threads
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = channel::<WorkerRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        for i in 0..num_workers {
            let receiver = receiver.clone();
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender, workers: num_workers }
    }

    /// Worker thread function that processes parsing requests
    fn worker_thread(worker_id: usize, receiver: Arc<Mutex<Receiver<WorkerRequest>>>) {
        tracing::debug!("Parser worker {} started", worker_id);

        let mut parser = Parser::new();

        loop {
            let next = match receiver.lock() {
                Ok(guard) => guard.recv(),
                Err(_) => break,
            };
            let WorkerRequest { request, response_sender } = match next {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!("Parser worker {} shutting down", worker_id);
                    break;
                }
            };

            let result = Self::run(&mut parser, request);
            if response_sender.send(result).is_err() {
                tracing::warn!("Failed to send parse result back to caller");
            }
        }
    }

    fn run(parser: &mut Parser, request: ParseRequest) -> Result<ParseResult> {
        let ParseRequest { language, content, path, old_tree } = request;
        let grammar = grammar(language).ok_or_else(|| GroveError::UnsupportedLanguage(path.clone()))?;
        parser.set_language(&grammar).map_err(|e| GroveError::Parse {
            path: path.clone(),
            message: format!("failed to set language: {e}"),
        })?;

        match parser.parse(&content, old_tree.as_ref()) {
            Some(tree) => Ok(ParseResult { tree, path, content }),
            None => {
                parser.reset();
                Err(GroveError::Parse {
                    path,
                    message: "parser produced no tree".to_string(),
                })
            }
        }
    }

    /// Parse content synchronously using the parser pool.
    /// Blocks the current thread until parsing is complete.
    pub fn parse_blocking(&self, request: ParseRequest) -> Result<ParseResult> {
        let (response_sender, response_receiver) = channel();
        self.submit(request, response_sender)?;
        response_receiver.recv().map_err(|_| pool_error("parser worker died"))?
    }

    /// Parse many files at once; results come back in request order.
    pub fn parse_batch(&self, requests: Vec<ParseRequest>) -> Vec<Result<ParseResult>> {
        let mut pending = Vec::with_capacity(requests.len());
        for request in requests {
            let (response_sender, response_receiver) = channel();
            match self.submit(request, response_sender) {
                Ok(()) => pending.push(Ok(response_receiver)),
                Err(e) => pending.push(Err(e)),
            }
        }
        pending
            .into_iter()
            .map(|slot| {
                slot.and_then(|rx| rx.recv().map_err(|_| pool_error("parser worker died"))?)
            })
            .collect()
    }

    /// Apply `edits` to `old_text`, adjust `old_tree` to match, and parse the
    /// new text incrementally.
    pub fn reparse(
        &self,
        path: PathBuf,
        language: Language,
        old_tree: &Tree,
        old_text: &str,
        edits: &[TextEdit],
    ) -> Result<ParseResult> {
        let mut tree = old_tree.clone();
        let mut text = old_text.to_string();
        for edit in descending(edits) {
            let input = input_edit(&text, &edit);
            text.replace_range(edit.range.start..edit.range.end, &edit.text);
            tree.edit(&input);
        }
        self.parse_blocking(ParseRequest {
            language,
            content: text,
            path,
            old_tree: Some(tree),
        })
    }

    fn submit(&self, request: ParseRequest, response_sender: Sender<Result<ParseResult>>) -> Result<()> {
        self.sender
            .send(WorkerRequest { request, response_sender })
            .map_err(|_| pool_error("parser pool is shut down"))
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

fn pool_error(message: &str) -> GroveError {
    GroveError::Parse {
        path: PathBuf::new(),
        message: message.to_string(),
    }
}

/// Row/column of a byte offset.
pub fn point_at(text: &str, offset: usize) -> Point {
    let before = &text.as_bytes()[..offset.min(text.len())];
    let row = before.iter().filter(|b| **b == b'\n').count();
    let column = match before.iter().rposition(|b| *b == b'\n') {
        Some(nl) => before.len() - nl - 1,
        None => before.len(),
    };
    Point { row, column }
}

/// Describe `edit` against `text` (the text before the edit is applied).
pub fn input_edit(text: &str, edit: &TextEdit) -> InputEdit {
    let start_position = point_at(text, edit.range.start);
    let old_end_position = point_at(text, edit.range.end);
    let inserted_end = point_at(&edit.text, edit.text.len());
    let new_end_position = if inserted_end.row == 0 {
        Point {
            row: start_position.row,
            column: start_position.column + inserted_end.column,
        }
    } else {
        Point {
            row: start_position.row + inserted_end.row,
            column: inserted_end.column,
        }
    };
    InputEdit {
        start_byte: edit.range.start,
        old_end_byte: edit.range.end,
        new_end_byte: edit.range.start + edit.text.len(),
        start_position,
        old_end_position,
        new_end_position,
    }
}

impl Clone for ParserPool {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            workers: self.workers,
        }
    }
}

/// Convenience function to create a parser pool with default settings
pub fn create_parser_pool() -> ParserPool {
    // Use number of CPU cores as default worker count, but at least 2
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);

    ParserPool::new(num_workers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_core::ByteRange;

    #[test]
    fn test_parse_python() {
        let pool = create_parser_pool();
        let request = ParseRequest::new(
            PathBuf::from("util.py"),
            Language::Python,
            "def add(a, b):\n    return a + b\n".to_string(),
        );
        let result = pool.parse_blocking(request).unwrap();
        assert_eq!(result.tree.root_node().kind(), "module");
        assert!(!result.has_errors());
    }

    #[test]
    fn test_parse_typescript_and_tsx() {
        let pool = create_parser_pool();
        let results = pool.parse_batch(vec![
            ParseRequest::new(PathBuf::from("a.ts"), Language::TypeScript, "class A { m(): void {} }".into()),
            ParseRequest::new(PathBuf::from("b.tsx"), Language::Tsx, "const el = <div>{x}</div>;".into()),
        ]);
        assert_eq!(results.len(), 2);
        for result in results {
            let result = result.unwrap();
            assert_eq!(result.tree.root_node().kind(), "program");
            assert!(!result.has_errors());
        }
    }

    #[test]
    fn test_syntax_errors_are_reported_not_thrown() {
        let pool = create_parser_pool();
        let request = ParseRequest::new(PathBuf::from("bad.py"), Language::Python, "def (:\n".into());
        let result = pool.parse_blocking(request).unwrap();
        assert!(result.has_errors());
    }

    #[test]
    fn test_unsupported_language() {
        let pool = create_parser_pool();
        let request = ParseRequest::new(PathBuf::from("notes.txt"), Language::Other, String::new());
        assert!(matches!(pool.parse_blocking(request), Err(GroveError::UnsupportedLanguage(_))));
    }

    #[test]
    fn test_incremental_reparse_matches_fresh_parse() {
        let pool = create_parser_pool();
        let old_text = "def add(a, b):\n    return a + b\n\nadd(1, 2)\n";
        let first = pool
            .parse_blocking(ParseRequest::new(PathBuf::from("m.py"), Language::Python, old_text.into()))
            .unwrap();
        let edits = vec![
            TextEdit::new(ByteRange::new(4, 7), "sum_"),
            TextEdit::new(ByteRange::new(33, 36), "sum_"),
        ];
        let re = pool
            .reparse(PathBuf::from("m.py"), Language::Python, &first.tree, old_text, &edits)
            .unwrap();
        assert_eq!(re.content, "def sum_(a, b):\n    return a + b\n\nsum_(1, 2)\n");

        let fresh = pool
            .parse_blocking(ParseRequest::new(PathBuf::from("m.py"), Language::Python, re.content.clone()))
            .unwrap();
        assert_eq!(re.tree.root_node().to_sexp(), fresh.tree.root_node().to_sexp());
    }

    #[test]
    fn test_point_at() {
        let text = "ab\ncd\nef";
        assert_eq!(point_at(text, 0), Point { row: 0, column: 0 });
        assert_eq!(point_at(text, 4), Point { row: 1, column: 1 });
        assert_eq!(point_at(text, 8), Point { row: 2, column: 2 });
    }
}
