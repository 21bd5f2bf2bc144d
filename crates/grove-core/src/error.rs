//! Error taxonomy and per-file diagnostics

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::edit::ByteRange;
use crate::model::{FileId, NodeId};

pub type Result<T, E = GroveError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GroveError {
    /// A file produced no usable syntax tree.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Two staged edits on one file conflict.
    #[error("edit {new} overlaps staged edit {existing} in {path}")]
    Overlap {
        file: FileId,
        path: String,
        existing: ByteRange,
        new: ByteRange,
    },

    /// The graph references something that is not in it. Always a bug.
    #[error("graph invariant violated: {0}")]
    InvariantViolation(String),

    #[error("range {range} is outside file {file:?} of length {len}")]
    OutOfBounds { file: FileId, range: ByteRange, len: usize },

    #[error("range {range} splits a UTF-8 character in file {file:?}")]
    NotCharBoundary { file: FileId, range: ByteRange },

    /// The file changed after the edit was staged.
    #[error("file {path} changed since the edit was staged")]
    StaleEdit { file: FileId, path: String },

    #[error("transaction is already {0}")]
    TransactionClosed(&'static str),

    #[error("no such file: {0}")]
    FileNotFound(String),

    #[error("no such symbol: {0:?}")]
    UnknownSymbol(NodeId),

    #[error("unsupported language for {0}")]
    UnsupportedLanguage(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl GroveError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GroveError::Io { path: path.into(), source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// No usable tree; the file contributes no symbols.
    ParseError,
    /// The tree contains recovered syntax errors.
    SyntaxRecovered,
    /// The file could not be read or decoded.
    Unreadable,
    /// Skipped by size limit.
    Skipped,
    /// A project configuration file was malformed.
    Config,
}

/// A file-level problem recorded during a build. Never aborts the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn error(path: impl Into<PathBuf>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            path: path.into(),
            severity: Severity::Error,
            kind,
            message: message.into(),
        }
    }

    pub fn warning(path: impl Into<PathBuf>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            path: path.into(),
            severity: Severity::Warning,
            kind,
            message: message.into(),
        }
    }
}
