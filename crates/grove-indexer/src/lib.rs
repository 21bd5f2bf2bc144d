//! Parsing, extraction, resolution and the `Codebase` handle

pub mod codebase;
pub mod config;
pub mod coordinator;
pub mod extractor;
pub mod file;
pub mod languages;
pub mod nodes;
pub mod parser_pool;
pub mod resolution;
pub mod resolver;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
pub mod tests;

pub use codebase::Codebase;
pub use config::{GroveConfig, ProjectConfig};
pub use coordinator::{Build, Coordinator};
pub use file::{FileView, ParseStatus, SourceFile};
pub use languages::{LanguageSpec, spec_for};
pub use nodes::{AttributeHolder, HasBlock, Importable, NodeCache, NodeKey, NodeRole, TypedNode};
pub use parser_pool::{ParseRequest, ParseResult, ParserPool, create_parser_pool};
pub use resolver::ImportResolver;
