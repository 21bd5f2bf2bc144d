//! Typed view over CST nodes
//!
//! Every tree-sitter node of a file can be looked at as a [`TypedNode`]: its
//! role in the model plus the capability data (name, block, module,
//! attributes) that role carries. Views are cached per file, keyed by range
//! and grammar kind, and survive edits that do not touch them.

use std::sync::Arc;

use dashmap::DashMap;
use grove_core::{ByteRange, TextEdit};
use grove_core::edit::{any_touches, shift_at};
use tree_sitter::Node;

use crate::languages::{Construct, LanguageSpec, field_children, range_of, text_of};

/// Role a CST node plays in the node model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Function,
    Class,
    Module,
    ImplBlock,
    /// Anonymous scope (lambda, closure, comprehension).
    Scope,
    Binding,
    Import,
    Identifier,
    Block,
    Comment,
    Error,
    Opaque,
}

/// Identity of a node inside one file revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub range: ByteRange,
    pub kind_id: u16,
}

impl NodeKey {
    pub fn of(node: Node<'_>) -> Self {
        NodeKey {
            range: range_of(node),
            kind_id: node.kind_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedNode {
    pub key: NodeKey,
    pub kind: &'static str,
    pub role: NodeRole,
    name: Option<(String, ByteRange)>,
    block: Option<ByteRange>,
    module: Option<String>,
    attributes: Vec<ByteRange>,
    extent: ByteRange,
}

/// Nodes that own a body block.
pub trait HasBlock {
    fn block_range(&self) -> ByteRange;
}

/// Nodes that import a module.
pub trait Importable {
    fn module(&self) -> &str;
}

/// Nodes that carry decorators or attributes.
pub trait AttributeHolder {
    fn attributes(&self) -> &[ByteRange];
}

impl TypedNode {
    pub fn build(spec: &dyn LanguageSpec, node: Node<'_>, src: &[u8]) -> Self {
        let role = spec.classify(node, src);
        let construct = spec.construct(node, src);
        let name_node = match &construct {
            Construct::Function { name, .. } => *name,
            Construct::Class { name, .. }
            | Construct::TypeDecl { name, .. }
            | Construct::Namespace { name, .. } => Some(*name),
            Construct::Binding { targets, .. } if targets.len() == 1 => targets.first().copied(),
            _ if role == NodeRole::Identifier => Some(node),
            _ => None,
        };
        let module = match &construct {
            Construct::Import(specs) => specs.first().map(|s| s.module.clone()),
            _ => None,
        };
        let block = ["body", "block"]
            .iter()
            .find_map(|field| field_children(node, field).into_iter().next())
            .map(range_of);
        let declares = matches!(role, NodeRole::Function | NodeRole::Class | NodeRole::Module | NodeRole::Binding | NodeRole::ImplBlock);

        TypedNode {
            key: NodeKey::of(node),
            kind: node.kind(),
            role,
            name: name_node.map(|n| (text_of(n, src), range_of(n))),
            block,
            module,
            attributes: if declares { spec.attributes(node) } else { Vec::new() },
            extent: if declares { spec.statement_extent(node) } else { range_of(node) },
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(|(n, _)| n.as_str())
    }

    pub fn name_range(&self) -> Option<ByteRange> {
        self.name.as_ref().map(|(_, r)| *r)
    }

    pub fn byte_range(&self) -> ByteRange {
        self.key.range
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// The whole statement this node belongs to, including decorators,
    /// attributes, export wrappers and declaration keywords.
    pub fn extent(&self) -> ByteRange {
        self.extent
    }

    pub fn as_has_block(&self) -> Option<&dyn HasBlock> {
        self.block.map(|_| self as &dyn HasBlock)
    }

    pub fn as_importable(&self) -> Option<&dyn Importable> {
        self.module.as_ref().map(|_| self as &dyn Importable)
    }

    pub fn as_attribute_holder(&self) -> Option<&dyn AttributeHolder> {
        if self.attributes.is_empty() {
            None
        } else {
            Some(self as &dyn AttributeHolder)
        }
    }
}

impl HasBlock for TypedNode {
    fn block_range(&self) -> ByteRange {
        self.block.unwrap_or(self.key.range)
    }
}

impl Importable for TypedNode {
    fn module(&self) -> &str {
        self.module.as_deref().unwrap_or_default()
    }
}

impl AttributeHolder for TypedNode {
    fn attributes(&self) -> &[ByteRange] {
        &self.attributes
    }
}

/// Per-file cache of typed views.
#[derive(Debug, Default)]
pub struct NodeCache {
    entries: DashMap<NodeKey, Arc<TypedNode>>,
}

impl NodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(&self, spec: &dyn LanguageSpec, node: Node<'_>, src: &[u8]) -> Arc<TypedNode> {
        let key = NodeKey::of(node);
        if let Some(hit) = self.entries.get(&key) {
            return hit.clone();
        }
        let typed = Arc::new(TypedNode::build(spec, node, src));
        self.entries.insert(key, typed.clone());
        typed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop views touched by `edits` and move the rest to their new offsets.
    pub fn apply_edits(&self, edits: &[TextEdit]) {
        let keys: Vec<NodeKey> = self.entries.iter().map(|e| *e.key()).collect();
        for key in keys {
            let Some((_, typed)) = self.entries.remove(&key) else { continue };
            if any_touches(edits, &key.range) || any_touches(edits, &typed.extent) {
                continue;
            }
            let delta = shift_at(edits, key.range.start);
            if delta == 0 {
                self.entries.insert(key, typed);
                continue;
            }
            let mut moved = (*typed).clone();
            moved.shift(delta);
            self.entries.insert(moved.key, Arc::new(moved));
        }
    }
}

impl TypedNode {
    fn shift(&mut self, delta: isize) {
        self.key.range = self.key.range.shifted(delta);
        if let Some((_, r)) = self.name.as_mut() {
            *r = r.shifted(delta);
        }
        self.block = self.block.map(|b| b.shifted(delta));
        self.extent = self.extent.shifted(delta);
        for a in &mut self.attributes {
            *a = a.shifted(delta);
        }
    }
}
