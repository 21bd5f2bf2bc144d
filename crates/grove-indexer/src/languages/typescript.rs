//! TypeScript and TSX syntax rules

use grove_core::{ByteRange, Language, SymbolKind};
use tree_sitter::Node;

use super::javascript::{
    GLOBALS, ecma_attributes, ecma_construct, ecma_default_export, ecma_is_reference, ecma_statement_extent,
    function_params, heritage_bases,
};
use super::{BindMode, Construct, LanguageSpec, named_children};

pub struct TypeScriptSpec {
    pub tsx: bool,
}

const UTILITY_TYPES: &[&str] = &[
    "Partial", "Required", "Readonly", "Record", "Pick", "Omit", "Exclude", "Extract", "NonNullable",
    "ReturnType", "Parameters", "InstanceType", "Awaited", "ReadonlyArray", "PromiseLike", "Iterable",
    "Iterator", "AsyncIterable", "PropertyKey", "ThisType", "Uppercase", "Lowercase",
];

impl LanguageSpec for TypeScriptSpec {
    fn language(&self) -> Language {
        if self.tsx { Language::Tsx } else { Language::TypeScript }
    }

    fn construct<'t>(&self, node: Node<'t>, src: &[u8]) -> Construct<'t> {
        match node.kind() {
            "function_signature" => Construct::Function {
                name: node.child_by_field_name("name"),
                params: function_params(node),
                kind: SymbolKind::Function,
            },
            "method_signature" | "abstract_method_signature" => Construct::Function {
                name: node
                    .child_by_field_name("name")
                    .filter(|n| n.kind() == "property_identifier"),
                params: function_params(node),
                kind: SymbolKind::Method,
            },
            "abstract_class_declaration" => match node.child_by_field_name("name") {
                Some(name) => Construct::Class {
                    name,
                    kind: SymbolKind::Class,
                    bases: named_children(node)
                        .into_iter()
                        .filter(|c| c.kind() == "class_heritage")
                        .flat_map(heritage_bases)
                        .collect(),
                },
                None => Construct::Other,
            },
            "interface_declaration" => match node.child_by_field_name("name") {
                Some(name) => Construct::Class {
                    name,
                    kind: SymbolKind::Interface,
                    bases: named_children(node)
                        .into_iter()
                        .filter(|c| c.kind() == "extends_type_clause")
                        .flat_map(named_children)
                        .collect(),
                },
                None => Construct::Other,
            },
            "type_alias_declaration" => match node.child_by_field_name("name") {
                Some(name) => Construct::Class {
                    name,
                    kind: SymbolKind::TypeAlias,
                    bases: Vec::new(),
                },
                None => Construct::Other,
            },
            "enum_declaration" => match node.child_by_field_name("name") {
                Some(name) => Construct::TypeDecl {
                    name,
                    kind: SymbolKind::Enum,
                },
                None => Construct::Other,
            },
            "internal_module" | "module" => match node.child_by_field_name("name") {
                Some(name) if name.kind() == "identifier" => Construct::Namespace {
                    name,
                    kind: SymbolKind::Module,
                },
                _ => Construct::Other,
            },
            "public_field_definition" => match node.child_by_field_name("name") {
                Some(name) if name.kind() == "property_identifier" => Construct::Binding {
                    targets: vec![name],
                    mode: BindMode::Declare,
                    kind: SymbolKind::Variable,
                    whole: true,
                },
                _ => Construct::Other,
            },
            "type_parameter" => Construct::Binding {
                targets: node.child_by_field_name("name").into_iter().collect(),
                mode: BindMode::Declare,
                kind: SymbolKind::Parameter,
                whole: false,
            },
            _ => ecma_construct(node, src),
        }
    }

    fn is_reference(&self, node: Node<'_>, src: &[u8]) -> bool {
        ecma_is_reference(node, src, &["identifier", "shorthand_property_identifier", "type_identifier"])
    }

    fn default_export(&self, node: Node<'_>, src: &[u8]) -> Option<String> {
        ecma_default_export(node, src)
    }

    fn builtin_module(&self, name: &str) -> Option<&'static str> {
        (GLOBALS.contains(&name) || UTILITY_TYPES.contains(&name)).then_some("globalThis")
    }

    fn block_kinds(&self) -> &'static [&'static str] {
        &["statement_block", "class_body", "interface_body", "enum_body"]
    }

    fn attributes(&self, node: Node<'_>) -> Vec<ByteRange> {
        ecma_attributes(node)
    }

    fn statement_extent(&self, node: Node<'_>) -> ByteRange {
        ecma_statement_extent(node)
    }
}
