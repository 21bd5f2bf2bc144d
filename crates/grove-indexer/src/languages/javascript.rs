//! JavaScript syntax rules, shared with TypeScript

use grove_core::{ByteRange, ImportedName, Language, SymbolKind};
use tree_sitter::Node;

use super::{
    BindMode, Construct, ImportBinding, ImportSpec, LanguageSpec, is_field, leading_siblings, named_children,
    range_of, text_of, unquote,
};

pub struct JavaScriptSpec;

pub(super) const GLOBALS: &[&str] = &[
    "undefined", "NaN", "Infinity", "globalThis", "window", "document", "console", "navigator", "location",
    "Math", "JSON", "Object", "Array", "String", "Number", "Boolean", "BigInt", "Symbol", "Date", "RegExp",
    "Error", "TypeError", "RangeError", "SyntaxError", "Promise", "Map", "Set", "WeakMap", "WeakSet",
    "Proxy", "Reflect", "Intl", "ArrayBuffer", "Uint8Array", "DataView", "parseInt", "parseFloat", "isNaN",
    "isFinite", "encodeURIComponent", "decodeURIComponent", "setTimeout", "clearTimeout", "setInterval",
    "clearInterval", "queueMicrotask", "structuredClone", "fetch", "URL", "URLSearchParams", "TextEncoder",
    "TextDecoder", "require", "module", "exports", "process", "Buffer", "__dirname", "__filename",
    "arguments",
];

/// Identifiers a destructuring pattern binds. Default values are not targets.
pub(super) fn pattern_names<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => out.push(node),
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = node.child_by_field_name("left") {
                pattern_names(left, out);
            }
        }
        "pair_pattern" => {
            if let Some(value) = node.child_by_field_name("value") {
                pattern_names(value, out);
            }
        }
        "required_parameter" | "optional_parameter" => {
            if let Some(pattern) = node.child_by_field_name("pattern") {
                pattern_names(pattern, out);
            }
        }
        "object_pattern" | "array_pattern" | "rest_pattern" | "parenthesized_expression" => {
            for child in named_children(node) {
                pattern_names(child, out);
            }
        }
        _ => {}
    }
}

pub(super) fn names_in(node: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    pattern_names(node, &mut out);
    out
}

pub(super) fn function_params(node: Node<'_>) -> Vec<Node<'_>> {
    if let Some(single) = node.child_by_field_name("parameter") {
        return vec![single];
    }
    match node.child_by_field_name("parameters") {
        Some(params) => named_children(params).into_iter().flat_map(names_in).collect(),
        None => Vec::new(),
    }
}

fn is_function_value(value: Option<Node<'_>>) -> bool {
    value.is_some_and(|v| matches!(v.kind(), "arrow_function" | "function_expression" | "function" | "generator_function"))
}

fn binding_kind(declarator: Node<'_>, src: &[u8]) -> SymbolKind {
    if is_function_value(declarator.child_by_field_name("value")) {
        return SymbolKind::Function;
    }
    let is_const = declarator
        .parent()
        .filter(|p| p.kind() == "lexical_declaration")
        .and_then(|p| p.child_by_field_name("kind"))
        .is_some_and(|k| text_of(k, src) == "const");
    if is_const { SymbolKind::Constant } else { SymbolKind::Variable }
}

fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| !c.is_named() && c.kind() == token);
    found
}

fn import_statement(node: Node<'_>, src: &[u8]) -> Vec<ImportSpec> {
    let children = named_children(node);
    let Some(source) = node.child_by_field_name("source") else {
        // `import x = require("m")`
        return children
            .iter()
            .filter(|c| c.kind() == "import_require_clause")
            .filter_map(|clause| {
                let name = named_children(*clause).into_iter().find(|c| c.kind() == "identifier")?;
                let module = clause.child_by_field_name("source")?;
                Some(ImportSpec {
                    module: unquote(&text_of(module, src)),
                    imported: ImportedName::Module,
                    name_range: None,
                    binding: Some(ImportBinding {
                        name: text_of(name, src),
                        name_range: range_of(name),
                        range: range_of(name),
                    }),
                })
            })
            .collect();
    };
    let module = unquote(&text_of(source, src));
    let Some(clause) = children.iter().find(|c| c.kind() == "import_clause") else {
        return vec![ImportSpec {
            module,
            imported: ImportedName::Module,
            name_range: None,
            binding: None,
        }];
    };

    let mut specs = Vec::new();
    for item in named_children(*clause) {
        match item.kind() {
            "identifier" => specs.push(ImportSpec {
                module: module.clone(),
                imported: ImportedName::Default,
                name_range: None,
                binding: Some(ImportBinding {
                    name: text_of(item, src),
                    name_range: range_of(item),
                    range: range_of(item),
                }),
            }),
            "namespace_import" => {
                if let Some(name) = named_children(item).into_iter().find(|c| c.kind() == "identifier") {
                    specs.push(ImportSpec {
                        module: module.clone(),
                        imported: ImportedName::Module,
                        name_range: None,
                        binding: Some(ImportBinding {
                            name: text_of(name, src),
                            name_range: range_of(name),
                            range: range_of(item),
                        }),
                    });
                }
            }
            "named_imports" => {
                specs.extend(specifiers(item, "import_specifier", &module, src));
            }
            _ => {}
        }
    }
    specs
}

/// `{ a, b as c }` in imports and re-exports.
fn specifiers(list: Node<'_>, kind: &str, module: &str, src: &[u8]) -> Vec<ImportSpec> {
    named_children(list)
        .into_iter()
        .filter(|s| s.kind() == kind)
        .filter_map(|spec| {
            let name = spec.child_by_field_name("name")?;
            let local = spec.child_by_field_name("alias").unwrap_or(name);
            let imported = unquote(&text_of(name, src));
            let imported = if imported == "default" {
                ImportedName::Default
            } else {
                ImportedName::Name(imported)
            };
            Some(ImportSpec {
                module: module.to_string(),
                imported,
                name_range: Some(range_of(name)),
                binding: Some(ImportBinding {
                    name: unquote(&text_of(local, src)),
                    name_range: range_of(local),
                    range: range_of(spec),
                }),
            })
        })
        .collect()
}

/// `export ... from "m"`: re-exports bind the exported names in this module.
fn reexport(node: Node<'_>, source: Node<'_>, src: &[u8]) -> Vec<ImportSpec> {
    let module = unquote(&text_of(source, src));
    let children = named_children(node);
    if let Some(clause) = children.iter().find(|c| c.kind() == "export_clause") {
        return specifiers(*clause, "export_specifier", &module, src);
    }
    if let Some(ns) = children.iter().find(|c| c.kind() == "namespace_export") {
        if let Some(name) = named_children(*ns).into_iter().next() {
            return vec![ImportSpec {
                module,
                imported: ImportedName::Module,
                name_range: None,
                binding: Some(ImportBinding {
                    name: unquote(&text_of(name, src)),
                    name_range: range_of(name),
                    range: range_of(*ns),
                }),
            }];
        }
    }
    vec![ImportSpec {
        module,
        imported: ImportedName::Glob,
        name_range: None,
        binding: None,
    }]
}

/// Constructs common to JavaScript and TypeScript.
pub(super) fn ecma_construct<'t>(node: Node<'t>, src: &[u8]) -> Construct<'t> {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => Construct::Function {
            name: node.child_by_field_name("name"),
            params: function_params(node),
            kind: SymbolKind::Function,
        },
        "method_definition" => {
            let name = node
                .child_by_field_name("name")
                .filter(|n| matches!(n.kind(), "property_identifier" | "private_property_identifier"));
            Construct::Function {
                name,
                params: function_params(node),
                kind: SymbolKind::Method,
            }
        }
        "function_expression" | "function" | "generator_function" | "arrow_function" => Construct::Lambda {
            params: function_params(node),
        },
        "class_declaration" | "class" => match node.child_by_field_name("name") {
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
        "variable_declarator" => match node.child_by_field_name("name") {
            Some(name) => Construct::Binding {
                targets: names_in(name),
                mode: BindMode::Declare,
                kind: binding_kind(node, src),
                whole: name.kind() == "identifier",
            },
            None => Construct::Other,
        },
        "field_definition" => match node.child_by_field_name("property") {
            Some(name) if name.kind() == "property_identifier" => Construct::Binding {
                targets: vec![name],
                mode: BindMode::Declare,
                kind: if is_function_value(node.child_by_field_name("value")) {
                    SymbolKind::Method
                } else {
                    SymbolKind::Variable
                },
                whole: true,
            },
            _ => Construct::Other,
        },
        "assignment_expression" | "augmented_assignment_expression" => Construct::Binding {
            targets: node.child_by_field_name("left").map(names_in).unwrap_or_default(),
            mode: BindMode::Write,
            kind: SymbolKind::Variable,
            whole: false,
        },
        "for_in_statement" => {
            let declared = node.child_by_field_name("kind").is_some();
            Construct::Binding {
                targets: node.child_by_field_name("left").map(names_in).unwrap_or_default(),
                mode: if declared { BindMode::Declare } else { BindMode::Write },
                kind: SymbolKind::Variable,
                whole: false,
            }
        }
        "catch_clause" => Construct::Binding {
            targets: node.child_by_field_name("parameter").map(names_in).unwrap_or_default(),
            mode: BindMode::Declare,
            kind: SymbolKind::Variable,
            whole: false,
        },
        "import_statement" => Construct::Import(import_statement(node, src)),
        "export_statement" => match node.child_by_field_name("source") {
            Some(source) => Construct::Import(reexport(node, source, src)),
            None => Construct::Other,
        },
        _ => Construct::Other,
    }
}

pub(super) fn heritage_bases(heritage: Node<'_>) -> Vec<Node<'_>> {
    let mut bases = Vec::new();
    for child in named_children(heritage) {
        match child.kind() {
            "extends_clause" => bases.extend(super::field_children(child, "value")),
            "implements_clause" => bases.extend(named_children(child)),
            _ => bases.push(child),
        }
    }
    bases
}

pub(super) fn ecma_is_reference(node: Node<'_>, src: &[u8], kinds: &[&str]) -> bool {
    if !kinds.contains(&node.kind()) {
        return false;
    }
    let Some(parent) = node.parent() else { return true };
    match parent.kind() {
        "export_specifier" => !is_field(parent, "alias", node),
        "jsx_closing_element" => false,
        "jsx_opening_element" | "jsx_self_closing_element" => {
            // lowercase tags are intrinsic elements
            !text_of(node, src).starts_with(|c: char| c.is_ascii_lowercase())
        }
        _ => true,
    }
}

pub(super) fn ecma_default_export(node: Node<'_>, src: &[u8]) -> Option<String> {
    if node.kind() != "export_statement" || !has_token(node, "default") {
        return None;
    }
    if let Some(decl) = node.child_by_field_name("declaration") {
        return decl.child_by_field_name("name").map(|n| text_of(n, src));
    }
    node.child_by_field_name("value")
        .filter(|v| v.kind() == "identifier")
        .map(|v| text_of(v, src))
}

pub(super) fn ecma_attributes(node: Node<'_>) -> Vec<ByteRange> {
    let mut attrs = leading_siblings(node, &["decorator"]);
    attrs.extend(
        named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "decorator")
            .map(range_of),
    );
    attrs
}

pub(super) fn ecma_statement_extent(node: Node<'_>) -> ByteRange {
    let mut outer = node;
    if node.kind() == "variable_declarator" {
        if let Some(decl) = node.parent() {
            let declarators = named_children(decl)
                .into_iter()
                .filter(|c| c.kind() == "variable_declarator")
                .count();
            if declarators == 1 {
                outer = decl;
            }
        }
    }
    match outer.parent() {
        Some(p) if matches!(p.kind(), "export_statement" | "expression_statement") => range_of(p),
        _ => range_of(outer),
    }
}

impl LanguageSpec for JavaScriptSpec {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn construct<'t>(&self, node: Node<'t>, src: &[u8]) -> Construct<'t> {
        ecma_construct(node, src)
    }

    fn is_reference(&self, node: Node<'_>, src: &[u8]) -> bool {
        ecma_is_reference(node, src, &["identifier", "shorthand_property_identifier"])
    }

    fn default_export(&self, node: Node<'_>, src: &[u8]) -> Option<String> {
        ecma_default_export(node, src)
    }

    fn builtin_module(&self, name: &str) -> Option<&'static str> {
        GLOBALS.contains(&name).then_some("globalThis")
    }

    fn block_kinds(&self) -> &'static [&'static str] {
        &["statement_block", "class_body"]
    }

    fn attributes(&self, node: Node<'_>) -> Vec<ByteRange> {
        ecma_attributes(node)
    }

    fn statement_extent(&self, node: Node<'_>) -> ByteRange {
        ecma_statement_extent(node)
    }
}
