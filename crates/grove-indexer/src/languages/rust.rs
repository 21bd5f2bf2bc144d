//! Rust syntax rules

use grove_core::{ByteRange, ImportedName, Language, SymbolKind};
use tree_sitter::Node;

use super::{
    BindMode, Construct, ImportBinding, ImportSpec, LanguageSpec, is_field, leading_siblings,
    named_children, range_of, text_of,
};

pub struct RustSpec;

const PRELUDE: &[&str] = &[
    "std", "core", "alloc", "Self", "Some", "None", "Ok", "Err", "Option", "Result", "Vec", "String", "Box",
    "Rc", "Arc", "Default", "Clone", "Copy", "Send", "Sync", "Sized", "Unpin", "Drop", "Fn", "FnMut", "FnOnce",
    "Iterator", "IntoIterator", "DoubleEndedIterator", "ExactSizeIterator", "Extend", "ToString", "ToOwned",
    "From", "Into", "TryFrom", "TryInto", "AsRef", "AsMut", "PartialEq", "Eq", "PartialOrd", "Ord", "Debug",
    "Hash", "FromIterator",
];

fn is_upper(node: Node<'_>, src: &[u8]) -> bool {
    text_of(node, src).starts_with(|c: char| c.is_ascii_uppercase())
}

/// Identifiers a pattern binds. Capitalised identifiers are constants or
/// variants, not bindings.
fn pattern_names<'t>(node: Node<'t>, src: &[u8], out: &mut Vec<Node<'t>>) {
    match node.kind() {
        "identifier" => {
            if !is_upper(node, src) {
                out.push(node);
            }
        }
        "shorthand_field_identifier" => out.push(node),
        "scoped_identifier" | "scoped_type_identifier" | "type_identifier" | "field_identifier" => {}
        "field_pattern" => match node.child_by_field_name("pattern") {
            Some(pattern) => pattern_names(pattern, src, out),
            None => {
                if let Some(name) = node.child_by_field_name("name") {
                    out.push(name);
                }
            }
        },
        "parameter" => {
            if let Some(pattern) = node.child_by_field_name("pattern") {
                pattern_names(pattern, src, out);
            }
        }
        "tuple_struct_pattern" | "struct_pattern" | "match_pattern" => {
            for child in named_children(node) {
                if !is_field(node, "type", child) && !is_field(node, "condition", child) {
                    pattern_names(child, src, out);
                }
            }
        }
        _ => {
            for child in named_children(node) {
                pattern_names(child, src, out);
            }
        }
    }
}

fn names_in<'t>(node: Node<'t>, src: &[u8]) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    pattern_names(node, src, &mut out);
    out
}

fn params_of<'t>(node: Node<'t>, src: &[u8]) -> Vec<Node<'t>> {
    node.child_by_field_name("parameters")
        .map(|params| {
            named_children(params)
                .into_iter()
                .filter(|p| p.kind() != "self_parameter")
                .flat_map(|p| names_in(p, src))
                .collect()
        })
        .unwrap_or_default()
}

fn join(prefix: &str, rest: &str) -> String {
    let rest: String = rest.split_whitespace().collect();
    if prefix.is_empty() {
        rest
    } else {
        format!("{prefix}::{rest}")
    }
}

/// Split `a::b::c` into (`a::b`, `c`).
fn split_last(path: &str) -> (&str, &str) {
    match path.rfind("::") {
        Some(i) => (&path[..i], &path[i + 2..]),
        None => ("", path),
    }
}

fn use_item(path: &str, name_node: Node<'_>, local: Node<'_>, item: Node<'_>, src: &[u8]) -> ImportSpec {
    let (module, name) = split_last(path);
    let binding = ImportBinding {
        name: text_of(local, src),
        name_range: range_of(local),
        range: range_of(item),
    };
    if module.is_empty() {
        ImportSpec {
            module: name.to_string(),
            imported: ImportedName::Module,
            name_range: None,
            binding: Some(binding),
        }
    } else {
        ImportSpec {
            module: module.to_string(),
            imported: ImportedName::Name(name.to_string()),
            name_range: Some(range_of(name_node)),
            binding: Some(binding),
        }
    }
}

fn use_tree(node: Node<'_>, prefix: &str, src: &[u8], out: &mut Vec<ImportSpec>) {
    match node.kind() {
        "self" if !prefix.is_empty() => {
            let (_, last) = split_last(prefix);
            out.push(ImportSpec {
                module: prefix.to_string(),
                imported: ImportedName::Module,
                name_range: None,
                binding: Some(ImportBinding {
                    name: last.to_string(),
                    name_range: range_of(node),
                    range: range_of(node),
                }),
            });
        }
        "identifier" | "crate" | "super" | "self" => {
            let path = join(prefix, &text_of(node, src));
            out.push(use_item(&path, node, node, node, src));
        }
        "scoped_identifier" => {
            let path = join(prefix, &text_of(node, src));
            let name = node.child_by_field_name("name").unwrap_or(node);
            out.push(use_item(&path, name, name, node, src));
        }
        "use_as_clause" => {
            let (Some(target), Some(alias)) = (node.child_by_field_name("path"), node.child_by_field_name("alias"))
            else {
                return;
            };
            let path = join(prefix, &text_of(target, src));
            let name = target.child_by_field_name("name").unwrap_or(target);
            if text_of(alias, src) != "_" {
                out.push(use_item(&path, name, alias, node, src));
            }
        }
        "use_wildcard" => {
            let path = named_children(node)
                .into_iter()
                .next()
                .map(|p| join(prefix, &text_of(p, src)))
                .unwrap_or_else(|| prefix.to_string());
            out.push(ImportSpec {
                module: path,
                imported: ImportedName::Glob,
                name_range: None,
                binding: None,
            });
        }
        "scoped_use_list" => {
            let inner = match node.child_by_field_name("path") {
                Some(path) => join(prefix, &text_of(path, src)),
                None => prefix.to_string(),
            };
            if let Some(list) = node.child_by_field_name("list") {
                use_tree(list, &inner, src, out);
            }
        }
        "use_list" => {
            for child in named_children(node) {
                use_tree(child, prefix, src, out);
            }
        }
        _ => {}
    }
}

fn use_declaration(node: Node<'_>, src: &[u8]) -> Vec<ImportSpec> {
    let mut specs = Vec::new();
    if let Some(argument) = node.child_by_field_name("argument") {
        use_tree(argument, "", src, &mut specs);
    }
    specs
}

fn named_type<'t>(node: Node<'t>, kind: SymbolKind) -> Construct<'t> {
    match node.child_by_field_name("name") {
        Some(name) => Construct::Class {
            name,
            kind,
            bases: Vec::new(),
        },
        None => Construct::Other,
    }
}

impl LanguageSpec for RustSpec {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn construct<'t>(&self, node: Node<'t>, src: &[u8]) -> Construct<'t> {
        match node.kind() {
            "function_item" | "function_signature_item" => Construct::Function {
                name: node.child_by_field_name("name"),
                params: params_of(node, src),
                kind: SymbolKind::Function,
            },
            "closure_expression" => Construct::Lambda {
                params: params_of(node, src),
            },
            "struct_item" | "union_item" => named_type(node, SymbolKind::Struct),
            "enum_item" => named_type(node, SymbolKind::Enum),
            "trait_item" => match node.child_by_field_name("name") {
                Some(name) => Construct::Class {
                    name,
                    kind: SymbolKind::Interface,
                    bases: node
                        .child_by_field_name("bounds")
                        .map(|b| named_children(b).into_iter().filter(|n| n.kind() == "type_identifier").collect())
                        .unwrap_or_default(),
                },
                None => Construct::Other,
            },
            "type_item" => match node.child_by_field_name("name") {
                Some(name) => Construct::TypeDecl {
                    name,
                    kind: SymbolKind::TypeAlias,
                },
                None => Construct::Other,
            },
            "impl_item" => Construct::ImplBlock {
                outer: ["trait", "type"]
                    .iter()
                    .filter_map(|f| node.child_by_field_name(f))
                    .collect(),
            },
            "mod_item" => match (node.child_by_field_name("name"), node.child_by_field_name("body")) {
                (Some(name), Some(_)) => Construct::Namespace {
                    name,
                    kind: SymbolKind::Module,
                },
                (Some(name), None) => Construct::Import(vec![ImportSpec {
                    module: format!("self::{}", text_of(name, src)),
                    imported: ImportedName::Module,
                    name_range: None,
                    binding: Some(ImportBinding {
                        name: text_of(name, src),
                        name_range: range_of(name),
                        range: range_of(node),
                    }),
                }]),
                _ => Construct::Other,
            },
            "const_item" | "static_item" => Construct::Binding {
                targets: node.child_by_field_name("name").into_iter().collect(),
                mode: BindMode::Declare,
                kind: SymbolKind::Constant,
                whole: true,
            },
            "let_declaration" => match node.child_by_field_name("pattern") {
                Some(pattern) => Construct::Binding {
                    targets: names_in(pattern, src),
                    mode: BindMode::Declare,
                    kind: SymbolKind::Variable,
                    whole: pattern.kind() == "identifier",
                },
                None => Construct::Other,
            },
            "for_expression" | "let_condition" | "match_arm" => Construct::Binding {
                targets: node.child_by_field_name("pattern").map(|p| names_in(p, src)).unwrap_or_default(),
                mode: BindMode::Declare,
                kind: SymbolKind::Variable,
                whole: false,
            },
            "type_parameters" => Construct::Binding {
                targets: named_children(node)
                    .into_iter()
                    .filter_map(|p| match p.kind() {
                        "type_identifier" => Some(p),
                        "constrained_type_parameter" | "optional_type_parameter" => {
                            p.child_by_field_name("left").or_else(|| p.child_by_field_name("name"))
                        }
                        _ => None,
                    })
                    .collect(),
                mode: BindMode::Declare,
                kind: SymbolKind::Parameter,
                whole: false,
            },
            "use_declaration" => Construct::Import(use_declaration(node, src)),
            "attribute_item" | "inner_attribute_item" | "macro_definition" | "extern_crate_declaration" => {
                Construct::Skip
            }
            _ => Construct::Other,
        }
    }

    fn is_reference(&self, node: Node<'_>, _src: &[u8]) -> bool {
        if !matches!(node.kind(), "identifier" | "type_identifier") {
            return false;
        }
        let Some(parent) = node.parent() else { return true };
        match parent.kind() {
            "scoped_identifier" | "scoped_type_identifier" | "enum_variant" => !is_field(parent, "name", node),
            "macro_invocation" => !is_field(parent, "macro", node),
            "lifetime" | "label" => false,
            _ => true,
        }
    }

    fn builtin_module(&self, name: &str) -> Option<&'static str> {
        PRELUDE.contains(&name).then_some("std")
    }

    fn block_kinds(&self) -> &'static [&'static str] {
        &["block", "declaration_list", "field_declaration_list", "enum_variant_list"]
    }

    fn attributes(&self, node: Node<'_>) -> Vec<ByteRange> {
        leading_siblings(node, &["attribute_item"])
    }

    fn statement_extent(&self, node: Node<'_>) -> ByteRange {
        let own = range_of(node);
        match self.attributes(node).first() {
            Some(first) => ByteRange::new(first.start, own.end),
            None => own,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_last() {
        assert_eq!(split_last("crate::a::b"), ("crate::a", "b"));
        assert_eq!(split_last("serde"), ("", "serde"));
        assert_eq!(join("crate::a", "b :: c"), "crate::a::b::c");
        assert_eq!(join("", "x"), "x");
    }

    #[test]
    fn test_prelude() {
        assert_eq!(RustSpec.builtin_module("Vec"), Some("std"));
        assert_eq!(RustSpec.builtin_module("Graph"), None);
    }
}
