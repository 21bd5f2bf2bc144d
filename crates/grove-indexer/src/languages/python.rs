//! Python syntax rules

use grove_core::{ByteRange, ImportedName, Language, SymbolKind};
use tree_sitter::Node;

use super::{
    BindMode, Construct, ImportBinding, ImportSpec, LanguageSpec, collect_kinds, field_children, is_field,
    leading_siblings, named_children, range_of, text_of,
};

pub struct PythonSpec;

const BUILTINS: &[&str] = &[
    "abs", "all", "any", "ascii", "bin", "bool", "breakpoint", "bytearray", "bytes", "callable", "chr",
    "classmethod", "compile", "complex", "delattr", "dict", "dir", "divmod", "enumerate", "eval", "exec",
    "filter", "float", "format", "frozenset", "getattr", "globals", "hasattr", "hash", "help", "hex", "id",
    "input", "int", "isinstance", "issubclass", "iter", "len", "list", "locals", "map", "max", "memoryview",
    "min", "next", "object", "oct", "open", "ord", "pow", "print", "property", "range", "repr", "reversed",
    "round", "set", "setattr", "slice", "sorted", "staticmethod", "str", "sum", "super", "tuple", "type",
    "vars", "zip", "__name__", "__file__", "__doc__", "__all__", "NotImplemented", "Ellipsis",
    "BaseException", "Exception", "ArithmeticError", "AssertionError", "AttributeError", "EOFError",
    "FileNotFoundError", "ImportError", "IndexError", "KeyError", "KeyboardInterrupt", "LookupError",
    "NameError", "NotImplementedError", "OSError", "OverflowError", "PermissionError", "RecursionError",
    "RuntimeError", "StopIteration", "SyntaxError", "TypeError", "UnicodeError", "ValueError",
    "ZeroDivisionError", "DeprecationWarning", "UserWarning", "Warning",
];

/// First identifier at or under `node`.
fn first_identifier(node: Node<'_>) -> Option<Node<'_>> {
    if node.kind() == "identifier" {
        return Some(node);
    }
    named_children(node).into_iter().find_map(first_identifier)
}

fn param_names(params: Node<'_>) -> Vec<Node<'_>> {
    named_children(params)
        .into_iter()
        .filter_map(|p| match p.kind() {
            "identifier" => Some(p),
            "default_parameter" | "typed_default_parameter" => p.child_by_field_name("name"),
            "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => first_identifier(p),
            _ => None,
        })
        .collect()
}

/// Names bound by an assignment target. Attribute and subscript targets bind nothing.
fn target_names(target: Node<'_>) -> Vec<Node<'_>> {
    collect_kinds(target, &["identifier"], &|n| {
        matches!(n.kind(), "attribute" | "subscript" | "call")
    })
}

fn import_statement(node: Node<'_>, src: &[u8]) -> Vec<ImportSpec> {
    field_children(node, "name")
        .into_iter()
        .filter_map(|item| match item.kind() {
            "dotted_name" => {
                let head = first_identifier(item)?;
                Some(ImportSpec {
                    module: text_of(item, src),
                    imported: ImportedName::Module,
                    name_range: None,
                    binding: Some(ImportBinding {
                        name: text_of(head, src),
                        name_range: range_of(head),
                        range: range_of(item),
                    }),
                })
            }
            "aliased_import" => {
                let name = item.child_by_field_name("name")?;
                let alias = item.child_by_field_name("alias")?;
                Some(ImportSpec {
                    module: text_of(name, src),
                    imported: ImportedName::Module,
                    name_range: None,
                    binding: Some(ImportBinding {
                        name: text_of(alias, src),
                        name_range: range_of(alias),
                        range: range_of(item),
                    }),
                })
            }
            _ => None,
        })
        .collect()
}

fn import_from_statement(node: Node<'_>, src: &[u8]) -> Vec<ImportSpec> {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return Vec::new();
    };
    let module: String = text_of(module_node, src).split_whitespace().collect();

    if named_children(node).iter().any(|c| c.kind() == "wildcard_import") {
        return vec![ImportSpec {
            module,
            imported: ImportedName::Glob,
            name_range: None,
            binding: None,
        }];
    }

    field_children(node, "name")
        .into_iter()
        .filter_map(|item| {
            let (name, alias) = match item.kind() {
                "aliased_import" => (item.child_by_field_name("name")?, item.child_by_field_name("alias")?),
                _ => (item, item),
            };
            Some(ImportSpec {
                module: module.clone(),
                imported: ImportedName::Name(text_of(name, src)),
                name_range: Some(range_of(name)),
                binding: Some(ImportBinding {
                    name: text_of(alias, src),
                    name_range: range_of(alias),
                    range: range_of(item),
                }),
            })
        })
        .collect()
}

impl LanguageSpec for PythonSpec {
    fn language(&self) -> Language {
        Language::Python
    }

    fn construct<'t>(&self, node: Node<'t>, src: &[u8]) -> Construct<'t> {
        match node.kind() {
            "function_definition" => Construct::Function {
                name: node.child_by_field_name("name"),
                params: node.child_by_field_name("parameters").map(param_names).unwrap_or_default(),
                kind: SymbolKind::Function,
            },
            "lambda" => Construct::Lambda {
                params: node.child_by_field_name("parameters").map(param_names).unwrap_or_default(),
            },
            "list_comprehension" | "set_comprehension" | "dictionary_comprehension" | "generator_expression" => {
                Construct::Lambda { params: Vec::new() }
            }
            "class_definition" => match node.child_by_field_name("name") {
                Some(name) => Construct::Class {
                    name,
                    kind: SymbolKind::Class,
                    bases: node
                        .child_by_field_name("superclasses")
                        .map(|args| {
                            named_children(args)
                                .into_iter()
                                .filter(|a| a.kind() != "keyword_argument")
                                .collect()
                        })
                        .unwrap_or_default(),
                },
                None => Construct::Other,
            },
            "assignment" => match node.child_by_field_name("left") {
                Some(left) => Construct::Binding {
                    targets: target_names(left),
                    mode: BindMode::DeclareOrWrite,
                    kind: SymbolKind::Variable,
                    whole: left.kind() == "identifier",
                },
                None => Construct::Other,
            },
            "augmented_assignment" => Construct::Binding {
                targets: node.child_by_field_name("left").map(target_names).unwrap_or_default(),
                mode: BindMode::Write,
                kind: SymbolKind::Variable,
                whole: false,
            },
            "for_statement" | "for_in_clause" => Construct::Binding {
                targets: node.child_by_field_name("left").map(target_names).unwrap_or_default(),
                mode: BindMode::DeclareOrWrite,
                kind: SymbolKind::Variable,
                whole: false,
            },
            "named_expression" => Construct::Binding {
                targets: node.child_by_field_name("name").into_iter().collect(),
                mode: BindMode::DeclareOrWrite,
                kind: SymbolKind::Variable,
                whole: false,
            },
            "as_pattern" | "except_clause" => match node.child_by_field_name("alias") {
                Some(alias) => Construct::Binding {
                    targets: target_names(alias),
                    mode: BindMode::DeclareOrWrite,
                    kind: SymbolKind::Variable,
                    whole: false,
                },
                None => Construct::Other,
            },
            "import_statement" => Construct::Import(import_statement(node, src)),
            "import_from_statement" => Construct::Import(import_from_statement(node, src)),
            "future_import_statement" | "global_statement" | "nonlocal_statement" => Construct::Skip,
            _ => Construct::Other,
        }
    }

    fn is_reference(&self, node: Node<'_>, _src: &[u8]) -> bool {
        if node.kind() != "identifier" {
            return false;
        }
        match node.parent() {
            Some(p) if p.kind() == "attribute" => !is_field(p, "attribute", node),
            Some(p) if p.kind() == "keyword_argument" => !is_field(p, "name", node),
            _ => true,
        }
    }

    fn builtin_module(&self, name: &str) -> Option<&'static str> {
        BUILTINS.contains(&name).then_some("builtins")
    }

    fn comment_prefix(&self) -> &'static str {
        "#"
    }

    fn block_kinds(&self) -> &'static [&'static str] {
        &["block"]
    }

    fn attributes(&self, node: Node<'_>) -> Vec<ByteRange> {
        match node.parent() {
            Some(p) if p.kind() == "decorated_definition" => named_children(p)
                .into_iter()
                .filter(|c| c.kind() == "decorator")
                .map(range_of)
                .collect(),
            _ => leading_siblings(node, &["decorator"]),
        }
    }

    fn statement_extent(&self, node: Node<'_>) -> ByteRange {
        match node.parent() {
            Some(p) if matches!(p.kind(), "decorated_definition" | "expression_statement") => range_of(p),
            _ => range_of(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        assert_eq!(PythonSpec.builtin_module("len"), Some("builtins"));
        assert_eq!(PythonSpec.builtin_module("ValueError"), Some("builtins"));
        assert_eq!(PythonSpec.builtin_module("add"), None);
    }
}
