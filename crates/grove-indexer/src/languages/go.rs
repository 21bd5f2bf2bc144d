//! Go syntax rules

use grove_core::{ByteRange, ImportedName, Language, SymbolKind};
use tree_sitter::Node;

use super::{
    BindMode, Construct, ImportBinding, ImportSpec, LanguageSpec, collect_kinds, field_children, is_field,
    named_children, range_of, text_of, unquote,
};

pub struct GoSpec;

const BUILTINS: &[&str] = &[
    "append", "cap", "clear", "close", "complex", "copy", "delete", "imag", "len", "make", "max", "min", "new",
    "panic", "print", "println", "real", "recover", "any", "bool", "byte", "comparable", "complex64",
    "complex128", "error", "float32", "float64", "int", "int8", "int16", "int32", "int64", "rune", "string",
    "uint", "uint8", "uint16", "uint32", "uint64", "uintptr", "true", "false", "iota", "nil",
];

fn not_blank<'t>(nodes: Vec<Node<'t>>, src: &[u8]) -> Vec<Node<'t>> {
    nodes.into_iter().filter(|n| text_of(*n, src) != "_").collect()
}

/// Plain identifiers directly inside an expression list.
fn list_names<'t>(list: Option<Node<'t>>, src: &[u8]) -> Vec<Node<'t>> {
    let names = list
        .map(|l| named_children(l).into_iter().filter(|n| n.kind() == "identifier").collect())
        .unwrap_or_default();
    not_blank(names, src)
}

fn param_names<'t>(list: Option<Node<'t>>, src: &[u8]) -> Vec<Node<'t>> {
    let names = list
        .map(|l| {
            named_children(l)
                .into_iter()
                .flat_map(|p| field_children(p, "name"))
                .collect()
        })
        .unwrap_or_default();
    not_blank(names, src)
}

fn import_declaration(node: Node<'_>, src: &[u8]) -> Vec<ImportSpec> {
    collect_kinds(node, &["import_spec"], &|_| false)
        .into_iter()
        .filter_map(|spec| {
            let path = spec.child_by_field_name("path")?;
            let module = unquote(&text_of(path, src));
            let name = spec.child_by_field_name("name");
            let import = match name.map(|n| n.kind()) {
                Some("dot") => ImportSpec {
                    module,
                    imported: ImportedName::Glob,
                    name_range: None,
                    binding: None,
                },
                Some("blank_identifier") => ImportSpec {
                    module,
                    imported: ImportedName::Module,
                    name_range: None,
                    binding: None,
                },
                Some(_) => {
                    let alias = name?;
                    ImportSpec {
                        binding: Some(ImportBinding {
                            name: text_of(alias, src),
                            name_range: range_of(alias),
                            range: range_of(spec),
                        }),
                        module,
                        imported: ImportedName::Module,
                        name_range: None,
                    }
                }
                None => {
                    let package = module.rsplit('/').next().unwrap_or(&module).to_string();
                    ImportSpec {
                        binding: Some(ImportBinding {
                            name: package,
                            name_range: range_of(path),
                            range: range_of(spec),
                        }),
                        module,
                        imported: ImportedName::Module,
                        name_range: None,
                    }
                }
            };
            Some(import)
        })
        .collect()
}

impl LanguageSpec for GoSpec {
    fn language(&self) -> Language {
        Language::Go
    }

    fn construct<'t>(&self, node: Node<'t>, src: &[u8]) -> Construct<'t> {
        match node.kind() {
            "function_declaration" => Construct::Function {
                name: node.child_by_field_name("name"),
                params: param_names(node.child_by_field_name("parameters"), src),
                kind: SymbolKind::Function,
            },
            "method_declaration" => {
                let mut params = param_names(node.child_by_field_name("receiver"), src);
                params.extend(param_names(node.child_by_field_name("parameters"), src));
                Construct::Function {
                    name: node.child_by_field_name("name"),
                    params,
                    kind: SymbolKind::Method,
                }
            }
            "method_elem" | "method_spec" => Construct::Function {
                name: node.child_by_field_name("name"),
                params: param_names(node.child_by_field_name("parameters"), src),
                kind: SymbolKind::Method,
            },
            "func_literal" => Construct::Lambda {
                params: param_names(node.child_by_field_name("parameters"), src),
            },
            "type_spec" | "type_alias" => match node.child_by_field_name("name") {
                Some(name) => {
                    let kind = match node.child_by_field_name("type").map(|t| t.kind()) {
                        _ if node.kind() == "type_alias" => SymbolKind::TypeAlias,
                        Some("struct_type") => SymbolKind::Struct,
                        Some("interface_type") => SymbolKind::Interface,
                        _ => SymbolKind::TypeAlias,
                    };
                    Construct::Class {
                        name,
                        kind,
                        bases: Vec::new(),
                    }
                }
                None => Construct::Other,
            },
            "var_spec" | "const_spec" => {
                let targets = not_blank(field_children(node, "name"), src);
                Construct::Binding {
                    whole: targets.len() == 1,
                    targets,
                    mode: BindMode::Declare,
                    kind: if node.kind() == "const_spec" {
                        SymbolKind::Constant
                    } else {
                        SymbolKind::Variable
                    },
                }
            }
            "short_var_declaration" => {
                let targets = list_names(node.child_by_field_name("left"), src);
                Construct::Binding {
                    whole: targets.len() == 1,
                    targets,
                    mode: BindMode::DeclareOrWrite,
                    kind: SymbolKind::Variable,
                }
            }
            "range_clause" => Construct::Binding {
                targets: list_names(node.child_by_field_name("left"), src),
                mode: BindMode::DeclareOrWrite,
                kind: SymbolKind::Variable,
                whole: false,
            },
            "type_switch_statement" => Construct::Binding {
                targets: list_names(node.child_by_field_name("alias"), src),
                mode: BindMode::DeclareOrWrite,
                kind: SymbolKind::Variable,
                whole: false,
            },
            "assignment_statement" => Construct::Binding {
                targets: list_names(node.child_by_field_name("left"), src),
                mode: BindMode::Write,
                kind: SymbolKind::Variable,
                whole: false,
            },
            "type_parameter_declaration" => Construct::Binding {
                targets: field_children(node, "name"),
                mode: BindMode::Declare,
                kind: SymbolKind::Parameter,
                whole: false,
            },
            "import_declaration" => Construct::Import(import_declaration(node, src)),
            "package_clause" => Construct::Skip,
            _ => Construct::Other,
        }
    }

    fn is_reference(&self, node: Node<'_>, _src: &[u8]) -> bool {
        if !matches!(node.kind(), "identifier" | "type_identifier" | "package_identifier") {
            return false;
        }
        let Some(parent) = node.parent() else { return true };
        match parent.kind() {
            "qualified_type" => !is_field(parent, "name", node),
            // composite literal keys name fields
            "literal_element" => parent
                .parent()
                .filter(|p| p.kind() == "keyed_element")
                .and_then(|p| p.named_child(0))
                .is_none_or(|key| key.id() != parent.id()),
            _ => true,
        }
    }

    fn builtin_module(&self, name: &str) -> Option<&'static str> {
        BUILTINS.contains(&name).then_some("builtin")
    }

    fn block_kinds(&self) -> &'static [&'static str] {
        &["block", "field_declaration_list"]
    }

    fn statement_extent(&self, node: Node<'_>) -> ByteRange {
        match node.parent() {
            Some(p) if matches!(p.kind(), "var_declaration" | "const_declaration" | "type_declaration") => {
                let specs = named_children(p).into_iter().filter(|c| c.kind().ends_with("_spec") || c.kind() == "type_alias").count();
                if specs == 1 { range_of(p) } else { range_of(node) }
            }
            _ => range_of(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        assert_eq!(GoSpec.builtin_module("len"), Some("builtin"));
        assert_eq!(GoSpec.builtin_module("fmt"), None);
    }
}
