//! Pass 1: per-file extraction of scopes, symbols, usages and imports
//!
//! One walk over the CST of a file produces a [`FileExtraction`] without
//! looking at any other file. Everything cross-file is left to resolution.

use std::collections::{HashMap, HashSet};

use grove_core::{
    ByteRange, FileExtraction, LocalScope, LocalSymbol, RawImport, RawUsage, ScopeIdx, ScopeKind, SymbolKind,
    UsageRole,
};
use tree_sitter::{Node, Tree};

use crate::languages::{BindMode, Construct, ImportSpec, LanguageSpec, named_children, range_of, text_of};

/// Walk `tree` and extract everything pass 1 knows about the file.
pub fn extract(spec: &dyn LanguageSpec, tree: &Tree, src: &str) -> FileExtraction {
    let mut walker = Walker {
        spec,
        src: src.as_bytes(),
        out: FileExtraction::empty(src.len()),
        scope: ScopeIdx::MODULE,
        enclosing: None,
        skip: HashSet::new(),
        declared: HashMap::new(),
    };
    walker.visit(tree.root_node());
    walker.out
}

struct Walker<'a> {
    spec: &'a dyn LanguageSpec,
    src: &'a [u8],
    out: FileExtraction,
    scope: ScopeIdx,
    /// Innermost symbol whose declaration is being walked.
    enclosing: Option<usize>,
    /// Nodes already handled as declaration names or bases.
    skip: HashSet<usize>,
    declared: HashMap<(ScopeIdx, String), usize>,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, node: Node<'_>) {
        if self.skip.contains(&node.id()) {
            return;
        }
        if let Some(name) = self.spec.default_export(node, self.src) {
            self.out.default_export = Some(name);
        }

        match self.spec.construct(node, self.src) {
            Construct::Skip => {}
            Construct::Import(specs) => self.import(node, specs),
            Construct::Function { name, params, kind } => {
                let owner = name.map(|n| self.declare_named(kind, node, n));
                self.with_scope(ScopeKind::Function, node, owner, |w| {
                    w.declare_params(params);
                    w.visit_children(node);
                });
            }
            Construct::Lambda { params } => {
                self.with_scope(ScopeKind::Lambda, node, None, |w| {
                    w.declare_params(params);
                    w.visit_children(node);
                });
            }
            Construct::Class { name, kind, bases } => {
                let owner = self.declare_named(kind, node, name);
                for base in bases {
                    self.visit_base(base, owner);
                }
                self.with_scope(ScopeKind::Class, node, Some(owner), |w| w.visit_children(node));
            }
            Construct::TypeDecl { name, kind } => {
                let owner = self.declare_named(kind, node, name);
                let saved = self.enclosing.replace(owner);
                self.visit_children(node);
                self.enclosing = saved;
            }
            Construct::Namespace { name, kind } => {
                let owner = self.declare_named(kind, node, name);
                self.with_scope(ScopeKind::Namespace, node, Some(owner), |w| w.visit_children(node));
            }
            Construct::ImplBlock { outer } => {
                for n in outer {
                    self.visit(n);
                    self.skip.insert(n.id());
                }
                self.with_scope(ScopeKind::Class, node, None, |w| w.visit_children(node));
            }
            Construct::Binding {
                targets,
                mode,
                kind,
                whole,
            } => {
                let whole = whole && targets.len() == 1;
                let mut owner = None;
                for target in targets {
                    self.skip.insert(target.id());
                    let name = text_of(target, self.src);
                    if name.is_empty() {
                        continue;
                    }
                    let rebinding = self.declared.contains_key(&(self.scope, name.clone()));
                    let declares = match mode {
                        BindMode::Declare => true,
                        BindMode::DeclareOrWrite => !rebinding,
                        BindMode::Write => false,
                    };
                    if declares {
                        let range = if whole { range_of(node) } else { range_of(target) };
                        let idx = self.declare(kind, name, range, range_of(target));
                        if whole {
                            owner = Some(idx);
                        }
                    } else {
                        self.usage(target, name, UsageRole::Write, self.enclosing);
                    }
                }
                match owner {
                    Some(idx) => {
                        let saved = self.enclosing.replace(idx);
                        self.visit_children(node);
                        self.enclosing = saved;
                    }
                    None => self.visit_children(node),
                }
            }
            Construct::Other => {
                if self.spec.is_reference(node, self.src) {
                    let role = if self.spec.is_callee(node) {
                        UsageRole::Call
                    } else {
                        UsageRole::Read
                    };
                    let name = text_of(node, self.src);
                    self.usage(node, name, role, self.enclosing);
                } else {
                    self.visit_children(node);
                }
            }
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        for child in named_children(node) {
            self.visit(child);
        }
    }

    /// Base classes resolve in the scope around the class; a plain name
    /// becomes an inheritance reference owned by the class.
    fn visit_base(&mut self, base: Node<'_>, class: usize) {
        self.skip.insert(base.id());
        if self.spec.is_reference(base, self.src) {
            let name = text_of(base, self.src);
            self.usage(base, name, UsageRole::Inherits, Some(class));
        } else {
            self.visit(base);
        }
    }

    fn with_scope(&mut self, kind: ScopeKind, node: Node<'_>, owner: Option<usize>, f: impl FnOnce(&mut Self)) {
        let idx = ScopeIdx(self.out.scopes.len() as u32);
        self.out.scopes.push(LocalScope {
            kind,
            range: range_of(node),
            parent: Some(self.scope),
            owner,
        });
        let saved = (self.scope, self.enclosing);
        self.scope = idx;
        if owner.is_some() {
            self.enclosing = owner;
        }
        f(self);
        (self.scope, self.enclosing) = saved;
    }

    fn declare_params(&mut self, params: Vec<Node<'_>>) {
        for param in params {
            self.skip.insert(param.id());
            let name = text_of(param, self.src);
            if !name.is_empty() {
                self.declare(SymbolKind::Parameter, name, range_of(param), range_of(param));
            }
        }
    }

    fn declare_named(&mut self, kind: SymbolKind, node: Node<'_>, name: Node<'_>) -> usize {
        self.skip.insert(name.id());
        let text = text_of(name, self.src);
        self.declare(kind, text, range_of(node), range_of(name))
    }

    fn declare(&mut self, kind: SymbolKind, name: String, range: ByteRange, name_range: ByteRange) -> usize {
        let in_class = self
            .out
            .scopes
            .get(self.scope.index())
            .is_some_and(|s| s.kind == ScopeKind::Class);
        let kind = if kind == SymbolKind::Function && in_class {
            SymbolKind::Method
        } else {
            kind
        };
        let idx = self.out.symbols.len();
        self.declared.entry((self.scope, name.clone())).or_insert(idx);
        self.out.symbols.push(LocalSymbol {
            kind,
            name,
            range,
            name_range,
            scope: self.scope,
            parent: self.enclosing,
        });
        idx
    }

    fn usage(&mut self, node: Node<'_>, name: String, role: UsageRole, enclosing: Option<usize>) {
        self.out.usages.push(RawUsage {
            name,
            range: range_of(node),
            scope: self.scope,
            role,
            enclosing,
        });
    }

    fn import(&mut self, node: Node<'_>, specs: Vec<ImportSpec>) {
        for spec in specs {
            let alias = spec
                .binding
                .map(|b| self.declare(SymbolKind::Import, b.name, b.range, b.name_range));
            self.out.imports.push(RawImport {
                range: range_of(node),
                module: spec.module,
                imported: spec.imported,
                name_range: spec.name_range,
                alias,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::spec_for;
    use grove_core::{ImportedName, Language};

    fn run(language: Language, src: &str) -> FileExtraction {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&crate::parser_pool::grammar(language).unwrap()).unwrap();
        let tree = parser.parse(src, None).unwrap();
        extract(spec_for(language).unwrap(), &tree, src)
    }

    fn names(ex: &FileExtraction) -> Vec<(SymbolKind, &str)> {
        ex.symbols.iter().map(|s| (s.kind, s.name.as_str())).collect()
    }

    #[test]
    fn test_python_symbols_and_usages() {
        let ex = run(Language::Python, "def add(a, b):\n    return a + b\n\nx = add(1, 2)\n");
        assert_eq!(
            names(&ex),
            vec![
                (SymbolKind::Function, "add"),
                (SymbolKind::Parameter, "a"),
                (SymbolKind::Parameter, "b"),
                (SymbolKind::Variable, "x"),
            ]
        );
        let add = &ex.symbols[0];
        assert_eq!(add.range, ByteRange::new(0, 31));
        assert_eq!(add.name_range, ByteRange::new(4, 7));

        let call = ex.usages.iter().find(|u| u.name == "add").unwrap();
        assert_eq!(call.role, UsageRole::Call);
        assert_eq!(call.scope, ScopeIdx::MODULE);
        // `x = add(...)`: the call sits inside the binding of x
        assert_eq!(call.enclosing, Some(3));
        let reads: Vec<_> = ex.usages.iter().filter(|u| u.role == UsageRole::Read).map(|u| u.name.as_str()).collect();
        assert_eq!(reads, vec!["a", "b"]);
    }

    #[test]
    fn test_python_methods_and_bases() {
        let src = "class Base:\n    pass\n\nclass Child(Base):\n    def run(self):\n        return self\n";
        let ex = run(Language::Python, src);
        assert_eq!(
            names(&ex),
            vec![
                (SymbolKind::Class, "Base"),
                (SymbolKind::Class, "Child"),
                (SymbolKind::Method, "run"),
                (SymbolKind::Parameter, "self"),
            ]
        );
        let base = ex.usages.iter().find(|u| u.name == "Base").unwrap();
        assert_eq!(base.role, UsageRole::Inherits);
        assert_eq!(base.enclosing, Some(1));
        assert_eq!(base.scope, ScopeIdx::MODULE);
        assert_eq!(ex.symbols[2].parent, Some(1));
    }

    #[test]
    fn test_python_rebinding_is_a_write() {
        let ex = run(Language::Python, "x = 1\nx = 2\n");
        assert_eq!(names(&ex), vec![(SymbolKind::Variable, "x")]);
        assert_eq!(ex.usages.len(), 1);
        assert_eq!(ex.usages[0].role, UsageRole::Write);
        assert_eq!(ex.usages[0].range, ByteRange::new(6, 7));
    }

    #[test]
    fn test_python_imports() {
        let ex = run(
            Language::Python,
            "import os.path\nfrom .util import add as plus, sub\nfrom m import *\n",
        );
        let imports: Vec<_> = ex.imports.iter().map(|i| (i.module.as_str(), i.imported.clone())).collect();
        assert_eq!(
            imports,
            vec![
                ("os.path", ImportedName::Module),
                (".util", ImportedName::Name("add".into())),
                (".util", ImportedName::Name("sub".into())),
                ("m", ImportedName::Glob),
            ]
        );
        assert_eq!(
            names(&ex),
            vec![(SymbolKind::Import, "os"), (SymbolKind::Import, "plus"), (SymbolKind::Import, "sub")]
        );
        // nothing inside an import statement is a usage
        assert!(ex.usages.is_empty());
    }

    #[test]
    fn test_lambda_and_comprehension_scopes() {
        let ex = run(Language::Python, "f = lambda y: y\nzs = [z for z in range(3)]\n");
        let kinds: Vec<_> = ex.scopes.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![ScopeKind::Module, ScopeKind::Lambda, ScopeKind::Lambda]);
        let z = ex.symbols.iter().find(|s| s.name == "z").unwrap();
        assert_eq!(z.scope, ScopeIdx(2));
    }

    #[test]
    fn test_typescript_declarations() {
        let src = "import { add } from './util';\nexport interface Shape { area(): number }\nexport class Sq implements Shape {\n  area(): number { return add(1, 2); }\n}\nconst k = 3;\n";
        let ex = run(Language::TypeScript, src);
        assert_eq!(
            names(&ex),
            vec![
                (SymbolKind::Import, "add"),
                (SymbolKind::Interface, "Shape"),
                (SymbolKind::Method, "area"),
                (SymbolKind::Class, "Sq"),
                (SymbolKind::Method, "area"),
                (SymbolKind::Constant, "k"),
            ]
        );
        let shape = ex.usages.iter().find(|u| u.name == "Shape").unwrap();
        assert_eq!(shape.role, UsageRole::Inherits);
        let add = ex.usages.iter().find(|u| u.name == "add").unwrap();
        assert_eq!(add.role, UsageRole::Call);
    }

    #[test]
    fn test_javascript_default_export_and_reexport() {
        let src = "export { helper as aid } from './h';\nexport * from './all';\nfunction main() {}\nexport default main;\n";
        let ex = run(Language::JavaScript, src);
        assert_eq!(ex.default_export.as_deref(), Some("main"));
        assert_eq!(ex.imports.len(), 2);
        assert_eq!(ex.imports[0].imported, ImportedName::Name("helper".into()));
        assert_eq!(ex.imports[1].imported, ImportedName::Glob);
        assert_eq!(ex.symbols[0].name, "aid");
    }

    #[test]
    fn test_rust_items() {
        let src = "use crate::graph::{Graph, Node as N};\nmod util;\n\nstruct Point { x: i32 }\n\nimpl Point {\n    fn new(x: i32) -> Self { Point { x } }\n}\n";
        let ex = run(Language::Rust, src);
        assert_eq!(
            names(&ex),
            vec![
                (SymbolKind::Import, "Graph"),
                (SymbolKind::Import, "N"),
                (SymbolKind::Import, "util"),
                (SymbolKind::Struct, "Point"),
                (SymbolKind::Method, "new"),
                (SymbolKind::Parameter, "x"),
            ]
        );
        assert_eq!(ex.imports[0].module, "crate::graph");
        assert_eq!(ex.imports[1].imported, ImportedName::Name("Node".into()));
        assert_eq!(ex.imports[2].module, "self::util");
        // methods of an impl block are top-level symbols
        assert_eq!(ex.symbols[4].parent, None);
    }

    #[test]
    fn test_go_declarations() {
        let src = "package main\n\nimport (\n\t\"fmt\"\n\tstr \"strings\"\n)\n\ntype Server struct{}\n\nfunc (s *Server) Run() {\n\tx := 1\n\tx = 2\n\tfmt.Println(str.ToUpper(\"a\"), x)\n}\n";
        let ex = run(Language::Go, src);
        assert_eq!(
            names(&ex),
            vec![
                (SymbolKind::Import, "fmt"),
                (SymbolKind::Import, "str"),
                (SymbolKind::Struct, "Server"),
                (SymbolKind::Method, "Run"),
                (SymbolKind::Parameter, "s"),
                (SymbolKind::Variable, "x"),
            ]
        );
        let writes = ex.usages.iter().filter(|u| u.role == UsageRole::Write).count();
        assert_eq!(writes, 1);
        assert!(ex.usages.iter().any(|u| u.name == "Server" && u.role == UsageRole::Read));
    }
}
