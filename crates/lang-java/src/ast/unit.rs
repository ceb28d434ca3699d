use super::{Ast, AstId, AstKind, Role, walk};
use super::visit::Visitor;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub node: AstId,
    /// Dotted name without `.*`.
    pub name: String,
    pub is_static: bool,
    pub on_demand: bool,
}

impl Import {
    fn from_text(node: AstId, text: &str) -> Option<Self> {
        let body = text.trim().strip_prefix("import")?.trim().trim_end_matches(';').trim();
        let (is_static, body) = match body.strip_prefix("static") {
            Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest.trim()),
            _ => (false, body),
        };
        let name: String = body.chars().filter(|c| !c.is_whitespace()).collect();
        let (name, on_demand) = match name.strip_suffix(".*") {
            Some(prefix) => (prefix.to_string(), true),
            None => (name, false),
        };
        Some(Self {
            node,
            name,
            is_static,
            on_demand,
        })
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub path: PathBuf,
    pub ast: Ast,
    /// Declared package, `""` for the unnamed package.
    pub package: String,
    pub imports: Vec<Import>,
    pub has_errors: bool,
}

impl CompilationUnit {
    pub(crate) fn new(path: PathBuf, ast: Ast, has_errors: bool) -> Self {
        let root = ast.root();
        let package = ast
            .children_of_kind(root, AstKind::PackageDeclaration)
            .next()
            .and_then(|decl| {
                ast.children(decl).iter().copied().find(|c| {
                    matches!(ast.kind(*c), AstKind::QualifiedName | AstKind::Name)
                })
            })
            .map(|name| ast.text(name).chars().filter(|c| !c.is_whitespace()).collect())
            .unwrap_or_default();
        let imports = ast
            .children_of_kind(root, AstKind::ImportDeclaration)
            .filter_map(|decl| Import::from_text(decl, ast.text(decl)))
            .collect();
        Self {
            path,
            ast,
            package,
            imports,
            has_errors,
        }
    }

    /// Every type declaration in the file, nested and local ones included,
    /// outer before inner.
    pub fn type_declarations(&self) -> Vec<AstId> {
        struct Collect(Vec<AstId>);
        impl Visitor for Collect {
            fn visit(&mut self, ast: &Ast, id: AstId) -> bool {
                if ast.kind(id).is_type_declaration() {
                    self.0.push(id);
                }
                true
            }
        }
        let mut collect = Collect(Vec::new());
        walk(&self.ast, &mut collect);
        collect.0
    }

    /// The single-type, non-static import whose last segment is `simple`.
    pub fn explicit_import(&self, simple: &str) -> Option<&Import> {
        self.imports
            .iter()
            .find(|i| !i.is_static && !i.on_demand && i.simple_name() == simple)
    }

    pub fn star_imports(&self) -> impl Iterator<Item = &Import> + '_ {
        self.imports.iter().filter(|i| i.on_demand && !i.is_static)
    }

    /// Members (methods, constructors, fields, nested types) of a type
    /// declaration.
    pub fn members(&self, decl: AstId) -> Vec<AstId> {
        self.ast.children_with_role(decl, Role::Member).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::JavaParser;

    #[test]
    fn package_and_imports_are_read() {
        let unit = JavaParser::new()
            .parse(
                "A.java",
                "package com.acme.app;\nimport java.util.List;\nimport static java.lang.Math.max;\n\
                 import javax.ejb.*;\nclass A { class B {} }\n",
            )
            .expect("parse");
        assert_eq!(unit.package, "com.acme.app");
        assert_eq!(unit.imports.len(), 3);
        assert_eq!(unit.explicit_import("List").map(|i| i.name.as_str()), Some("java.util.List"));
        assert!(unit.explicit_import("max").is_none());
        let stars: Vec<_> = unit.star_imports().map(|i| i.name.as_str()).collect();
        assert_eq!(stars, vec!["javax.ejb"]);

        let types = unit.type_declarations();
        let names: Vec<_> = types
            .iter()
            .filter_map(|t| unit.ast.nested_type_name(*t))
            .collect();
        assert_eq!(names, vec!["A".to_string(), "A.B".to_string()]);
    }
}
