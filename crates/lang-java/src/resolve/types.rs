use crate::ast::{Ast, AstId, AstKind, CompilationUnit, Role};
use crate::error::Result;
use cmtscope_core::model::util::{find_classes_by_fqn, package_of, project_of, supertype_chain};
use cmtscope_core::model::PRIMITIVES;
use cmtscope_core::{ItemId, ItemKind, JavaItemIndex};
use tracing::trace;

/// A type written in source plus dimensions implied by its declaration
/// (`String... args` adds one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeUse {
    pub node: AstId,
    pub extra_dims: usize,
}

/// Declared type of a parameter, field, local variable or method return.
pub fn declared_type(ast: &Ast, decl: AstId) -> Option<TypeUse> {
    let role = if ast.kind(decl) == AstKind::MethodDeclaration {
        Role::ReturnType
    } else {
        Role::Type
    };
    let node = ast
        .children_with_role(decl, role)
        .find(|c| ast.kind(*c).is_type())?;
    let spread = ast.kind(decl) == AstKind::FormalParameter && is_spread(ast, decl, node);
    Some(TypeUse {
        node,
        extra_dims: usize::from(spread),
    })
}

fn is_spread(ast: &Ast, param: AstId, ty: AstId) -> bool {
    let from = ast.span(ty).end();
    let to = ast
        .child_with_role(param, Role::Declarator)
        .or_else(|| ast.child_with_role(param, Role::Name))
        .map_or(ast.span(param).end(), |n| ast.span(n).start);
    ast.source().get(from..to).is_some_and(|gap| gap.contains("..."))
}

/// Formal parameters of a method or constructor declaration, receiver
/// parameters excluded.
pub fn parameters(ast: &Ast, method: AstId) -> Vec<AstId> {
    ast.children_with_role(method, Role::Parameter)
        .filter(|p| ast.kind(*p) == AstKind::FormalParameter)
        .collect()
}

/// Raw type name and array dimensions of a type node; type arguments are
/// dropped.
fn type_name(ast: &Ast, node: AstId) -> Option<(String, usize)> {
    match ast.kind(node) {
        AstKind::SimpleType | AstKind::QualifiedType | AstKind::PrimitiveType => {
            let text: String = ast.text(node).split_whitespace().collect();
            Some((text, 0))
        }
        AstKind::ParameterizedType => {
            let raw = ast
                .children_with_role(node, Role::Type)
                .find(|c| ast.kind(*c).is_type())?;
            type_name(ast, raw)
        }
        AstKind::ArrayType => {
            let element = ast.child_with_role(node, Role::Type)?;
            let (name, dims) = type_name(ast, element)?;
            Some((name, dims + ast.array_dims(node)))
        }
        _ => None,
    }
}

/// Outcome of resolving a type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameLookup {
    Class(ItemId),
    /// A type parameter in scope; stands for the wildcard.
    TypeVariable,
    Unresolved,
}

/// Resolves type names as written in one compilation unit.
pub struct TypeResolver<'u> {
    unit: &'u CompilationUnit,
    project: Option<ItemId>,
}

impl<'u> TypeResolver<'u> {
    /// `project` is the project the unit belongs to; its classes win over
    /// same-named classes elsewhere.
    pub fn new(unit: &'u CompilationUnit, project: Option<ItemId>) -> Self {
        Self { unit, project }
    }

    pub fn unit(&self) -> &'u CompilationUnit {
        self.unit
    }

    pub fn project(&self) -> Option<ItemId> {
        self.project
    }

    /// First candidate from the unit's own project, else the first one.
    pub fn prefer_own(&self, index: &JavaItemIndex, candidates: &[ItemId]) -> Option<ItemId> {
        self.project
            .and_then(|own| {
                candidates
                    .iter()
                    .copied()
                    .find(|c| project_of(index, *c) == Some(own))
            })
            .or_else(|| candidates.first().copied())
    }

    /// Packages named like the unit's package, own project first.
    pub fn unit_packages(&self, index: &JavaItemIndex) -> Vec<ItemId> {
        let mut packages = index.find_by_name(ItemKind::Package, &self.unit.package);
        if let Some(own) = self.project {
            packages.sort_by_key(|p| project_of(index, *p) != Some(own));
        }
        packages
    }

    fn class_in_unit_package(&self, index: &JavaItemIndex, name: &str) -> Option<ItemId> {
        self.unit_packages(index)
            .into_iter()
            .find_map(|pkg| index.find_item(Some(pkg), name, ItemKind::Class))
    }

    /// Class item registered for a type declaration of this unit.
    pub fn class_of_decl(&self, index: &JavaItemIndex, decl: AstId) -> Option<ItemId> {
        let name = self.unit.ast.nested_type_name(decl)?;
        self.class_in_unit_package(index, &name)
    }

    /// Class of the innermost type declaration enclosing `at`.
    pub fn enclosing_class(&self, index: &JavaItemIndex, at: AstId) -> Option<ItemId> {
        let decl = self.unit.ast.enclosing_type_declaration(at)?;
        self.class_of_decl(index, decl)
    }

    fn is_type_variable(&self, at: AstId, name: &str) -> bool {
        let ast = &self.unit.ast;
        std::iter::once(at)
            .chain(ast.ancestors(at))
            .filter(|a| {
                let kind = ast.kind(*a);
                kind.is_type_declaration() || kind.is_method_declaration()
            })
            .any(|decl| ast.type_parameter_names(decl).any(|p| p == name))
    }

    /// Resolves a possibly qualified class name as seen from node `at`.
    pub fn resolve_name(&self, index: &JavaItemIndex, at: AstId, name: &str) -> NameLookup {
        if !name.contains('.') && self.is_type_variable(at, name) {
            return NameLookup::TypeVariable;
        }
        match self.lookup_class_name(index, at, name) {
            Some(id) => NameLookup::Class(id),
            None => {
                trace!(name, file = %self.unit.path.display(), "unresolved type name");
                NameLookup::Unresolved
            }
        }
    }

    /// Class lookup without type-variable handling, also used for static
    /// receivers such as `Math` in `Math.max(a, b)`.
    pub fn lookup_class_name(&self, index: &JavaItemIndex, at: AstId, name: &str) -> Option<ItemId> {
        if let Some(primitive) = index.find_primitive(name) {
            return Some(primitive);
        }
        if let Some((head, rest)) = name.split_once('.') {
            let by_fqn = find_classes_by_fqn(index, name);
            if let Some(id) = self.prefer_own(index, &by_fqn) {
                return Some(id);
            }
            let outer = self.lookup_simple(index, at, head)?;
            return member_class(index, outer, rest);
        }
        self.lookup_simple(index, at, name)
    }

    fn lookup_simple(&self, index: &JavaItemIndex, at: AstId, simple: &str) -> Option<ItemId> {
        let ast = &self.unit.ast;

        let enclosing = std::iter::once(at)
            .chain(ast.ancestors(at))
            .filter(|a| ast.kind(*a).is_type_declaration());
        for decl in enclosing {
            let Some(class) = self.class_of_decl(index, decl) else {
                continue;
            };
            if ast.name_of(decl) == Some(simple) {
                return Some(class);
            }
            if let Some(inner) = member_class(index, class, simple) {
                return Some(inner);
            }
            if let Some(inherited) = supertype_chain(index, class)
                .into_iter()
                .find_map(|sup| member_class(index, sup, simple))
            {
                return Some(inherited);
            }
        }

        if let Some(import) = self.unit.explicit_import(simple) {
            let found = find_classes_by_fqn(index, &import.name);
            if let Some(id) = self.prefer_own(index, &found) {
                return Some(id);
            }
        }

        if let Some(id) = self.class_in_unit_package(index, simple) {
            return Some(id);
        }

        for star in self.unit.star_imports() {
            let found = find_classes_by_fqn(index, &format!("{}.{simple}", star.name));
            if let Some(id) = self.prefer_own(index, &found) {
                return Some(id);
            }
        }

        let lang = find_classes_by_fqn(index, &format!("java.lang.{simple}"));
        self.prefer_own(index, &lang)
    }

    /// Looks a type up without touching the index. Type variables map to the
    /// wildcard when it exists.
    pub fn lookup_type(&self, index: &JavaItemIndex, ty: TypeUse) -> Option<ItemId> {
        let (name, dims) = type_name(&self.unit.ast, ty.node)?;
        let base = match self.resolve_name(index, ty.node, &name) {
            NameLookup::Class(id) => id,
            NameLookup::TypeVariable => index.find_wildcard()?,
            NameLookup::Unresolved => return None,
        };
        let dims = dims + ty.extra_dims;
        if dims == 0 {
            return Some(base);
        }
        let item = index.get(base)?;
        let array_name = format!("{}{}", item.name(), "[]".repeat(dims));
        index.find_item(item.parent(), &array_name, ItemKind::Class)
    }

    /// Resolves a type, creating array classes as needed. Anything that
    /// cannot be resolved becomes the wildcard.
    pub fn materialize_type(&self, index: &mut JavaItemIndex, ty: TypeUse) -> Result<ItemId> {
        let Some((name, dims)) = type_name(&self.unit.ast, ty.node) else {
            return Ok(index.wildcard());
        };
        let base = if PRIMITIVES.contains(&name.as_str()) {
            index.primitive(&name)?
        } else {
            match self.resolve_name(index, ty.node, &name) {
                NameLookup::Class(id) => id,
                NameLookup::TypeVariable | NameLookup::Unresolved => index.wildcard(),
            }
        };
        Ok(index.create_array_class(base, dims + ty.extra_dims)?)
    }
}

/// Nested class `rest` (dotted, relative) of `outer`.
fn member_class(index: &JavaItemIndex, outer: ItemId, rest: &str) -> Option<ItemId> {
    let item = index.get(outer)?;
    let package = package_of(index, outer)?;
    index.find_item(
        Some(package),
        &format!("{}.{rest}", item.name()),
        ItemKind::Class,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::JavaParser;

    fn workspace() -> (JavaItemIndex, ItemId) {
        let mut index = JavaItemIndex::new();
        let jdk = index.create_project("jdk");
        let lang = index.create_package(jdk, "java.lang").expect("package");
        index.create_class(lang, "String").expect("class");
        let util = index.create_package(jdk, "java.util").expect("package");
        index.create_class(util, "List").expect("class");
        index.create_class(util, "Map").expect("class");
        let map = index.find_item(Some(util), "Map", ItemKind::Class).expect("map");
        index.create_inner_class(map, "Entry").expect("inner");

        let app = index.create_project("app");
        let pkg = index.create_package(app, "com.acme").expect("package");
        let service = index.create_class(pkg, "Service").expect("class");
        index.create_inner_class(service, "Helper").expect("inner");
        index.create_class(pkg, "Peer").expect("class");
        (index, app)
    }

    fn field_types(unit: &CompilationUnit) -> Vec<TypeUse> {
        let ast = &unit.ast;
        ast.ids()
            .filter(|id| ast.kind(*id) == AstKind::FieldDeclaration)
            .filter_map(|field| declared_type(ast, field))
            .collect()
    }

    #[test]
    fn names_resolve_through_imports_package_and_nesting() {
        let (mut index, app) = workspace();
        let unit = JavaParser::new()
            .parse(
                "Service.java",
                "package com.acme;\nimport java.util.List;\nimport java.util.*;\n\
                 class Service<T> {\n  String a; List b; Peer c; Helper d; Map.Entry e; T f; Missing g; int[] h;\n  class Helper {}\n}\n",
            )
            .expect("parse");
        let resolver = TypeResolver::new(&unit, Some(app));
        let fields = field_types(&unit);
        let names: Vec<Option<String>> = fields
            .iter()
            .map(|ty| {
                resolver
                    .lookup_type(&index, *ty)
                    .and_then(|id| cmtscope_core::model::util::fqn(&index, id))
            })
            .collect();
        assert_eq!(
            names,
            vec![
                Some("java.lang.String".to_string()),
                Some("java.util.List".to_string()),
                Some("com.acme.Peer".to_string()),
                Some("com.acme.Service.Helper".to_string()),
                Some("java.util.Map.Entry".to_string()),
                None,
                None,
                None,
            ]
        );

        let id = resolver
            .materialize_type(&mut index, fields[7])
            .expect("materialize");
        assert_eq!(index.get(id).map(|i| i.name().to_string()), Some("int[]".to_string()));
        assert_eq!(
            resolver.materialize_type(&mut index, fields[5]).ok(),
            index.find_wildcard()
        );
    }

    #[test]
    fn spread_parameters_add_a_dimension() {
        let unit = JavaParser::new()
            .parse("A.java", "class A { void f(String s, String... rest) {} }")
            .expect("parse");
        let ast = &unit.ast;
        let method = ast
            .ids()
            .find(|id| ast.kind(*id) == AstKind::MethodDeclaration)
            .expect("method");
        let dims: Vec<usize> = parameters(ast, method)
            .into_iter()
            .filter_map(|p| declared_type(ast, p))
            .map(|t| t.extra_dims)
            .collect();
        assert_eq!(dims, vec![0, 1]);
    }
}
