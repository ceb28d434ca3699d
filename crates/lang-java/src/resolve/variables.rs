use super::calls::resolve_call;
use super::scope::Scope;
use super::types::{TypeResolver, declared_type};
use super::CONSTRUCTOR;
use crate::ast::{Ast, AstId, AstKind, LiteralKind, Role, Visitor};
use cmtscope_core::model::util::{find_classes_by_fqn, find_field_in_hierarchy};
use cmtscope_core::{ItemId, JavaItemIndex};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Method,
    /// `new T(...)`, `this(...)` or `super(...)`.
    Constructor,
}

/// A call found in source with the classes that may declare its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub node: AstId,
    pub kind: CallKind,
    pub name: String,
    /// Candidate declaring classes in lookup order. For an unqualified call
    /// these are the enclosing classes innermost first, then the classes of
    /// matching static imports.
    pub owners: Vec<ItemId>,
    pub arg_count: usize,
    /// Innermost method or constructor declaration containing the call.
    pub enclosing: Option<AstId>,
}

/// Walks a compilation unit keeping local variable bindings in a [`Scope`]
/// and records every call site with its candidate owners.
///
/// The index is only read; linking the calls is left to the caller.
pub struct VariableVisitor<'a, 'u> {
    index: &'a JavaItemIndex,
    types: &'a TypeResolver<'u>,
    scope: Scope,
    classes: Vec<Option<ItemId>>,
    calls: Vec<CallSite>,
    expr_types: HashMap<AstId, Option<ItemId>>,
}

impl<'a, 'u> VariableVisitor<'a, 'u> {
    pub fn new(index: &'a JavaItemIndex, types: &'a TypeResolver<'u>) -> Self {
        Self {
            index,
            types,
            scope: Scope::new(),
            classes: Vec::new(),
            calls: Vec::new(),
            expr_types: HashMap::new(),
        }
    }

    pub fn calls(&self) -> &[CallSite] {
        &self.calls
    }

    pub fn into_calls(self) -> Vec<CallSite> {
        self.calls
    }

    fn current_class(&self) -> Option<ItemId> {
        self.classes.last().copied().flatten()
    }

    fn superclass_of_current(&self) -> Option<ItemId> {
        self.current_class()
            .and_then(|c| self.index.get(c))
            .and_then(|c| c.superclass())
    }

    fn bind_declared(&mut self, ast: &Ast, decl: AstId, name: Option<&str>) {
        let Some(name) = name else {
            return;
        };
        let ty = declared_type(ast, decl).and_then(|t| self.types.lookup_type(self.index, t));
        self.scope.bind(name, ty);
    }

    fn bind_locals(&mut self, ast: &Ast, decl: AstId) {
        let declared = declared_type(ast, decl);
        let inferred = declared.is_some_and(|t| ast.text(t.node) == "var");
        let declarators: Vec<AstId> = ast.children_with_role(decl, Role::Declarator).collect();
        for declarator in declarators {
            let Some(name) = ast.name_of(declarator) else {
                continue;
            };
            let ty = if inferred {
                ast.child_with_role(declarator, Role::Value)
                    .and_then(|value| self.expr_type(ast, value))
            } else {
                declared.and_then(|t| self.types.lookup_type(self.index, t))
            };
            self.scope.bind(name, ty);
        }
    }

    /// Static type of an expression, `None` when unknown.
    pub fn expr_type(&mut self, ast: &Ast, expr: AstId) -> Option<ItemId> {
        if let Some(cached) = self.expr_types.get(&expr) {
            return *cached;
        }
        let ty = self.compute_type(ast, expr);
        self.expr_types.insert(expr, ty);
        ty
    }

    fn compute_type(&mut self, ast: &Ast, expr: AstId) -> Option<ItemId> {
        match ast.kind(expr) {
            AstKind::Name => self.name_type(expr, ast.text(expr)),
            AstKind::QualifiedName => self.types.lookup_class_name(self.index, expr, ast.text(expr)),
            AstKind::This => self.current_class(),
            AstKind::Super => self.superclass_of_current(),
            AstKind::FieldAccess => {
                let field = ast.child_with_role(expr, Role::Name)?;
                let receiver = ast.child_with_role(expr, Role::Receiver)?;
                if ast.kind(field) == AstKind::This {
                    return self.types.lookup_class_name(self.index, expr, ast.text(receiver));
                }
                match self.expr_type(ast, receiver) {
                    Some(owner) => find_field_in_hierarchy(self.index, owner, ast.text(field))
                        .and_then(|f| self.index.get(f))
                        .and_then(|f| f.field_type()),
                    None => {
                        let text: String = ast.text(expr).split_whitespace().collect();
                        self.types.lookup_class_name(self.index, expr, &text)
                    }
                }
            }
            AstKind::MethodInvocation => {
                let site = self.call_site(ast, expr)?;
                resolve_call(self.index, &site)
                    .and_then(|m| self.index.get(m))
                    .and_then(|m| m.return_type())
            }
            AstKind::ObjectCreation | AstKind::Cast => {
                let ty = declared_type(ast, expr)?;
                self.types.lookup_type(self.index, ty)
            }
            AstKind::Parenthesized => {
                let inner = ast.children(expr).first().copied()?;
                self.expr_type(ast, inner)
            }
            AstKind::Literal(kind) => self.literal_type(kind),
            _ => None,
        }
    }

    fn literal_type(&self, kind: LiteralKind) -> Option<ItemId> {
        let primitive = match kind {
            LiteralKind::Int => "int",
            LiteralKind::Long => "long",
            LiteralKind::Float => "float",
            LiteralKind::Double => "double",
            LiteralKind::Char => "char",
            LiteralKind::Boolean => "boolean",
            LiteralKind::String => {
                return find_classes_by_fqn(self.index, "java.lang.String").first().copied();
            }
            LiteralKind::Null => return None,
        };
        self.index.find_primitive(primitive)
    }

    /// Local variable, then field of an enclosing class, then a class used
    /// as a static receiver.
    fn name_type(&self, at: AstId, name: &str) -> Option<ItemId> {
        if let Some(binding) = self.scope.lookup(name) {
            return binding.ty;
        }
        let field = self
            .classes
            .iter()
            .rev()
            .flatten()
            .find_map(|class| find_field_in_hierarchy(self.index, *class, name));
        if let Some(field) = field {
            return self.index.get(field).and_then(|f| f.field_type());
        }
        self.types.lookup_class_name(self.index, at, name)
    }

    fn static_import_owners(&self, name: &str) -> Vec<ItemId> {
        let mut owners = Vec::new();
        for import in self.types.unit().imports.iter().filter(|i| i.is_static) {
            let class_name = if import.on_demand {
                import.name.as_str()
            } else if import.simple_name() == name {
                match import.name.rsplit_once('.') {
                    Some((class, _)) => class,
                    None => continue,
                }
            } else {
                continue;
            };
            for class in find_classes_by_fqn(self.index, class_name) {
                if !owners.contains(&class) {
                    owners.push(class);
                }
            }
        }
        owners
    }

    fn call_site(&mut self, ast: &Ast, call: AstId) -> Option<CallSite> {
        let (kind, name, owners) = match ast.kind(call) {
            AstKind::MethodInvocation => {
                let name = ast.name_of(call)?.to_string();
                let owners = match ast.child_with_role(call, Role::Receiver) {
                    Some(receiver) => self.expr_type(ast, receiver).into_iter().collect(),
                    None => {
                        let mut owners: Vec<ItemId> =
                            self.classes.iter().rev().flatten().copied().collect();
                        for owner in self.static_import_owners(&name) {
                            if !owners.contains(&owner) {
                                owners.push(owner);
                            }
                        }
                        owners
                    }
                };
                (CallKind::Method, name, owners)
            }
            AstKind::ObjectCreation => {
                let owner = declared_type(ast, call).and_then(|t| self.types.lookup_type(self.index, t));
                (CallKind::Constructor, CONSTRUCTOR.to_string(), owner.into_iter().collect())
            }
            AstKind::ConstructorInvocation => {
                let owner = if ast.children_of_kind(call, AstKind::Super).next().is_some() {
                    self.superclass_of_current()
                } else {
                    self.current_class()
                };
                (CallKind::Constructor, CONSTRUCTOR.to_string(), owner.into_iter().collect())
            }
            _ => return None,
        };
        Some(CallSite {
            node: call,
            kind,
            name,
            owners,
            arg_count: ast.arguments(call).len(),
            enclosing: ast.enclosing_method(call),
        })
    }
}

impl Visitor for VariableVisitor<'_, '_> {
    fn visit(&mut self, ast: &Ast, id: AstId) -> bool {
        let kind = ast.kind(id);
        if kind.is_type_declaration() {
            self.classes.push(self.types.class_of_decl(self.index, id));
            self.scope.push();
        } else if kind.opens_scope() {
            self.scope.push();
        }

        match kind {
            AstKind::FormalParameter => self.bind_declared(ast, id, ast.name_of(id)),
            AstKind::Name
                if ast.node(id).role == Role::Parameter
                    && ast.parent(id).is_some_and(|p| ast.kind(p) == AstKind::Lambda) =>
            {
                self.scope.bind(ast.text(id), None);
            }
            AstKind::LocalVariableDeclaration => self.bind_locals(ast, id),
            AstKind::EnhancedFor => self.bind_declared(ast, id, ast.name_of(id)),
            AstKind::MethodInvocation | AstKind::ObjectCreation | AstKind::ConstructorInvocation => {
                if let Some(site) = self.call_site(ast, id) {
                    self.calls.push(site);
                }
            }
            _ => {}
        }
        true
    }

    fn end_visit(&mut self, ast: &Ast, id: AstId) {
        let kind = ast.kind(id);
        if kind.is_type_declaration() {
            self.classes.pop();
            self.scope.pop();
        } else if kind.opens_scope() {
            self.scope.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{JavaParser, walk};

    #[test]
    fn receivers_are_typed_from_locals_fields_and_static_classes() {
        let mut index = JavaItemIndex::new();
        let p = index.create_project("app");
        let pkg = index.create_package(p, "a").expect("package");
        let repo = index.create_class(pkg, "Repo").expect("class");
        let util = index.create_class(pkg, "Util").expect("class");
        let main = index.create_class(pkg, "Main").expect("class");
        let field = index.create_field(main, "repo").expect("field");
        if let Some(f) = index.get_mut(field) {
            f.set_field_type(repo);
        }

        let unit = JavaParser::new()
            .parse(
                "Main.java",
                "package a;\nclass Main {\n  Repo repo;\n  void run(Util u) {\n    \
                 repo.load(1);\n    u.help();\n    Util.stat(1, 2);\n    { Repo u = null; u.save(); }\n    \
                 u.help();\n    local();\n    new Repo();\n  }\n}\n",
            )
            .expect("parse");
        let types = TypeResolver::new(&unit, Some(p));
        let mut visitor = VariableVisitor::new(&index, &types);
        walk(&unit.ast, &mut visitor);

        let seen: Vec<(String, Vec<ItemId>, usize)> = visitor
            .calls()
            .iter()
            .map(|c| (c.name.clone(), c.owners.clone(), c.arg_count))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("load".to_string(), vec![repo], 1),
                ("help".to_string(), vec![util], 0),
                ("stat".to_string(), vec![util], 2),
                ("save".to_string(), vec![repo], 0),
                ("help".to_string(), vec![util], 0),
                ("local".to_string(), vec![main], 0),
                (CONSTRUCTOR.to_string(), vec![repo], 0),
            ]
        );
        let run = visitor.calls()[0].enclosing.expect("inside run");
        assert_eq!(unit.ast.name_of(run), Some("run"));
    }
}
