use super::context::{LoadKey, LoadShared, LoadingContext};
use super::priority;
use crate::ast::{AstId, AstKind, Role, walk};
use crate::resolve::{
    CONSTRUCTOR, CallKind, CallTarget, TypeResolver, TypeUse, VariableVisitor, declared_type, parameters,
    resolve_call, resolve_or_create,
};
use cmtscope_core::model::util::find_classes_by_fqn;
use cmtscope_core::{AttrKey, ItemId, ItemKind};
use cmtscope_ingest::{BoxError, ChainTask, Spawner, Task};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read, parse and register the package of one source file. The chain stops
/// quietly when a file cannot be read or does not parse cleanly.
pub(crate) fn source_chain() -> ChainTask<LoadingContext> {
    ChainTask::new("load source file")
        .then(ReadSourceTask)
        .then(ParseUnitTask)
        .then(RegisterPackageTask)
}

pub struct ReadSourceTask;

impl Task<LoadingContext> for ReadSourceTask {
    fn name(&self) -> String {
        "read source".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Source]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::SourceText]
    }

    fn run(&mut self, ctx: &mut LoadingContext, _spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        ctx.shared.count(|s| s.source_files += 1);
        if ctx.text.is_some() {
            return Ok(());
        }
        let Some(source) = ctx.source.as_ref() else {
            return Ok(());
        };
        match std::fs::read_to_string(&source.path) {
            Ok(text) => ctx.text = Some(text),
            Err(err) => {
                warn!(path = %source.path.display(), "skipping unreadable source file: {err}");
                ctx.shared.count(|s| s.skipped_files += 1);
            }
        }
        Ok(())
    }
}

pub struct ParseUnitTask;

impl Task<LoadingContext> for ParseUnitTask {
    fn name(&self) -> String {
        "parse source".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Source, LoadKey::SourceText]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Unit]
    }

    fn run(&mut self, ctx: &mut LoadingContext, _spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let (Some(source), Some(text)) = (ctx.source.as_ref(), ctx.text.take()) else {
            return Ok(());
        };
        let unit = match ctx.shared.parser.parse(source.path.clone(), &text) {
            Ok(unit) => unit,
            Err(err) => {
                warn!(path = %source.path.display(), "skipping source file: {err}");
                ctx.shared.count(|s| s.skipped_files += 1);
                return Ok(());
            }
        };
        if unit.has_errors {
            warn!(path = %source.path.display(), "skipping source file with syntax errors");
            ctx.shared.count(|s| s.skipped_files += 1);
            return Ok(());
        }
        ctx.unit = Some(Arc::new(unit));
        Ok(())
    }
}

/// Registers the package of a parsed unit and schedules the per-file
/// phases in the same group.
pub struct RegisterPackageTask;

impl Task<LoadingContext> for RegisterPackageTask {
    fn name(&self) -> String {
        "register package".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Project, LoadKey::Unit]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Package]
    }

    fn run(&mut self, ctx: &mut LoadingContext, spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let (Some(project), Some(unit)) = (ctx.project, ctx.unit.clone()) else {
            return Ok(());
        };
        if let Some(hint) = ctx.source.as_ref().and_then(|s| s.package_hint.as_deref()) {
            if hint != unit.package {
                debug!(
                    path = %unit.path.display(),
                    declared = %unit.package,
                    directory = %hint,
                    "package does not match directory"
                );
            }
        }
        let (package, created) = {
            let mut index = ctx.shared.write()?;
            let existed = index.find_item(Some(project), &unit.package, ItemKind::Package).is_some();
            (index.create_package(project, &unit.package)?, !existed)
        };
        if created {
            ctx.shared.count(|s| s.packages += 1);
        }
        ctx.package = Some(package);

        spawner.spawn_here(priority::CLASS, ClassTask);
        spawner.spawn_here(priority::CLASS_DEPENDENCIES, ClassDepsTask);
        spawner.spawn_here(priority::METHODS, MethodsTask);
        spawner.spawn_here(priority::PSEUDO_METHODS, PseudoMethodsTask);
        spawner.spawn_here(priority::METHOD_DEPENDENCIES, MethodDepsTask);
        Ok(())
    }
}

/// Creates a class item for every type declaration of the unit, nested and
/// local ones as inner classes of their enclosing type.
pub struct ClassTask;

impl Task<LoadingContext> for ClassTask {
    fn name(&self) -> String {
        "load classes".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Package, LoadKey::Unit]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Classes]
    }

    fn run(&mut self, ctx: &mut LoadingContext, _spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let (Some(package), Some(unit)) = (ctx.package, ctx.unit.clone()) else {
            return Ok(());
        };
        let ast = &unit.ast;
        let mut by_decl: HashMap<AstId, ItemId> = HashMap::new();
        let mut classes = Vec::new();
        {
            let mut index = ctx.shared.write()?;
            for decl in unit.type_declarations() {
                let Some(simple) = ast.name_of(decl) else {
                    continue;
                };
                let class = match ast.enclosing_type_declaration(decl) {
                    Some(outer) => match by_decl.get(&outer) {
                        Some(outer) => index.create_inner_class(*outer, simple)?,
                        None => continue,
                    },
                    None => index.create_class(package, simple)?,
                };
                if ast.has_modifier(decl, "public") {
                    if let Some(item) = index.get_mut(class) {
                        item.set_flag(AttrKey::ProjectVisible, true);
                    }
                }
                by_decl.insert(decl, class);
                classes.push((Some(decl), class));
            }
        }
        ctx.shared.count(|s| s.classes += classes.len());
        ctx.classes = Some(classes);
        Ok(())
    }
}

#[derive(Default)]
struct ClassLinks {
    superclass: Option<ItemId>,
    interfaces: Vec<ItemId>,
    imports: Vec<ItemId>,
    unresolved: usize,
}

/// Resolves superclasses and interfaces, and links top-level classes to the
/// classes they import by name.
pub struct ClassDepsTask;

impl Task<LoadingContext> for ClassDepsTask {
    fn name(&self) -> String {
        "load class dependencies".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Classes]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::ClassDependencies]
    }

    fn run(&mut self, ctx: &mut LoadingContext, _spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let (Some(unit), Some(classes)) = (ctx.unit.clone(), ctx.classes.clone()) else {
            return Ok(());
        };
        let ast = &unit.ast;
        let links: Vec<(ItemId, ClassLinks)> = {
            let index = ctx.shared.read()?;
            let types = TypeResolver::new(&unit, ctx.project);
            let imported: Vec<ItemId> = unit
                .imports
                .iter()
                .filter(|i| !i.is_static && !i.on_demand)
                .filter_map(|i| LoadShared::prefer_project(&index, ctx.project, &find_classes_by_fqn(&index, &i.name)))
                .collect();
            classes
                .iter()
                .filter_map(|(decl, class)| decl.map(|d| (d, *class)))
                .map(|(decl, class)| {
                    let mut links = ClassLinks::default();
                    let resolve = |node: AstId| types.lookup_type(&index, TypeUse { node, extra_dims: 0 });
                    for sup in ast.children_with_role(decl, Role::Superclass).filter(|n| ast.kind(*n).is_type()) {
                        match resolve(sup) {
                            Some(id) => links.superclass = Some(id),
                            None => links.unresolved += 1,
                        }
                    }
                    for iface in ast.children_with_role(decl, Role::Interface).filter(|n| ast.kind(*n).is_type()) {
                        match resolve(iface) {
                            Some(id) => links.interfaces.push(id),
                            None => links.unresolved += 1,
                        }
                    }
                    if ast.enclosing_type_declaration(decl).is_none() {
                        links.imports = imported.clone();
                    }
                    (class, links)
                })
                .collect()
        };

        let unresolved: usize = links.iter().map(|(_, l)| l.unresolved).sum();
        {
            let mut index = ctx.shared.write()?;
            for (class, links) in links {
                if let Some(item) = index.get_mut(class) {
                    if let Some(sup) = links.superclass {
                        item.set_superclass(sup);
                    }
                    for iface in &links.interfaces {
                        item.add_superinterface(*iface);
                    }
                }
                for target in links.superclass.iter().chain(&links.interfaces).chain(&links.imports) {
                    index.add_dependency(class, *target);
                }
            }
        }
        if unresolved > 0 {
            debug!(path = %unit.path.display(), unresolved, "unresolved supertypes");
            ctx.shared.count(|s| s.unresolved_supertypes += unresolved);
        }
        ctx.class_dependencies = true;
        Ok(())
    }
}

/// Creates methods, constructors and fields declared in the unit's types.
pub struct MethodsTask;

impl Task<LoadingContext> for MethodsTask {
    fn name(&self) -> String {
        "load methods".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::ClassDependencies]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Methods]
    }

    fn run(&mut self, ctx: &mut LoadingContext, _spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let (Some(unit), Some(classes)) = (ctx.unit.clone(), ctx.classes.clone()) else {
            return Ok(());
        };
        let ast = &unit.ast;
        let types = TypeResolver::new(&unit, ctx.project);
        let mut methods = Vec::new();
        let mut fields = 0;
        {
            let mut index = ctx.shared.write()?;
            for (decl, class) in classes.iter().filter_map(|(d, c)| d.map(|d| (d, *c))) {
                if ast.kind(decl) == AstKind::RecordDeclaration {
                    for component in parameters(ast, decl) {
                        let (Some(name), Some(ty)) = (ast.name_of(component), declared_type(ast, component)) else {
                            continue;
                        };
                        let ty = types.materialize_type(&mut index, ty)?;
                        let field = index.create_field(class, name)?;
                        if let Some(item) = index.get_mut(field) {
                            item.set_field_type(ty);
                        }
                        fields += 1;
                    }
                }

                for member in unit.members(decl) {
                    match ast.kind(member) {
                        AstKind::MethodDeclaration | AstKind::ConstructorDeclaration => {
                            let name = if ast.kind(member) == AstKind::ConstructorDeclaration {
                                CONSTRUCTOR
                            } else {
                                match ast.name_of(member) {
                                    Some(name) => name,
                                    None => continue,
                                }
                            };
                            let mut params = Vec::new();
                            for param in parameters(ast, member) {
                                params.push(match declared_type(ast, param) {
                                    Some(ty) => types.materialize_type(&mut index, ty)?,
                                    None => index.wildcard(),
                                });
                            }
                            let return_type = match declared_type(ast, member) {
                                Some(ty) if ast.kind(member) == AstKind::MethodDeclaration => {
                                    Some(types.materialize_type(&mut index, ty)?)
                                }
                                _ => None,
                            };
                            let mut thrown = Vec::new();
                            for node in ast.children_with_role(member, Role::Throws).filter(|n| ast.kind(*n).is_type()) {
                                thrown.push(types.materialize_type(&mut index, TypeUse { node, extra_dims: 0 })?);
                            }

                            let method = index.create_method(class, name, Some(params))?;
                            if let Some(item) = index.get_mut(method) {
                                if let Some(ret) = return_type {
                                    item.set_return_type(ret);
                                }
                                for ty in thrown {
                                    item.add_thrown_type(ty);
                                }
                            }
                            methods.push((member, method));
                        }
                        AstKind::FieldDeclaration => {
                            let ty = match declared_type(ast, member) {
                                Some(ty) => types.materialize_type(&mut index, ty)?,
                                None => index.wildcard(),
                            };
                            let declarators: Vec<AstId> = ast.children_with_role(member, Role::Declarator).collect();
                            for declarator in declarators {
                                let Some(name) = ast.name_of(declarator) else {
                                    continue;
                                };
                                let field = index.create_field(class, name)?;
                                if let Some(item) = index.get_mut(field) {
                                    item.set_field_type(ty);
                                }
                                fields += 1;
                            }
                        }
                        AstKind::EnumConstant => {
                            let Some(name) = ast.name_of(member) else {
                                continue;
                            };
                            let field = index.create_field(class, name)?;
                            if let Some(item) = index.get_mut(field) {
                                item.set_field_type(class);
                            }
                            fields += 1;
                        }
                        _ => {}
                    }
                }
            }
        }
        ctx.shared.count(|s| {
            s.methods += methods.len();
            s.fields += fields;
        });
        ctx.methods = Some(methods);
        Ok(())
    }
}

/// Collects the unit's call sites and resolves each once, creating pseudo
/// methods for calls nothing declares when configured to.
pub struct PseudoMethodsTask;

impl Task<LoadingContext> for PseudoMethodsTask {
    fn name(&self) -> String {
        "load pseudo methods".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Methods]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::PseudoMethods]
    }

    fn run(&mut self, ctx: &mut LoadingContext, _spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let Some(unit) = ctx.unit.clone() else {
            return Ok(());
        };
        let calls = {
            let index = ctx.shared.read()?;
            let types = TypeResolver::new(&unit, ctx.project);
            let mut visitor = VariableVisitor::new(&index, &types);
            walk(&unit.ast, &mut visitor);
            visitor.into_calls()
        };

        let create = ctx.shared.config.create_pseudo_methods;
        let (mut created, mut unresolved) = (0, 0);
        {
            let mut index = ctx.shared.write()?;
            for site in &calls {
                match resolve_or_create(&mut index, site, create)? {
                    CallTarget::Created(_) => created += 1,
                    CallTarget::Unresolved => unresolved += 1,
                    CallTarget::Resolved(_) => {}
                }
            }
        }
        ctx.shared.count(|s| {
            s.pseudo_methods += created;
            s.unresolved_calls += unresolved;
        });
        ctx.calls = Some(calls);
        Ok(())
    }
}

/// Links each calling method (or class, for calls outside any method) to the
/// method it calls, and constructor calls to the constructed class.
pub struct MethodDepsTask;

impl Task<LoadingContext> for MethodDepsTask {
    fn name(&self) -> String {
        "load method dependencies".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::PseudoMethods]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::MethodDependencies]
    }

    fn run(&mut self, ctx: &mut LoadingContext, _spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let (Some(unit), Some(calls)) = (ctx.unit.clone(), ctx.calls.as_ref()) else {
            return Ok(());
        };
        let ast = &unit.ast;
        let methods: HashMap<AstId, ItemId> = ctx.methods.iter().flatten().copied().collect();
        let classes: HashMap<AstId, ItemId> = ctx
            .classes
            .iter()
            .flatten()
            .filter_map(|(decl, class)| decl.map(|d| (d, *class)))
            .collect();

        let edges: Vec<(ItemId, ItemId)> = {
            let index = ctx.shared.read()?;
            let mut edges = Vec::new();
            for site in calls {
                let Some(target) = resolve_call(&index, site) else {
                    continue;
                };
                let source = ast
                    .ancestors(site.node)
                    .find_map(|a| methods.get(&a).or_else(|| classes.get(&a)))
                    .copied();
                let Some(source) = source else {
                    continue;
                };
                edges.push((source, target));
                if site.kind == CallKind::Constructor {
                    if let Some(owner) = index.get(target).and_then(|m| m.parent()) {
                        edges.push((source, owner));
                    }
                }
            }
            edges
        };

        {
            let mut index = ctx.shared.write()?;
            for (from, to) in edges {
                index.add_dependency(from, to);
            }
        }
        ctx.method_dependencies = true;
        Ok(())
    }
}
