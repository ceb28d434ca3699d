use crate::param::{Filter, NameMatcher};
use crate::result::Capture;
use cmtscope_core::model::util::{find_classes_by_fqn, fqn, supertype_chain};
use cmtscope_core::{ItemId, JavaItemIndex};
use cmtscope_java::ast::{AstId, AstKind, CompilationUnit, Role};
use cmtscope_java::resolve::{CONSTRUCTOR, CallSite, TypeResolver, parameters, resolve_call};
use once_cell::unsync::OnceCell;
use tracing::debug;

/// What a search sees of one file: its syntax tree and the item index
/// built for the workspace, which is only read.
pub struct SearchContext<'a> {
    pub index: &'a JavaItemIndex,
    pub unit: &'a CompilationUnit,
    types: TypeResolver<'a>,
}

impl<'a> SearchContext<'a> {
    pub fn new(index: &'a JavaItemIndex, unit: &'a CompilationUnit) -> Self {
        Self::for_project(index, unit, None)
    }

    /// Context for a file of `project`. Names declared in several projects
    /// resolve to the file's own project first.
    pub fn for_project(index: &'a JavaItemIndex, unit: &'a CompilationUnit, project: Option<ItemId>) -> Self {
        Self {
            index,
            unit,
            types: TypeResolver::new(unit, project),
        }
    }

    pub fn types(&self) -> &TypeResolver<'a> {
        &self.types
    }
}

/// How the class a candidate belongs to is found, deferred until a filter
/// asks for it.
#[derive(Debug, Clone)]
pub(crate) enum ClassSource {
    Known(Option<ItemId>),
    /// The type declaration enclosing a member.
    Declaration(AstId),
    /// Declaring class of the called method, else the receiver type.
    Call(Box<CallSite>),
    /// Qualified name written in source.
    Name(String),
}

/// A node under test together with the facts filters ask about it.
pub(crate) struct Candidate {
    pub node: AstId,
    pub is_method: bool,
    /// Method name, or qualified class name for class candidates.
    pub name: Option<String>,
    /// Parameter count of a declaration or argument count of a call.
    pub arg_count: Option<usize>,
    source: ClassSource,
    class: OnceCell<Option<ItemId>>,
}

impl Candidate {
    pub fn class(node: AstId, name: String, source: ClassSource) -> Self {
        Self {
            node,
            is_method: false,
            name: Some(name),
            arg_count: None,
            source,
            class: OnceCell::new(),
        }
    }

    pub fn method(node: AstId, name: String, arg_count: usize, source: ClassSource) -> Self {
        Self {
            node,
            is_method: true,
            name: Some(name),
            arg_count: Some(arg_count),
            source,
            class: OnceCell::new(),
        }
    }

    /// Candidate for a method or constructor declaration.
    pub fn method_declaration(cx: &SearchContext, decl: AstId) -> Option<Self> {
        let ast = &cx.unit.ast;
        let name = match ast.kind(decl) {
            AstKind::ConstructorDeclaration => CONSTRUCTOR,
            AstKind::MethodDeclaration => ast.name_of(decl)?,
            _ => return None,
        };
        let owner = ast.enclosing_type_declaration(decl)?;
        Some(Self::method(
            decl,
            name.to_string(),
            parameters(ast, decl).len(),
            ClassSource::Declaration(owner),
        ))
    }

    pub fn set_source(&mut self, source: ClassSource) {
        self.source = source;
        self.class = OnceCell::new();
    }

    /// The class this candidate is, or the class that owns it.
    pub fn owner(&self, cx: &SearchContext) -> Option<ItemId> {
        *self.class.get_or_init(|| {
            let found = match &self.source {
                ClassSource::Known(id) => *id,
                ClassSource::Declaration(decl) => cx.types().class_of_decl(cx.index, *decl),
                ClassSource::Call(site) => resolve_call(cx.index, site)
                    .and_then(|m| cx.index.get(m))
                    .and_then(|m| m.parent())
                    .or_else(|| site.owners.first().copied()),
                ClassSource::Name(name) => cx.types().prefer_own(cx.index, &find_classes_by_fqn(cx.index, name)),
            };
            if found.is_none() {
                debug!(
                    path = %cx.unit.path.display(),
                    node = cx.unit.ast.text(self.node),
                    "owning class not in item index"
                );
            }
            found
        })
    }

    fn owner_name(&self, cx: &SearchContext) -> Option<String> {
        match (&self.source, self.is_method) {
            (ClassSource::Name(name), _) => Some(name.clone()),
            (_, false) if self.name.is_some() => self.name.clone(),
            _ => self.owner(cx).and_then(|c| fqn(cx.index, c)),
        }
    }

    fn in_supertype_position(&self, cx: &SearchContext) -> bool {
        let ast = &cx.unit.ast;
        let is_super = |id: AstId| matches!(ast.node(id).role, Role::Superclass | Role::Interface);
        is_super(self.node)
            || ast
                .parent(self.node)
                .is_some_and(|p| ast.kind(p) == AstKind::ParameterizedType && is_super(p))
    }
}

fn match_name(matcher: &NameMatcher, name: &str, captures: &mut Vec<Capture>) -> bool {
    match matcher {
        NameMatcher::Literal(literal) => literal == name,
        NameMatcher::Regex { pattern, regex } => match regex.captures(name) {
            Some(caps) => {
                captures.push(Capture {
                    pattern: pattern.clone(),
                    text: name.to_string(),
                    groups: caps.iter().skip(1).map(|g| g.map(|m| m.as_str().to_string())).collect(),
                });
                true
            }
            None => false,
        },
    }
}

/// Every filter holds, checked in order. Captures of a failed conjunction
/// are discarded.
pub(crate) fn accept_all<'f>(
    filters: impl IntoIterator<Item = &'f Filter>,
    candidate: &Candidate,
    cx: &SearchContext,
    captures: &mut Vec<Capture>,
) -> bool {
    let mut local = Vec::new();
    for filter in filters {
        if !accept(filter, candidate, cx, &mut local) {
            return false;
        }
    }
    captures.extend(local);
    true
}

pub(crate) fn accept(filter: &Filter, candidate: &Candidate, cx: &SearchContext, captures: &mut Vec<Capture>) -> bool {
    match filter {
        Filter::Name(matcher) => candidate
            .name
            .as_deref()
            .is_some_and(|name| match_name(matcher, name, captures)),
        Filter::ClassName(matcher) => candidate
            .owner_name(cx)
            .is_some_and(|name| match_name(matcher, &name, captures)),
        Filter::HasParam(count) => candidate.arg_count.is_some_and(|n| count.accepts(n)),
        Filter::HasSupertype(subs) => {
            let Some(class) = candidate.owner(cx) else {
                return false;
            };
            supertype_chain(cx.index, class).into_iter().any(|ancestor| {
                let Some(name) = fqn(cx.index, ancestor) else {
                    return false;
                };
                let view = Candidate::class(candidate.node, name, ClassSource::Known(Some(ancestor)));
                accept_all(subs, &view, cx, captures)
            })
        }
        Filter::IsSupertype => candidate.in_supertype_position(cx),
        Filter::IsInMethod(subs) => cx
            .unit
            .ast
            .enclosing_method(candidate.node)
            .and_then(|decl| Candidate::method_declaration(cx, decl))
            .is_some_and(|method| accept_all(subs, &method, cx, captures)),
        Filter::Not(subs) => !accept_all(subs, candidate, cx, &mut Vec::new()),
        Filter::And(subs) => accept_all(subs, candidate, cx, captures),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamCount;
    use cmtscope_java::JavaParser;

    fn count(text: &str) -> Filter {
        Filter::HasParam(ParamCount::parse(text).expect("count"))
    }

    #[test]
    fn not_negates_the_conjunction() {
        let index = JavaItemIndex::new();
        let unit = JavaParser::new()
            .parse("A.java", "class A { void f(int a, int b) {} }")
            .expect("parse");
        let cx = SearchContext::new(&index, &unit);
        let ast = &unit.ast;
        let decl = ast
            .ids()
            .find(|id| ast.kind(*id) == AstKind::MethodDeclaration)
            .expect("method");
        let method = Candidate::method_declaration(&cx, decl).expect("candidate");

        let holds = count("=2");
        let fails = count("=3");
        let mut captures = Vec::new();
        assert!(accept(&Filter::Not(vec![holds.clone(), fails.clone()]), &method, &cx, &mut captures));
        assert!(!accept(&Filter::Not(vec![holds.clone(), holds.clone()]), &method, &cx, &mut captures));
        assert!(accept(&Filter::Not(vec![fails.clone(), fails]), &method, &cx, &mut captures));
        assert!(accept(&Filter::And(vec![holds.clone(), count(">=1")]), &method, &cx, &mut captures));
        assert!(!accept(&Filter::And(vec![holds, count("<=1")]), &method, &cx, &mut captures));
    }

    #[test]
    fn regex_groups_are_captured_only_on_success() {
        let mut captures = Vec::new();
        let matcher = NameMatcher::regex("get(\\w+?)(s)?").expect("regex");
        assert!(match_name(&matcher, "getNames", &mut captures));
        assert!(!match_name(&matcher, "setName", &mut captures));
        assert_eq!(captures.len(), 1);
        assert_eq!(
            captures[0].groups,
            vec![Some("Name".to_string()), Some("s".to_string())]
        );
    }
}
