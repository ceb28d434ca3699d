use crate::context::{Candidate, ClassSource, SearchContext, accept_all};
use crate::param::{Filter, SearchKind, SearchParam};
use crate::result::{Capture, SearchResult};
use cmtscope_core::model::util::fqn;
use cmtscope_java::ast::{AstId, AstKind, walk};
use cmtscope_java::resolve::{CONSTRUCTOR, VariableVisitor};
use std::collections::HashMap;
use tracing::debug;

impl SearchParam {
    /// Every node of the unit that satisfies this query, in source order.
    pub fn find_all(&self, cx: &SearchContext) -> Vec<SearchResult> {
        let filters = self.ordered_filters();
        let candidates = match self.kind() {
            SearchKind::ClassDecl => class_declarations(cx),
            SearchKind::ClassRef => class_references(cx),
            SearchKind::MethodDecl => method_declarations(cx),
            SearchKind::MethodRef => return method_references(cx, &filters),
        };
        candidates
            .into_iter()
            .filter_map(|candidate| matched(cx, &filters, &candidate))
            .collect()
    }
}

fn matched(cx: &SearchContext, filters: &[&Filter], candidate: &Candidate) -> Option<SearchResult> {
    let mut captures = Vec::new();
    accept_all(filters.iter().copied(), candidate, cx, &mut captures).then(|| result(cx, candidate.node, captures))
}

fn result(cx: &SearchContext, node: AstId, captures: Vec<Capture>) -> SearchResult {
    let ast = &cx.unit.ast;
    let span = ast.span(node);
    let line = ast.source()[..span.start].bytes().filter(|b| *b == b'\n').count() + 1;
    SearchResult {
        path: cx.unit.path.clone(),
        node,
        node_kind: ast.kind(node).as_str(),
        start: span.start,
        end: span.end(),
        line,
        text: ast.text(node).to_string(),
        captures,
    }
}

fn class_declarations(cx: &SearchContext) -> Vec<Candidate> {
    cx.unit
        .type_declarations()
        .into_iter()
        .filter_map(|decl| {
            let class = cx.types().class_of_decl(cx.index, decl);
            let name = class.and_then(|c| fqn(cx.index, c));
            if name.is_none() {
                debug!(
                    path = %cx.unit.path.display(),
                    decl = cx.unit.ast.name_of(decl).unwrap_or_default(),
                    "declared class not in item index"
                );
            }
            Some(Candidate::class(decl, name?, ClassSource::Known(class)))
        })
        .collect()
}

/// Qualified name a type node spells out through the file's single-type
/// imports. On-demand imports are not consulted.
fn referenced_name(cx: &SearchContext, node: AstId) -> Option<String> {
    let unit = cx.unit;
    let text: String = unit.ast.text(node).chars().filter(|c| !c.is_whitespace()).collect();
    match unit.ast.kind(node) {
        AstKind::SimpleType => unit.explicit_import(&text).map(|i| i.name.clone()),
        AstKind::QualifiedType => {
            let (head, rest) = text.split_once('.')?;
            Some(match unit.explicit_import(head) {
                Some(import) => format!("{}.{rest}", import.name),
                None => text,
            })
        }
        _ => None,
    }
}

fn class_references(cx: &SearchContext) -> Vec<Candidate> {
    let ast = &cx.unit.ast;
    let imports: HashMap<AstId, &str> = cx
        .unit
        .imports
        .iter()
        .filter(|i| !i.is_static && !i.on_demand)
        .map(|i| (i.node, i.name.as_str()))
        .collect();
    ast.ids()
        .filter_map(|id| {
            let name = match ast.kind(id) {
                AstKind::ImportDeclaration => imports.get(&id).map(|n| n.to_string()),
                AstKind::SimpleType | AstKind::QualifiedType => referenced_name(cx, id),
                _ => None,
            }?;
            Some(Candidate::class(id, name.clone(), ClassSource::Name(name)))
        })
        .collect()
}

fn method_declarations(cx: &SearchContext) -> Vec<Candidate> {
    let ast = &cx.unit.ast;
    ast.ids()
        .filter(|id| ast.kind(*id).is_method_declaration())
        .filter_map(|decl| Candidate::method_declaration(cx, decl))
        .collect()
}

/// Method references are screened on what the call spells out before the
/// file's calls are resolved, and resolution is skipped when nothing
/// survives the screen.
fn method_references(cx: &SearchContext, filters: &[&Filter]) -> Vec<SearchResult> {
    let ast = &cx.unit.ast;
    let syntactic = |f: &&Filter| f.rank() <= 1;
    let screened: Vec<Candidate> = ast
        .ids()
        .filter_map(|id| {
            let name = match ast.kind(id) {
                AstKind::MethodInvocation => ast.name_of(id)?,
                AstKind::ObjectCreation | AstKind::ConstructorInvocation => CONSTRUCTOR,
                _ => return None,
            };
            Some(Candidate::method(
                id,
                name.to_string(),
                ast.arguments(id).len(),
                ClassSource::Known(None),
            ))
        })
        .filter(|c| accept_all(filters.iter().copied().filter(syntactic), c, cx, &mut Vec::new()))
        .collect();
    if screened.is_empty() {
        return Vec::new();
    }

    let mut visitor = VariableVisitor::new(cx.index, cx.types());
    walk(ast, &mut visitor);
    let mut sites: HashMap<AstId, _> = visitor.into_calls().into_iter().map(|s| (s.node, s)).collect();

    screened
        .into_iter()
        .filter_map(|mut candidate| {
            let source = match sites.remove(&candidate.node) {
                Some(site) => ClassSource::Call(Box::new(site)),
                None => ClassSource::Known(None),
            };
            candidate.set_source(source);
            matched(cx, filters, &candidate)
        })
        .collect()
}

