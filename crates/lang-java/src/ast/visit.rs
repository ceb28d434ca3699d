use super::{Ast, AstId};

/// Pre-order callbacks. Returning `false` from `visit` skips the children;
/// `end_visit` runs for every visited node either way.
pub trait Visitor {
    fn visit(&mut self, _ast: &Ast, _id: AstId) -> bool {
        true
    }

    fn end_visit(&mut self, _ast: &Ast, _id: AstId) {}
}

pub fn walk(ast: &Ast, visitor: &mut impl Visitor) {
    if !ast.is_empty() {
        walk_from(ast, ast.root(), visitor);
    }
}

/// Walks the subtree rooted at `start` with an explicit stack, so deeply
/// nested expressions cannot exhaust the thread stack.
pub fn walk_from(ast: &Ast, start: AstId, visitor: &mut impl Visitor) {
    let mut stack = vec![(start, false)];
    while let Some((id, entered)) = stack.pop() {
        if entered {
            visitor.end_visit(ast, id);
            continue;
        }
        let descend = visitor.visit(ast, id);
        stack.push((id, true));
        if descend {
            stack.extend(ast.children(id).iter().rev().map(|c| (*c, false)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstKind, JavaParser};

    struct Trace {
        events: Vec<String>,
    }

    impl Visitor for Trace {
        fn visit(&mut self, ast: &Ast, id: AstId) -> bool {
            let kind = ast.kind(id);
            if kind != AstKind::Other {
                self.events.push(format!("+{}", kind.as_str()));
            }
            kind != AstKind::MethodDeclaration
        }

        fn end_visit(&mut self, ast: &Ast, id: AstId) {
            if ast.kind(id).is_type_declaration() {
                self.events.push("-type".to_string());
            }
        }
    }

    #[test]
    fn false_from_visit_prunes_the_subtree() {
        let unit = JavaParser::new()
            .parse("A.java", "class A { void f() { g(); } }")
            .expect("parse");
        let mut trace = Trace { events: Vec::new() };
        walk(&unit.ast, &mut trace);
        assert_eq!(
            trace.events,
            vec![
                "+CompilationUnit",
                "+ClassDeclaration",
                "+Name",
                "+MethodDeclaration",
                "-type"
            ]
        );
    }
}
