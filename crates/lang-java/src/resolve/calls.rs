use super::variables::CallSite;
use crate::error::Result;
use cmtscope_core::model::util::{find_method_in_hierarchy, is_third_party, project_of};
use cmtscope_core::model::{AttrKey, BUILTIN_PROJECT, MethodQuery};
use cmtscope_core::{ItemId, JavaItemIndex};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    Resolved(ItemId),
    /// A pseudo method created for the call.
    Created(ItemId),
    Unresolved,
}

impl CallTarget {
    pub fn method(self) -> Option<ItemId> {
        match self {
            CallTarget::Resolved(id) | CallTarget::Created(id) => Some(id),
            CallTarget::Unresolved => None,
        }
    }
}

/// Finds the method a call site refers to by name and argument count,
/// searching each candidate owner and its supertypes in turn.
pub fn resolve_call(index: &JavaItemIndex, site: &CallSite) -> Option<ItemId> {
    let query = MethodQuery::for_call(site.name.as_str(), site.arg_count);
    site.owners
        .iter()
        .find_map(|owner| find_method_in_hierarchy(index, *owner, &query))
}

/// Whether a pseudo method may be placed on `owner`: arrays, primitives and
/// the wildcard never get one.
fn accepts_pseudo(index: &JavaItemIndex, owner: ItemId) -> bool {
    let Some(item) = index.get(owner) else {
        return false;
    };
    if item.array_base().is_some() {
        return false;
    }
    let builtin = project_of(index, owner)
        .and_then(|p| index.get(p))
        .is_some_and(|p| p.name() == BUILTIN_PROJECT);
    !builtin
}

/// Resolves a call site, creating a pseudo method on its first candidate
/// owner when nothing matches and `create` is set. Parameters of a pseudo
/// method are all wildcards.
pub fn resolve_or_create(index: &mut JavaItemIndex, site: &CallSite, create: bool) -> Result<CallTarget> {
    if let Some(found) = resolve_call(index, site) {
        return Ok(CallTarget::Resolved(found));
    }
    let owner = match site.owners.first() {
        Some(owner) if create && accepts_pseudo(index, *owner) => *owner,
        _ => {
            debug!(name = %site.name, args = site.arg_count, "unresolved call");
            return Ok(CallTarget::Unresolved);
        }
    };
    let wildcard = index.wildcard();
    let params = vec![wildcard; site.arg_count];
    let method = index.create_method(owner, &site.name, Some(params))?;
    let third_party = is_third_party(index, owner);
    if let Some(item) = index.get_mut(method) {
        item.set_flag(AttrKey::Pseudo, true);
        if third_party {
            item.set_flag(AttrKey::ThirdParty, true);
        }
    }
    debug!(name = %site.name, args = site.arg_count, "created pseudo method");
    Ok(CallTarget::Created(method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::CallKind;
    use crate::ast::AstId;
    use cmtscope_core::ItemKind;

    fn site(owners: Vec<ItemId>, name: &str, arg_count: usize) -> CallSite {
        CallSite {
            node: first_node(),
            kind: CallKind::Method,
            name: name.to_string(),
            owners,
            arg_count,
            enclosing: None,
        }
    }

    fn first_node() -> AstId {
        crate::ast::JavaParser::new()
            .parse("X.java", "class X {}")
            .map(|u| u.ast.root())
            .expect("parse")
    }

    #[test]
    fn inherited_methods_resolve_and_misses_become_pseudo() {
        let mut index = JavaItemIndex::new();
        let p = index.create_project("app");
        let pkg = index.create_package(p, "a").expect("package");
        let base = index.create_class(pkg, "Base").expect("class");
        let child = index.create_class(pkg, "Child").expect("class");
        if let Some(c) = index.get_mut(child) {
            c.set_superclass(base);
        }
        let string = index.create_class(pkg, "S").expect("class");
        let inherited = index
            .create_method(base, "run", Some(vec![string]))
            .expect("method");

        let call = site(vec![child], "run", 1);
        assert_eq!(
            resolve_or_create(&mut index, &call, true).expect("resolve"),
            CallTarget::Resolved(inherited)
        );

        let missing = site(vec![child], "stop", 2);
        assert_eq!(
            resolve_or_create(&mut index, &missing, false).expect("resolve"),
            CallTarget::Unresolved
        );
        let created = resolve_or_create(&mut index, &missing, true)
            .expect("resolve")
            .method()
            .expect("pseudo");
        let item = index.get(created).expect("item");
        assert!(item.is_pseudo());
        assert_eq!(item.parent(), Some(child));
        assert_eq!(item.param_types().map(<[ItemId]>::len), Some(2));
        assert_eq!(index.find_all(Some(child), "stop", ItemKind::Method), vec![created]);

        assert_eq!(
            resolve_or_create(&mut index, &missing, true).expect("again"),
            CallTarget::Resolved(created)
        );
    }

    #[test]
    fn arrays_never_receive_pseudo_methods() {
        let mut index = JavaItemIndex::new();
        let int = index.primitive("int").expect("int");
        let array = index.create_array_class(int, 1).expect("array");
        let call = site(vec![array], "clone", 0);
        assert_eq!(
            resolve_or_create(&mut index, &call, true).expect("resolve"),
            CallTarget::Unresolved
        );
    }
}
