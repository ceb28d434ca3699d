//! Hierarchy and signature helpers over a [`JavaItemIndex`].

use super::id::ItemId;
use super::index::JavaItemIndex;
use super::item::{AttrKey, ItemKind};
use indexmap::IndexSet;
use std::collections::VecDeque;

/// Whether two types are interchangeable for overload matching: equal, one
/// of them the wildcard, or arrays of equal dimension over matching bases.
pub fn types_match(index: &JavaItemIndex, a: ItemId, b: ItemId) -> bool {
    if a == b {
        return true;
    }
    if let Some(wildcard) = index.find_wildcard() {
        if a == wildcard || b == wildcard {
            return true;
        }
    }
    match (index.get(a), index.get(b)) {
        (Some(x), Some(y)) => match (x.array_base(), y.array_base()) {
            (Some(xb), Some(yb)) => {
                x.array_dimensions() == y.array_dimensions() && types_match(index, xb, yb)
            }
            _ => false,
        },
        _ => false,
    }
}

/// Signature comparison where an unrecorded list equals an empty one.
pub fn params_match(index: &JavaItemIndex, a: Option<&[ItemId]>, b: Option<&[ItemId]>) -> bool {
    let a = a.unwrap_or(&[]);
    let b = b.unwrap_or(&[]);
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| types_match(index, *x, *y))
}

fn ancestor_of_kind(index: &JavaItemIndex, id: ItemId, kind: ItemKind) -> Option<ItemId> {
    let mut current = Some(id);
    while let Some(cur) = current {
        let item = index.get(cur)?;
        if item.kind() == kind {
            return Some(cur);
        }
        current = item.parent();
    }
    None
}

pub fn package_of(index: &JavaItemIndex, id: ItemId) -> Option<ItemId> {
    ancestor_of_kind(index, id, ItemKind::Package)
}

pub fn project_of(index: &JavaItemIndex, id: ItemId) -> Option<ItemId> {
    ancestor_of_kind(index, id, ItemKind::Project)
}

pub fn class_of(index: &JavaItemIndex, id: ItemId) -> Option<ItemId> {
    ancestor_of_kind(index, id, ItemKind::Class)
}

/// Whether the project owning `id` is flagged third-party.
pub fn is_third_party(index: &JavaItemIndex, id: ItemId) -> bool {
    project_of(index, id)
        .and_then(|p| index.get(p))
        .is_some_and(|p| p.is_third_party())
}

/// Copies the project-level third-party flag onto every item below a
/// third-party project. Returns the number of items newly flagged.
pub fn propagate_third_party(index: &mut JavaItemIndex) -> usize {
    let pending: Vec<ItemId> = index
        .iter()
        .filter(|item| !item.is_third_party() && is_third_party(index, item.id()))
        .map(|item| item.id())
        .collect();
    for id in &pending {
        if let Some(item) = index.get_mut(*id) {
            item.set_flag(AttrKey::ThirdParty, true);
        }
    }
    pending.len()
}

/// Fully-qualified name: `pkg.Outer.Inner` for classes, `pkg.Class.member`
/// for methods and fields.
pub fn fqn(index: &JavaItemIndex, id: ItemId) -> Option<String> {
    let item = index.get(id)?;
    match item.kind() {
        ItemKind::Project | ItemKind::Package => Some(item.name().to_string()),
        ItemKind::Class => {
            let package = index.get(item.parent()?)?;
            if package.name().is_empty() {
                Some(item.name().to_string())
            } else {
                Some(format!("{}.{}", package.name(), item.name()))
            }
        }
        ItemKind::Method | ItemKind::Field => {
            let owner = fqn(index, item.parent()?)?;
            Some(format!("{owner}.{}", item.name()))
        }
    }
}

/// Classes whose FQN is `name`, across all projects. Longer package prefixes
/// are tried first, so `a.b.C` prefers class `C` in `a.b` over `b.C` in `a`.
pub fn find_classes_by_fqn(index: &JavaItemIndex, name: &str) -> Vec<ItemId> {
    let mut splits: Vec<(&str, &str)> = name
        .rmatch_indices('.')
        .map(|(dot, _)| (&name[..dot], &name[dot + 1..]))
        .collect();
    splits.push(("", name));

    let mut found = Vec::new();
    for (package, class) in splits {
        if class.is_empty() {
            continue;
        }
        for pkg in index.find_by_name(ItemKind::Package, package) {
            if let Some(id) = index.find_item(Some(pkg), class, ItemKind::Class) {
                if !found.contains(&id) {
                    found.push(id);
                }
            }
        }
    }
    found
}

/// Proper supertypes of `class`, breadth first: at each level the superclass
/// comes before the interfaces. Cycles are cut by the visited set.
pub fn supertype_chain(index: &JavaItemIndex, class: ItemId) -> IndexSet<ItemId> {
    let mut visited = IndexSet::new();
    visited.insert(class);
    let mut queue = VecDeque::from([class]);
    while let Some(current) = queue.pop_front() {
        let Some(item) = index.get(current) else {
            continue;
        };
        let supers = item.superclass().into_iter().chain(item.superinterfaces().iter().copied());
        for sup in supers {
            if visited.insert(sup) {
                queue.push_back(sup);
            }
        }
    }
    visited.shift_remove(&class);
    visited
}

/// `class` followed by its supertype chain.
fn self_and_supertypes(index: &JavaItemIndex, class: ItemId) -> impl Iterator<Item = ItemId> {
    std::iter::once(class).chain(supertype_chain(index, class))
}

pub fn find_method_in_hierarchy(
    index: &JavaItemIndex,
    class: ItemId,
    query: &MethodQuery,
) -> Option<ItemId> {
    self_and_supertypes(index, class).find_map(|owner| {
        index
            .find_all(Some(owner), &query.name, ItemKind::Method)
            .into_iter()
            .find(|m| query.matches(index, *m))
    })
}

pub fn find_field_in_hierarchy(index: &JavaItemIndex, class: ItemId, name: &str) -> Option<ItemId> {
    self_and_supertypes(index, class)
        .find_map(|owner| index.find_item(Some(owner), name, ItemKind::Field))
}

/// Whether `ancestor` is `class` or one of its supertypes.
pub fn is_subtype_of(index: &JavaItemIndex, class: ItemId, ancestor: ItemId) -> bool {
    class == ancestor || supertype_chain(index, class).contains(&ancestor)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// Argument whose type could not be determined.
    Any,
    Known(ItemId),
}

/// Unregistered stand-in for a method built from a call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodQuery {
    pub name: String,
    pub params: Vec<QueryType>,
}

impl MethodQuery {
    pub fn new(name: impl Into<String>, params: Vec<QueryType>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Query knowing only the argument count.
    pub fn for_call(name: impl Into<String>, arg_count: usize) -> Self {
        Self::new(name, vec![QueryType::Any; arg_count])
    }

    pub fn matches(&self, index: &JavaItemIndex, method: ItemId) -> bool {
        let Some(item) = index.get(method) else {
            return false;
        };
        if item.kind() != ItemKind::Method || item.name() != self.name {
            return false;
        }
        let params = item.param_types().unwrap_or(&[]);
        params.len() == self.params.len()
            && params.iter().zip(&self.params).all(|(p, query)| match query {
                QueryType::Any => true,
                QueryType::Known(t) => types_match(index, *t, *p),
            })
    }

    /// Parameter list to record on a pseudo method built from this query;
    /// unknown positions become the wildcard.
    pub fn param_types(&self, wildcard: ItemId) -> Vec<ItemId> {
        self.params
            .iter()
            .map(|p| match p {
                QueryType::Any => wildcard,
                QueryType::Known(t) => *t,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (JavaItemIndex, ItemId, ItemId, ItemId) {
        let mut index = JavaItemIndex::new();
        let p = index.create_project("p");
        let pkg = index.create_package(p, "a.b").expect("package");
        let base = index.create_class(pkg, "Base").expect("class");
        let iface = index.create_class(pkg, "Api").expect("class");
        let child = index.create_class(pkg, "Child").expect("class");
        if let Some(c) = index.get_mut(child) {
            c.set_superclass(base);
            c.add_superinterface(iface);
        }
        // cycle
        if let Some(b) = index.get_mut(base) {
            b.set_superclass(child);
        }
        (index, base, iface, child)
    }

    #[test]
    fn supertype_chain_survives_cycles() {
        let (index, base, iface, child) = sample();
        let chain: Vec<_> = supertype_chain(&index, child).into_iter().collect();
        assert_eq!(chain, vec![base, iface]);
    }

    #[test]
    fn fqn_and_lookup_agree() {
        let (mut index, _, _, child) = sample();
        let inner = index.create_inner_class(child, "Node").expect("inner");
        assert_eq!(fqn(&index, inner).as_deref(), Some("a.b.Child.Node"));
        assert_eq!(find_classes_by_fqn(&index, "a.b.Child.Node"), vec![inner]);
        assert_eq!(find_classes_by_fqn(&index, "a.b.Child"), vec![child]);
        assert!(find_classes_by_fqn(&index, "a.Missing").is_empty());
    }

    #[test]
    fn inherited_method_found_by_arity() {
        let (mut index, base, _, child) = sample();
        let int = index.primitive("int").expect("int");
        let m = index.create_method(base, "size", Some(vec![int])).expect("method");
        assert_eq!(
            find_method_in_hierarchy(&index, child, &MethodQuery::for_call("size", 1)),
            Some(m)
        );
        assert_eq!(
            find_method_in_hierarchy(&index, child, &MethodQuery::for_call("size", 2)),
            None
        );
    }

    #[test]
    fn third_party_flag_reaches_every_member() {
        let (mut index, base, _, _) = sample();
        let lib = index.create_project("lib");
        let pkg = index.create_package(lib, "org.lib").expect("package");
        let util = index.create_class(pkg, "Util").expect("class");
        let help = index.create_method(util, "help", Some(Vec::new())).expect("method");
        let count = index.create_field(util, "count").expect("field");
        if let Some(p) = index.get_mut(lib) {
            p.set_flag(AttrKey::ThirdParty, true);
        }
        assert!(!index.get(help).expect("help").is_third_party());

        assert_eq!(propagate_third_party(&mut index), 4);
        for id in [pkg, util, help, count] {
            assert!(index.get(id).expect("item").is_third_party());
        }
        assert!(!index.get(base).expect("base").is_third_party());
        assert_eq!(propagate_third_party(&mut index), 0);
    }
}
