use super::id::ItemId;
use super::index::JavaItemIndex;
use super::item::ItemKind;
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub struct PruneOutcome {
    pub index: JavaItemIndex,
    /// Old handle to new handle for every retained item.
    pub remap: HashMap<ItemId, ItemId>,
    pub removed: usize,
}

/// Copies the part of `index` worth keeping into a fresh index.
///
/// Items of projects not flagged third-party are always kept. Everything they
/// refer to is kept too, together with its ancestors. A third-party item that
/// is only kept by reference contributes its forward edges (dependencies and
/// typed attributes) and its parent, never its children or incoming edges.
/// References to dropped items are removed from the copies.
pub fn prune(index: &JavaItemIndex) -> PruneOutcome {
    let ids = index.ids();
    let third_party_projects: HashSet<ItemId> = index
        .items_of_kind(ItemKind::Project)
        .filter(|p| p.is_third_party())
        .map(|p| p.id())
        .collect();
    let owning_project = |mut id: ItemId| -> Option<ItemId> {
        loop {
            let item = index.get(id)?;
            match item.parent() {
                Some(parent) => id = parent,
                None => return (item.kind() == ItemKind::Project).then_some(id),
            }
        }
    };
    let third_party = |id: ItemId| owning_project(id).is_some_and(|p| third_party_projects.contains(&p));

    let mut retained: HashSet<ItemId> = HashSet::new();
    let mut worklist: Vec<ItemId> = Vec::new();
    for id in &ids {
        if !third_party(*id) && retained.insert(*id) {
            worklist.push(*id);
        }
    }

    while let Some(id) = worklist.pop() {
        let Some(item) = index.get(id) else {
            continue;
        };
        let next: Vec<ItemId> = if third_party(id) {
            item.parent()
                .into_iter()
                .chain(item.dependencies().iter().copied())
                .chain(item.attribute_ids())
                .collect()
        } else {
            item.referenced_ids().collect()
        };
        for target in next {
            if index.contains(target) && retained.insert(target) {
                worklist.push(target);
            }
        }
    }

    let mut pruned = JavaItemIndex::new();
    let mut remap = HashMap::with_capacity(retained.len());
    for id in &ids {
        if !retained.contains(id) {
            continue;
        }
        if let Some(item) = index.get(*id) {
            remap.insert(*id, item.copy_to(&mut pruned));
        }
    }
    let new_ids: Vec<ItemId> = remap.values().copied().collect();
    for id in new_ids {
        if let Some(item) = pruned.get_mut(id) {
            item.remap(|old| remap.get(&old).copied());
        }
    }
    pruned.rebuild_lookup();

    let removed = ids.len() - remap.len();
    debug!(kept = remap.len(), removed, "pruned item index");
    PruneOutcome {
        index: pruned,
        remap,
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttrKey;

    #[test]
    fn unreferenced_archive_classes_are_dropped() {
        let mut index = JavaItemIndex::new();
        let app = index.create_project("app");
        let lib = index.create_project("lib");
        if let Some(p) = index.get_mut(lib) {
            p.set_flag(AttrKey::ThirdParty, true);
        }
        let app_pkg = index.create_package(app, "com.app").expect("package");
        let lib_pkg = index.create_package(lib, "org.lib").expect("package");
        let main = index.create_class(app_pkg, "Main").expect("class");
        let used = index.create_class(lib_pkg, "Used").expect("class");
        let unused = index.create_class(lib_pkg, "Unused").expect("class");
        index.add_dependency(main, used);
        index.add_dependency(unused, used);

        let outcome = prune(&index);
        let pruned = &outcome.index;
        assert_eq!(outcome.removed, 1);
        assert!(!outcome.remap.contains_key(&unused));

        let new_used = outcome.remap[&used];
        let used_item = pruned.get(new_used).expect("used kept");
        assert_eq!(used_item.incoming().len(), 1);
        let new_pkg = outcome.remap[&lib_pkg];
        assert_eq!(pruned.get(new_pkg).map(|p| p.children().to_vec()), Some(vec![new_used]));
        assert_eq!(
            pruned.find_item(Some(new_pkg), "Used", ItemKind::Class),
            Some(new_used)
        );
    }
}
