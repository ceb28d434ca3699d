use anyhow::bail;
use cmtscope_core::model::util::{find_classes_by_fqn, fqn};
use cmtscope_core::storage::Relationship;
use cmtscope_core::{ApiFileManager, ItemId, ItemKind, JavaItemIndex};
use std::collections::BTreeMap;
use std::path::Path;

const KINDS: [ItemKind; 5] = [
    ItemKind::Project,
    ItemKind::Package,
    ItemKind::Class,
    ItemKind::Method,
    ItemKind::Field,
];

pub fn summary(index: &JavaItemIndex) -> Vec<String> {
    let mut lines: Vec<String> = KINDS
        .iter()
        .map(|kind| format!("{:<8} {}", kind.as_str(), index.items_of_kind(*kind).count()))
        .collect();
    let third_party = index.iter().filter(|i| i.is_third_party()).count();
    let pseudo = index.iter().filter(|i| i.is_pseudo()).count();
    lines.push(format!("third-party {third_party}, pseudo {pseudo}"));
    lines
}

/// Items whose qualified name is `name`: classes first, then members of the
/// class named by everything before the last dot, then packages and projects.
fn lookup(index: &JavaItemIndex, name: &str) -> Vec<ItemId> {
    let mut found = find_classes_by_fqn(index, name);
    if let Some((owner, member)) = name.rsplit_once('.') {
        for class in find_classes_by_fqn(index, owner) {
            found.extend(index.find_all(Some(class), member, ItemKind::Method));
            found.extend(index.find_all(Some(class), member, ItemKind::Field));
        }
    }
    found.extend(index.find_by_name(ItemKind::Package, name));
    found.extend(index.find_by_name(ItemKind::Project, name));
    found
}

pub fn describe(index: &JavaItemIndex, id: ItemId) -> Vec<String> {
    let Some(item) = index.get(id) else {
        return Vec::new();
    };
    let label = |id: ItemId| fqn(index, id).unwrap_or_else(|| format!("#{}", id.raw()));
    let mut lines = vec![format!("{} {}", item.kind().as_str(), label(id))];
    let mut edges: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for rel in Relationship::of_item(item) {
        let target = index
            .resolve_raw(rel.target)
            .map_or_else(|| format!("#{}", rel.target), label);
        edges.entry(rel.kind.as_str()).or_default().push(target);
    }
    for (kind, targets) in edges {
        lines.push(format!("  {kind}: {}", targets.join(", ")));
    }
    if !item.incoming().is_empty() {
        let users: Vec<String> = item.incoming().iter().map(|u| label(*u)).collect();
        lines.push(format!("  USED_BY: {}", users.join(", ")));
    }
    lines
}

pub fn run(snapshot: &Path, name: Option<&str>) -> anyhow::Result<()> {
    let index = ApiFileManager::read(snapshot)?;
    let Some(name) = name else {
        for line in summary(&index) {
            println!("{line}");
        }
        return Ok(());
    };
    let found = lookup(&index, name);
    if found.is_empty() {
        bail!("no item named {name} in {}", snapshot.display());
    }
    for id in found {
        for line in describe(&index, id) {
            println!("{line}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (JavaItemIndex, ItemId) {
        let mut index = JavaItemIndex::new();
        let project = index.create_project("app");
        let pkg = index.create_package(project, "a").expect("package");
        let base = index.create_class(pkg, "Base").expect("class");
        let repo = index.create_class(pkg, "Repo").expect("class");
        if let Some(r) = index.get_mut(repo) {
            r.set_superclass(base);
        }
        let save = index.create_method(repo, "save", Some(vec![])).expect("method");
        let run = index.create_method(base, "run", Some(vec![])).expect("method");
        index.add_dependency(run, save);
        (index, repo)
    }

    #[test]
    fn summary_counts_each_kind() {
        let (index, _) = sample();
        let lines = summary(&index);
        assert_eq!(lines[0].split_whitespace().collect::<Vec<_>>(), vec!["PROJECT", "1"]);
        assert_eq!(lines[2].split_whitespace().collect::<Vec<_>>(), vec!["CLASS", "2"]);
        assert_eq!(lines[3].split_whitespace().collect::<Vec<_>>(), vec!["METHOD", "2"]);
    }

    #[test]
    fn members_are_found_by_qualified_name() {
        let (index, repo) = sample();
        assert_eq!(lookup(&index, "a.Repo"), vec![repo]);
        let save = lookup(&index, "a.Repo.save");
        assert_eq!(save.len(), 1);
        let lines = describe(&index, save[0]);
        assert_eq!(lines[0], "METHOD a.Repo.save");
        assert!(lines.iter().any(|l| l == "  USED_BY: a.Base.run"));
        assert!(describe(&index, repo).iter().any(|l| l == "  SUPERCLASS: a.Base"));
    }
}
