use super::id::{IdGenerator, ItemId, next_generation};
use super::item::{ItemKind, JavaItem};
use crate::error::{CoreError, Result};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::Arc;

type LookupKey = (Option<ItemId>, ItemKind, SmolStr);

/// Arena owning every item of one load, optionally layered over a base index.
///
/// Items are stored by raw ID. A delta index allocates raw IDs after the
/// highest one of its base, so raw IDs stay unique across the lineage and a
/// base item mutated through the delta is shadow-copied under its original
/// handle.
#[derive(Debug)]
pub struct JavaItemIndex {
    generation: u32,
    first_raw: u32,
    items: Vec<Option<JavaItem>>,
    id_gen: IdGenerator,
    base: Option<Arc<JavaItemIndex>>,
    shadows: HashMap<ItemId, JavaItem>,
    lookup: HashMap<LookupKey, Vec<ItemId>>,
    by_name: HashMap<(ItemKind, SmolStr), Vec<ItemId>>,
}

impl Default for JavaItemIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaItemIndex {
    pub fn new() -> Self {
        Self::starting_at(0, None)
    }

    pub fn with_base(base: Arc<JavaItemIndex>) -> Self {
        let first = base.next_raw();
        Self::starting_at(first, Some(base))
    }

    fn starting_at(first_raw: u32, base: Option<Arc<JavaItemIndex>>) -> Self {
        Self {
            generation: next_generation(),
            first_raw,
            items: Vec::new(),
            id_gen: IdGenerator::starting_at(first_raw),
            base,
            shadows: HashMap::new(),
            lookup: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn base(&self) -> Option<&Arc<JavaItemIndex>> {
        self.base.as_ref()
    }

    /// First raw ID the next allocation would use.
    pub fn next_raw(&self) -> u32 {
        self.id_gen.peek()
    }

    pub fn len(&self) -> usize {
        let own = self.items.iter().filter(|i| i.is_some()).count();
        own + self.base.as_ref().map_or(0, |b| b.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    fn slot(&self, id: ItemId) -> Option<usize> {
        id.raw()
            .checked_sub(self.first_raw)
            .map(|offset| offset as usize)
    }

    pub fn get(&self, id: ItemId) -> Option<&JavaItem> {
        if id.generation() == self.generation {
            let slot = self.slot(id)?;
            return self.items.get(slot)?.as_ref();
        }
        if let Some(shadow) = self.shadows.get(&id) {
            return Some(shadow);
        }
        self.base.as_ref()?.get(id)
    }

    /// Mutable access. Items owned by the base are copied into this index on
    /// first write and keep their handle.
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut JavaItem> {
        if id.generation() == self.generation {
            let slot = self.slot(id)?;
            return self.items.get_mut(slot)?.as_mut();
        }
        if !self.shadows.contains_key(&id) {
            let copy = self.base.as_ref()?.get(id)?.clone();
            self.shadows.insert(id, copy);
        }
        self.shadows.get_mut(&id)
    }

    /// Handle for a raw ID anywhere in the lineage.
    pub fn resolve_raw(&self, raw: u32) -> Option<ItemId> {
        if raw >= self.first_raw {
            let id = ItemId::new(raw, self.generation);
            return self.get(id).map(|_| id);
        }
        self.base.as_ref()?.resolve_raw(raw)
    }

    /// Every handle in the lineage, in raw-ID order.
    pub fn ids(&self) -> Vec<ItemId> {
        let mut ids = self.base.as_ref().map(|b| b.ids()).unwrap_or_default();
        ids.extend(self.items.iter().flatten().map(|i| i.id));
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &JavaItem> + '_ {
        self.ids().into_iter().filter_map(move |id| self.get(id))
    }

    pub(crate) fn allocate_id(&mut self) -> ItemId {
        ItemId::new(self.id_gen.next_id(), self.generation)
    }

    /// Places an item in its raw slot without registering it for lookup.
    pub(crate) fn store(&mut self, item: JavaItem) {
        let Some(slot) = self.slot(item.id) else {
            return;
        };
        if self.items.len() <= slot {
            self.items.resize_with(slot + 1, || None);
        }
        self.id_gen.reserve(item.id.raw());
        self.items[slot] = Some(item);
    }

    /// Inserts an item under a caller-chosen raw ID. Used when reading a
    /// snapshot; the item gets no parent and is not registered for lookup
    /// until [`JavaItemIndex::rebuild_lookup`] runs.
    pub fn insert_raw(&mut self, raw: u32, name: &str, kind: ItemKind) -> Result<ItemId> {
        if raw < self.first_raw {
            return Err(CoreError::State(format!(
                "raw id {raw} precedes first id {} of this index",
                self.first_raw
            )));
        }
        let id = ItemId::new(raw, self.generation);
        if self.get(id).is_some() {
            return Err(CoreError::State(format!("duplicate item id {raw}")));
        }
        self.store(JavaItem::new(id, name, kind, None));
        Ok(id)
    }

    /// Links `child` under `parent` in both directions.
    pub fn set_parent(&mut self, child: ItemId, parent: ItemId) -> Result<()> {
        if !self.contains(parent) {
            return Err(CoreError::State(format!("unknown parent {parent}")));
        }
        let item = self
            .get_mut(child)
            .ok_or_else(|| CoreError::State(format!("unknown child {child}")))?;
        match item.parent {
            Some(existing) if existing == parent => return Ok(()),
            Some(existing) => {
                return Err(CoreError::State(format!(
                    "{child} already belongs to {existing}"
                )));
            }
            None => item.parent = Some(parent),
        }
        if let Some(p) = self.get_mut(parent) {
            p.children.push(child);
        }
        Ok(())
    }

    pub(crate) fn register(&mut self, id: ItemId) {
        let Some(item) = self.get(id) else {
            return;
        };
        let key = (item.parent, item.kind, item.name.clone());
        let name_key = (item.kind, item.name.clone());
        self.lookup.entry(key).or_default().push(id);
        self.by_name.entry(name_key).or_default().push(id);
    }

    /// Recomputes the lookup tables from the items this index owns.
    pub fn rebuild_lookup(&mut self) {
        self.lookup.clear();
        self.by_name.clear();
        let own: Vec<ItemId> = self.items.iter().flatten().map(|i| i.id).collect();
        for id in own {
            self.register(id);
        }
    }

    /// First item registered under `(parent, name, kind)`, or `None`.
    pub fn find_item(&self, parent: Option<ItemId>, name: &str, kind: ItemKind) -> Option<ItemId> {
        let key = (parent, kind, SmolStr::new(name));
        if let Some(id) = self.lookup.get(&key).and_then(|ids| ids.first()) {
            return Some(*id);
        }
        self.base.as_ref()?.find_item(parent, name, kind)
    }

    /// All items under `(parent, name, kind)`; overloads share one key.
    pub fn find_all(&self, parent: Option<ItemId>, name: &str, kind: ItemKind) -> Vec<ItemId> {
        let mut out = self
            .base
            .as_ref()
            .map(|b| b.find_all(parent, name, kind))
            .unwrap_or_default();
        let key = (parent, kind, SmolStr::new(name));
        if let Some(ids) = self.lookup.get(&key) {
            for id in ids {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
        }
        out
    }

    /// All items of `kind` named `name`, regardless of parent.
    pub fn find_by_name(&self, kind: ItemKind, name: &str) -> Vec<ItemId> {
        let mut out = self
            .base
            .as_ref()
            .map(|b| b.find_by_name(kind, name))
            .unwrap_or_default();
        if let Some(ids) = self.by_name.get(&(kind, SmolStr::new(name))) {
            out.extend(ids.iter().copied());
        }
        out
    }

    pub fn items_of_kind(&self, kind: ItemKind) -> impl Iterator<Item = &JavaItem> + '_ {
        self.iter().filter(move |i| i.kind == kind)
    }

    /// Adds `from -> to` and its inverse. Returns `false` when either end is
    /// unknown or the edge already existed.
    pub fn add_dependency(&mut self, from: ItemId, to: ItemId) -> bool {
        if from == to || !self.contains(from) || !self.contains(to) {
            return false;
        }
        let added = match self.get_mut(from) {
            Some(item) => item.dependencies.insert(to),
            None => false,
        };
        if let Some(target) = self.get_mut(to) {
            target.incoming.insert(from);
        }
        added
    }

    pub fn remove_dependency(&mut self, from: ItemId, to: ItemId) -> bool {
        let removed = match self.get_mut(from) {
            Some(item) => item.dependencies.shift_remove(&to),
            None => false,
        };
        if let Some(target) = self.get_mut(to) {
            target.incoming.shift_remove(&from);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_shadows_base_items_under_the_same_handle() {
        let mut base = JavaItemIndex::new();
        let project = base.create_project("app");
        let base = Arc::new(base);

        let mut delta = JavaItemIndex::with_base(base.clone());
        assert_eq!(delta.find_item(None, "app", ItemKind::Project), Some(project));

        let pkg = delta.create_package(project, "com.acme").expect("package");
        assert!(pkg.raw() >= base.next_raw());
        assert_eq!(delta.get(project).map(|p| p.children().to_vec()), Some(vec![pkg]));
        assert!(base.get(project).is_some_and(|p| p.children().is_empty()));
        assert_eq!(delta.ids(), vec![project, pkg]);
    }

    #[test]
    fn foreign_generation_handles_miss() {
        let mut a = JavaItemIndex::new();
        let id = a.create_project("a");
        let mut b = JavaItemIndex::new();
        b.create_project("b");
        assert!(b.get(id).is_none());
        assert_eq!(b.resolve_raw(id.raw()).map(|h| h.generation()), Some(b.generation()));
    }

    #[test]
    fn dependency_edges_stay_inverse() {
        let mut index = JavaItemIndex::new();
        let p = index.create_project("p");
        let pkg = index.create_package(p, "x").expect("package");
        let a = index.create_class(pkg, "A").expect("class");
        let b = index.create_class(pkg, "B").expect("class");

        assert!(index.add_dependency(a, b));
        assert!(!index.add_dependency(a, b));
        assert!(index.get(b).is_some_and(|i| i.incoming().contains(&a)));

        assert!(index.remove_dependency(a, b));
        assert!(index.get(b).is_some_and(|i| i.incoming().is_empty()));
    }
}
