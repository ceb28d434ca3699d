use super::id::ItemId;
use super::index::JavaItemIndex;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;

/// Item type. Declaration order is the containment order: a child's kind is
/// always greater than its parent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    Project,
    Package,
    Class,
    Method,
    Field,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Project => "PROJECT",
            ItemKind::Package => "PACKAGE",
            ItemKind::Class => "CLASS",
            ItemKind::Method => "METHOD",
            ItemKind::Field => "FIELD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PROJECT" => Some(ItemKind::Project),
            "PACKAGE" => Some(ItemKind::Package),
            "CLASS" => Some(ItemKind::Class),
            "METHOD" => Some(ItemKind::Method),
            "FIELD" => Some(ItemKind::Field),
            _ => None,
        }
    }

    /// Whether an item of this kind may own an item of kind `child`.
    pub fn can_contain(self, child: ItemKind) -> bool {
        match self {
            ItemKind::Project => child == ItemKind::Package,
            ItemKind::Package => child == ItemKind::Class,
            ItemKind::Class => matches!(child, ItemKind::Method | ItemKind::Field),
            ItemKind::Method | ItemKind::Field => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrKey {
    Superclass,
    Superinterfaces,
    ReturnType,
    ParamTypes,
    FieldType,
    ThrownTypes,
    InnerClasses,
    OuterClass,
    ArrayBase,
    Binary,
    ThirdParty,
    ProjectVisible,
    Pseudo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Id(ItemId),
    Ids(Vec<ItemId>),
    Flag(bool),
}

#[derive(Debug, Clone)]
pub struct JavaItem {
    pub(crate) id: ItemId,
    pub(crate) name: SmolStr,
    pub(crate) kind: ItemKind,
    pub(crate) parent: Option<ItemId>,
    pub(crate) children: Vec<ItemId>,
    pub(crate) dependencies: IndexSet<ItemId>,
    pub(crate) incoming: IndexSet<ItemId>,
    pub(crate) attributes: BTreeMap<AttrKey, AttrValue>,
}

impl JavaItem {
    pub(crate) fn new(id: ItemId, name: &str, kind: ItemKind, parent: Option<ItemId>) -> Self {
        Self {
            id,
            name: SmolStr::new(name),
            kind,
            parent,
            children: Vec::new(),
            dependencies: IndexSet::new(),
            incoming: IndexSet::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    pub fn dependencies(&self) -> &IndexSet<ItemId> {
        &self.dependencies
    }

    pub fn incoming(&self) -> &IndexSet<ItemId> {
        &self.incoming
    }

    pub fn attributes(&self) -> &BTreeMap<AttrKey, AttrValue> {
        &self.attributes
    }

    fn id_attr(&self, key: AttrKey) -> Option<ItemId> {
        match self.attributes.get(&key) {
            Some(AttrValue::Id(id)) => Some(*id),
            _ => None,
        }
    }

    fn ids_attr(&self, key: AttrKey) -> Option<&[ItemId]> {
        match self.attributes.get(&key) {
            Some(AttrValue::Ids(ids)) => Some(ids),
            _ => None,
        }
    }

    pub fn flag(&self, key: AttrKey) -> bool {
        matches!(self.attributes.get(&key), Some(AttrValue::Flag(true)))
    }

    pub fn set_flag(&mut self, key: AttrKey, value: bool) {
        self.attributes.insert(key, AttrValue::Flag(value));
    }

    pub fn superclass(&self) -> Option<ItemId> {
        self.id_attr(AttrKey::Superclass)
    }

    pub fn set_superclass(&mut self, id: ItemId) {
        self.attributes.insert(AttrKey::Superclass, AttrValue::Id(id));
    }

    pub fn superinterfaces(&self) -> &[ItemId] {
        self.ids_attr(AttrKey::Superinterfaces).unwrap_or(&[])
    }

    pub fn add_superinterface(&mut self, id: ItemId) {
        self.push_unique(AttrKey::Superinterfaces, id);
    }

    pub fn return_type(&self) -> Option<ItemId> {
        self.id_attr(AttrKey::ReturnType)
    }

    pub fn set_return_type(&mut self, id: ItemId) {
        self.attributes.insert(AttrKey::ReturnType, AttrValue::Id(id));
    }

    /// `None` when the signature was never recorded; callers treat it like an
    /// empty list.
    pub fn param_types(&self) -> Option<&[ItemId]> {
        self.ids_attr(AttrKey::ParamTypes)
    }

    pub fn set_param_types(&mut self, params: Vec<ItemId>) {
        self.attributes
            .insert(AttrKey::ParamTypes, AttrValue::Ids(params));
    }

    pub(crate) fn push_param_type(&mut self, id: ItemId) {
        match self.attributes.get_mut(&AttrKey::ParamTypes) {
            Some(AttrValue::Ids(ids)) => ids.push(id),
            _ => {
                self.attributes
                    .insert(AttrKey::ParamTypes, AttrValue::Ids(vec![id]));
            }
        }
    }

    pub fn field_type(&self) -> Option<ItemId> {
        self.id_attr(AttrKey::FieldType)
    }

    pub fn set_field_type(&mut self, id: ItemId) {
        self.attributes.insert(AttrKey::FieldType, AttrValue::Id(id));
    }

    pub fn thrown_types(&self) -> &[ItemId] {
        self.ids_attr(AttrKey::ThrownTypes).unwrap_or(&[])
    }

    pub fn add_thrown_type(&mut self, id: ItemId) {
        self.push_unique(AttrKey::ThrownTypes, id);
    }

    pub fn inner_classes(&self) -> &[ItemId] {
        self.ids_attr(AttrKey::InnerClasses).unwrap_or(&[])
    }

    pub fn add_inner_class(&mut self, id: ItemId) {
        self.push_unique(AttrKey::InnerClasses, id);
    }

    pub fn outer_class(&self) -> Option<ItemId> {
        self.id_attr(AttrKey::OuterClass)
    }

    pub fn set_outer_class(&mut self, id: ItemId) {
        self.attributes.insert(AttrKey::OuterClass, AttrValue::Id(id));
    }

    pub fn array_base(&self) -> Option<ItemId> {
        self.id_attr(AttrKey::ArrayBase)
    }

    pub fn set_array_base(&mut self, id: ItemId) {
        self.attributes.insert(AttrKey::ArrayBase, AttrValue::Id(id));
    }

    /// Number of `[]` suffixes on an array class name.
    pub fn array_dimensions(&self) -> usize {
        let mut name = self.name.as_str();
        let mut dims = 0;
        while let Some(rest) = name.strip_suffix("[]") {
            dims += 1;
            name = rest;
        }
        dims
    }

    pub fn is_binary(&self) -> bool {
        self.flag(AttrKey::Binary)
    }

    pub fn is_third_party(&self) -> bool {
        self.flag(AttrKey::ThirdParty)
    }

    pub fn is_project_visible(&self) -> bool {
        self.flag(AttrKey::ProjectVisible)
    }

    pub fn is_pseudo(&self) -> bool {
        self.flag(AttrKey::Pseudo)
    }

    fn push_unique(&mut self, key: AttrKey, id: ItemId) {
        match self.attributes.get_mut(&key) {
            Some(AttrValue::Ids(ids)) => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            _ => {
                self.attributes.insert(key, AttrValue::Ids(vec![id]));
            }
        }
    }

    /// Every ID held in the attribute map.
    pub fn attribute_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.attributes.values().flat_map(|v| match v {
            AttrValue::Id(id) => std::slice::from_ref(id).iter().copied(),
            AttrValue::Ids(ids) => ids.iter().copied(),
            AttrValue::Flag(_) => [].iter().copied(),
        })
    }

    /// Every ID this item refers to, structural edges included.
    pub fn referenced_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.parent
            .iter()
            .copied()
            .chain(self.children.iter().copied())
            .chain(self.dependencies.iter().copied())
            .chain(self.incoming.iter().copied())
            .chain(self.attribute_ids())
    }

    /// Registers a copy of this item in `target` under a fresh ID. References
    /// still hold the old IDs until [`JavaItem::remap`] runs on the copy.
    pub fn copy_to(&self, target: &mut JavaItemIndex) -> ItemId {
        let mut copy = self.clone();
        copy.id = target.allocate_id();
        let id = copy.id;
        target.store(copy);
        id
    }

    /// Rewrites every ID through `map`, dropping references `map` rejects.
    pub fn remap(&mut self, map: impl Fn(ItemId) -> Option<ItemId>) {
        self.parent = self.parent.and_then(&map);
        self.children = self.children.iter().filter_map(|id| map(*id)).collect();
        self.dependencies = self.dependencies.iter().filter_map(|id| map(*id)).collect();
        self.incoming = self.incoming.iter().filter_map(|id| map(*id)).collect();

        let mut dropped = Vec::new();
        for (key, value) in self.attributes.iter_mut() {
            match value {
                AttrValue::Id(id) => match map(*id) {
                    Some(new) => *id = new,
                    None => dropped.push(*key),
                },
                AttrValue::Ids(ids) => {
                    *ids = ids.iter().filter_map(|id| map(*id)).collect();
                }
                AttrValue::Flag(_) => {}
            }
        }
        for key in dropped {
            self.attributes.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_drops_unknown_targets() {
        let a = ItemId::new(1, 7);
        let b = ItemId::new(2, 7);
        let gone = ItemId::new(3, 7);
        let mut item = JavaItem::new(ItemId::new(4, 7), "m", ItemKind::Method, Some(a));
        item.dependencies.insert(b);
        item.dependencies.insert(gone);
        item.set_return_type(gone);
        item.set_param_types(vec![b, gone, b]);

        item.remap(|id| {
            if id == gone {
                None
            } else {
                Some(ItemId::new(id.raw() + 10, 8))
            }
        });

        assert_eq!(item.parent(), Some(ItemId::new(11, 8)));
        assert_eq!(
            item.dependencies().iter().copied().collect::<Vec<_>>(),
            vec![ItemId::new(12, 8)]
        );
        assert_eq!(item.return_type(), None);
        assert_eq!(
            item.param_types(),
            Some(&[ItemId::new(12, 8), ItemId::new(12, 8)][..])
        );
    }

    #[test]
    fn array_dimensions_count_suffixes() {
        let item = JavaItem::new(ItemId::new(1, 1), "String[][]", ItemKind::Class, None);
        assert_eq!(item.array_dimensions(), 2);
    }
}
