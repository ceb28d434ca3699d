//! Lookup-or-create constructors. Every `create_*` returns the existing item
//! when one already matches `(parent, name, kind)`; methods additionally
//! compare their parameter signature.

use super::id::ItemId;
use super::index::JavaItemIndex;
use super::item::{ItemKind, JavaItem};
use super::util::params_match;
use crate::error::{CoreError, Result};

/// Project holding primitive types, `void` and the wildcard class.
pub const BUILTIN_PROJECT: &str = "$builtin";
/// Name of the class standing for "any type".
pub const WILDCARD: &str = "?";
pub const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

impl JavaItemIndex {
    /// Registers a new item without validating its parent.
    fn intern(&mut self, parent: Option<ItemId>, name: &str, kind: ItemKind) -> ItemId {
        if let Some(existing) = self.find_item(parent, name, kind) {
            return existing;
        }
        self.insert_new(parent, name, kind)
    }

    fn insert_new(&mut self, parent: Option<ItemId>, name: &str, kind: ItemKind) -> ItemId {
        let id = self.allocate_id();
        self.store(JavaItem::new(id, name, kind, parent));
        if let Some(parent) = parent {
            if let Some(p) = self.get_mut(parent) {
                p.children.push(id);
            }
        }
        self.register(id);
        id
    }

    fn check_parent(&self, parent: ItemId, kind: ItemKind, name: &str) -> Result<()> {
        let item = self
            .get(parent)
            .ok_or_else(|| CoreError::InvalidArgument(format!("unknown parent {parent}")))?;
        if !item.kind().can_contain(kind) {
            return Err(CoreError::InvalidArgument(format!(
                "{} {} cannot contain {} {name}",
                item.kind().as_str(),
                item.name(),
                kind.as_str()
            )));
        }
        if name.is_empty() && kind != ItemKind::Package {
            return Err(CoreError::InvalidArgument(format!(
                "empty {} name",
                kind.as_str()
            )));
        }
        Ok(())
    }

    pub fn create_project(&mut self, name: &str) -> ItemId {
        self.intern(None, name, ItemKind::Project)
    }

    /// `name` is the full dotted package name; `""` is the unnamed package.
    pub fn create_package(&mut self, project: ItemId, name: &str) -> Result<ItemId> {
        self.check_parent(project, ItemKind::Package, name)?;
        Ok(self.intern(Some(project), name, ItemKind::Package))
    }

    /// `name` is the nested class name relative to the package (`Outer.Inner`).
    pub fn create_class(&mut self, package: ItemId, name: &str) -> Result<ItemId> {
        self.check_parent(package, ItemKind::Class, name)?;
        Ok(self.intern(Some(package), name, ItemKind::Class))
    }

    /// Creates `Outer.simple` in the outer class's package and links both
    /// directions of the nesting.
    pub fn create_inner_class(&mut self, outer: ItemId, simple: &str) -> Result<ItemId> {
        let (package, outer_name) = match self.get(outer) {
            Some(item) if item.kind() == ItemKind::Class => (item.parent(), item.name().to_string()),
            _ => {
                return Err(CoreError::InvalidArgument(format!(
                    "{outer} is not a class"
                )));
            }
        };
        let package = package
            .ok_or_else(|| CoreError::InvalidArgument(format!("class {outer_name} has no package")))?;
        let inner = self.create_class(package, &format!("{outer_name}.{simple}"))?;
        if let Some(item) = self.get_mut(inner) {
            item.set_outer_class(outer);
        }
        if let Some(item) = self.get_mut(outer) {
            item.add_inner_class(inner);
        }
        Ok(inner)
    }

    /// Finds a method of `class` whose signature matches `params`, creating it
    /// otherwise. `None` leaves the signature unrecorded.
    pub fn create_method(
        &mut self,
        class: ItemId,
        name: &str,
        params: Option<Vec<ItemId>>,
    ) -> Result<ItemId> {
        self.check_parent(class, ItemKind::Method, name)?;
        for candidate in self.find_all(Some(class), name, ItemKind::Method) {
            let existing = self.get(candidate).and_then(|m| m.param_types());
            if params_match(self, existing, params.as_deref()) {
                return Ok(candidate);
            }
        }
        let id = self.insert_new(Some(class), name, ItemKind::Method);
        if let (Some(params), Some(item)) = (params, self.get_mut(id)) {
            item.set_param_types(params);
        }
        Ok(id)
    }

    pub fn create_field(&mut self, class: ItemId, name: &str) -> Result<ItemId> {
        self.check_parent(class, ItemKind::Field, name)?;
        Ok(self.intern(Some(class), name, ItemKind::Field))
    }

    /// Array class of `dims` dimensions over `base`, stored beside the base in
    /// its package. Array bases are unwrapped first, so `int[]` with one more
    /// dimension yields `int[][]`.
    pub fn create_array_class(&mut self, base: ItemId, dims: usize) -> Result<ItemId> {
        let (mut root, mut total) = (base, dims);
        if let Some(item) = self.get(base) {
            if let Some(inner) = item.array_base() {
                total += item.array_dimensions();
                root = inner;
            }
        }
        if total == 0 {
            return Ok(root);
        }
        let (package, name) = match self.get(root) {
            Some(item) if item.kind() == ItemKind::Class => (item.parent(), item.name().to_string()),
            _ => {
                return Err(CoreError::InvalidArgument(format!(
                    "array base {root} is not a class"
                )));
            }
        };
        let package = package
            .ok_or_else(|| CoreError::InvalidArgument(format!("class {name} has no package")))?;
        let array = self.create_class(package, &format!("{name}{}", "[]".repeat(total)))?;
        if let Some(item) = self.get_mut(array) {
            item.set_array_base(root);
        }
        Ok(array)
    }

    pub fn builtin_project(&mut self) -> ItemId {
        self.create_project(BUILTIN_PROJECT)
    }

    fn builtin_package(&mut self) -> ItemId {
        let project = self.builtin_project();
        self.intern(Some(project), "", ItemKind::Package)
    }

    pub fn primitive(&mut self, name: &str) -> Result<ItemId> {
        if !PRIMITIVES.contains(&name) {
            return Err(CoreError::InvalidArgument(format!("{name} is not a primitive type")));
        }
        let package = self.builtin_package();
        Ok(self.intern(Some(package), name, ItemKind::Class))
    }

    /// The wildcard class, created on first use.
    pub fn wildcard(&mut self) -> ItemId {
        let package = self.builtin_package();
        self.intern(Some(package), WILDCARD, ItemKind::Class)
    }

    fn find_builtin_class(&self, name: &str) -> Option<ItemId> {
        let project = self.find_item(None, BUILTIN_PROJECT, ItemKind::Project)?;
        let package = self.find_item(Some(project), "", ItemKind::Package)?;
        self.find_item(Some(package), name, ItemKind::Class)
    }

    pub fn find_wildcard(&self) -> Option<ItemId> {
        self.find_builtin_class(WILDCARD)
    }

    pub fn find_primitive(&self, name: &str) -> Option<ItemId> {
        if PRIMITIVES.contains(&name) {
            self.find_builtin_class(name)
        } else {
            None
        }
    }
}
