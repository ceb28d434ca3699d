//! The cross-reference item graph.
//!
//! Items (projects, packages, classes, methods, fields) live in a
//! [`JavaItemIndex`] arena and refer to each other through generation-checked
//! [`ItemId`] handles.

pub mod factory;
pub mod id;
pub mod index;
pub mod item;
pub mod prune;
pub mod util;

pub use factory::{BUILTIN_PROJECT, PRIMITIVES, WILDCARD};
pub use id::{IdGenerator, ItemId};
pub use index::JavaItemIndex;
pub use item::{AttrKey, AttrValue, ItemKind, JavaItem};
pub use prune::{PruneOutcome, prune};
pub use util::{MethodQuery, QueryType};
