//! Scope and type resolution against the item graph.
//!
//! [`TypeResolver`] turns type names written in one compilation unit into
//! class items, [`VariableVisitor`] tracks local bindings while walking the
//! unit and records every call site with its candidate owners, and
//! [`resolve_or_create`] links a call site to a method, synthesizing a pseudo
//! method when asked to.

mod calls;
mod scope;
mod types;
mod variables;

pub use calls::{CallTarget, resolve_call, resolve_or_create};
pub use scope::{Binding, Scope};
pub use types::{NameLookup, TypeResolver, TypeUse, declared_type, parameters};
pub use variables::{CallKind, CallSite, VariableVisitor};

/// Method name used for constructors.
pub const CONSTRUCTOR: &str = "<init>";
