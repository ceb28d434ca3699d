//! Java front end: syntax trees, type and call resolution, and the
//! task-based workspace loader that fills the item index.

pub mod ast;
pub mod classfile;
pub mod classpath;
pub mod error;
pub mod load;
pub mod manifest;
pub mod resolve;

pub use ast::{Ast, AstId, AstKind, CompilationUnit, JavaParser};
pub use error::{JavaError, Result};
pub use load::{LoadOutcome, LoadReport, LoadStats, WorkspaceLoader};
