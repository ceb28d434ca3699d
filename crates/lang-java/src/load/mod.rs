//! Workspace loading as a graph of prioritized tasks.
//!
//! Discovery spawns one group per project or archive, which in turn spawns
//! one group per source file or class file. Every per-file group then runs
//! the same phases; phase priorities make all classes exist before any
//! supertype is resolved, and all methods exist before calls are linked.

mod binary;
mod context;
mod discover;
mod loader;
mod project;
mod source;

pub use context::{Dependency, LoadKey, LoadShared, LoadStats, LoadingContext, ProjectDir, SourceFile};
pub use discover::DiscoverTask;
pub use loader::{LoadOutcome, LoadReport, WorkspaceLoader};
pub use project::owning_project;

pub mod priority {
    use cmtscope_ingest::Priority;

    pub const DISCOVER: Priority = 1000;
    pub const PROJECT: Priority = 900;
    pub const PROJECT_DEPENDENCIES: Priority = 800;
    pub const PACKAGE: Priority = 700;
    pub const CLASS: Priority = 600;
    pub const CLASS_DEPENDENCIES: Priority = 500;
    pub const METHODS: Priority = 400;
    pub const PSEUDO_METHODS: Priority = 300;
    pub const METHOD_DEPENDENCIES: Priority = 200;
}
