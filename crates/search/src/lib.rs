//! Structural search over Java sources.
//!
//! A [`SearchParam`] names the kind of node to look for and the filters it
//! must pass. Filters that need more than the syntax tree consult a
//! read-only [`cmtscope_core::JavaItemIndex`] built by the workspace loader.

mod context;
mod error;
mod files;
mod finder;
mod param;
mod result;
mod xml;

pub use context::SearchContext;
pub use error::{Result, SearchError};
pub use files::{java_sources, search_files};
pub use param::{CountOp, Filter, NameMatcher, ParamCount, SearchKind, SearchParam};
pub use result::{Capture, SearchResult};
