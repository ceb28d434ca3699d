use cmtscope_java::AstId;
use serde::Serialize;
use std::path::PathBuf;

/// Groups of one regex name match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capture {
    pub pattern: String,
    /// The whole matched name.
    pub text: String,
    /// Capture groups 1.., `None` for groups that did not take part.
    pub groups: Vec<Option<String>>,
}

/// One matched node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub path: PathBuf,
    #[serde(skip)]
    pub node: AstId,
    pub node_kind: &'static str,
    /// Byte range of the node.
    pub start: usize,
    pub end: usize,
    /// 1-based line of `start`.
    pub line: usize,
    pub text: String,
    pub captures: Vec<Capture>,
}
