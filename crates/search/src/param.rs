//! The query tree: a search param per node kind, constrained by filters.

use crate::error::{Result, SearchError};
use regex::Regex;
use std::fmt;
use std::path::Path;

/// A literal name or a regular expression that must match the whole name.
#[derive(Debug, Clone)]
pub enum NameMatcher {
    Literal(String),
    Regex { pattern: String, regex: Regex },
}

impl NameMatcher {
    pub fn literal(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SearchError::InvalidArgument("name must not be empty".to_string()));
        }
        Ok(NameMatcher::Literal(name))
    }

    pub fn regex(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(SearchError::InvalidArgument("regex must not be empty".to_string()));
        }
        let regex = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(NameMatcher::Regex { pattern, regex })
    }

    pub fn pattern(&self) -> &str {
        match self {
            NameMatcher::Literal(name) => name,
            NameMatcher::Regex { pattern, .. } => pattern,
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, NameMatcher::Regex { .. })
    }
}

impl PartialEq for NameMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.is_regex() == other.is_regex() && self.pattern() == other.pattern()
    }
}

impl Eq for NameMatcher {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountOp {
    Eq,
    Le,
    Ge,
}

/// Parameter-count constraint written as `=N`, `<=N` or `>=N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamCount {
    pub op: CountOp,
    pub count: usize,
}

impl ParamCount {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (op, digits) = if let Some(rest) = text.strip_prefix("<=") {
            (CountOp::Le, rest)
        } else if let Some(rest) = text.strip_prefix(">=") {
            (CountOp::Ge, rest)
        } else if let Some(rest) = text.strip_prefix('=') {
            (CountOp::Eq, rest)
        } else {
            return Err(SearchError::InvalidArgument(format!("bad parameter count '{text}'")));
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SearchError::InvalidArgument(format!("bad parameter count '{text}'")));
        }
        let count = digits
            .parse()
            .map_err(|_| SearchError::InvalidArgument(format!("bad parameter count '{text}'")))?;
        Ok(Self { op, count })
    }

    pub fn accepts(&self, n: usize) -> bool {
        match self.op {
            CountOp::Eq => n == self.count,
            CountOp::Le => n <= self.count,
            CountOp::Ge => n >= self.count,
        }
    }
}

impl fmt::Display for ParamCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            CountOp::Eq => "=",
            CountOp::Le => "<=",
            CountOp::Ge => ">=",
        };
        write!(f, "{op}{}", self.count)
    }
}

/// A constraint on a candidate node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Simple name of a method, or the qualified name of a class.
    Name(NameMatcher),
    /// Qualified name of the candidate's class.
    ClassName(NameMatcher),
    HasParam(ParamCount),
    /// Some proper ancestor of the candidate's class satisfies every
    /// sub-filter.
    HasSupertype(Vec<Filter>),
    /// The candidate is written in an `extends` or `implements` clause.
    IsSupertype,
    /// The nearest enclosing method declaration satisfies every sub-filter.
    IsInMethod(Vec<Filter>),
    /// Holds unless every sub-filter holds.
    Not(Vec<Filter>),
    And(Vec<Filter>),
}

fn non_empty(what: &str, filters: Vec<Filter>) -> Result<Vec<Filter>> {
    if filters.is_empty() {
        Err(SearchError::InvalidArgument(format!("{what} needs at least one filter")))
    } else {
        Ok(filters)
    }
}

impl Filter {
    pub fn has_supertype(filters: Vec<Filter>) -> Result<Self> {
        Ok(Filter::HasSupertype(non_empty("hassupertype", filters)?))
    }

    pub fn is_in_method(filters: Vec<Filter>) -> Result<Self> {
        Ok(Filter::IsInMethod(non_empty("isinmethod", filters)?))
    }

    pub fn not(filters: Vec<Filter>) -> Result<Self> {
        Ok(Filter::Not(non_empty("not", filters)?))
    }

    pub fn and(filters: Vec<Filter>) -> Result<Self> {
        Ok(Filter::And(non_empty("and", filters)?))
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Filter::Name(_) => "name",
            Filter::ClassName(_) => "classname",
            Filter::HasParam(_) => "hasparam",
            Filter::HasSupertype(_) => "hassupertype",
            Filter::IsSupertype => "issupertype",
            Filter::IsInMethod(_) => "isinmethod",
            Filter::Not(_) => "not",
            Filter::And(_) => "and",
        }
    }

    pub fn sub_filters(&self) -> &[Filter] {
        match self {
            Filter::HasSupertype(f) | Filter::IsInMethod(f) | Filter::Not(f) | Filter::And(f) => f,
            _ => &[],
        }
    }

    /// Evaluation rank for method references: cheap syntactic checks run
    /// before anything that needs the item graph.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Filter::HasParam(_) => 0,
            Filter::Name(_) => 1,
            Filter::ClassName(_) => 2,
            Filter::HasSupertype(_) => 3,
            _ => 4,
        }
    }

    pub fn applies_to(&self, path: &Path) -> bool {
        self.sub_filters().iter().all(|f| f.applies_to(path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    ClassDecl,
    ClassRef,
    MethodDecl,
    MethodRef,
}

impl SearchKind {
    pub fn tag(self) -> &'static str {
        match self {
            SearchKind::ClassDecl => "classdecl",
            SearchKind::ClassRef => "classref",
            SearchKind::MethodDecl => "methoddecl",
            SearchKind::MethodRef => "methodref",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "classdecl" => Some(SearchKind::ClassDecl),
            "classref" => Some(SearchKind::ClassRef),
            "methoddecl" => Some(SearchKind::MethodDecl),
            "methodref" => Some(SearchKind::MethodRef),
            _ => None,
        }
    }
}

/// Root of a query: which nodes to look at and the filters they must pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParam {
    kind: SearchKind,
    filters: Vec<Filter>,
}

impl SearchParam {
    pub fn new(kind: SearchKind, filters: Vec<Filter>) -> Result<Self> {
        Ok(Self {
            kind,
            filters: non_empty(kind.tag(), filters)?,
        })
    }

    pub fn kind(&self) -> SearchKind {
        self.kind
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Only Java sources are searched, and every filter may veto a file.
    pub fn applies_to(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e == "java") && self.filters.iter().all(|f| f.applies_to(path))
    }

    /// Filters in the order they are evaluated.
    pub(crate) fn ordered_filters(&self) -> Vec<&Filter> {
        let mut filters: Vec<&Filter> = self.filters.iter().collect();
        if self.kind == SearchKind::MethodRef {
            filters.sort_by_key(|f| f.rank());
        }
        filters
    }
}
