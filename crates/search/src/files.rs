use crate::context::SearchContext;
use crate::error::Result;
use crate::param::SearchParam;
use crate::result::SearchResult;
use cmtscope_core::JavaItemIndex;
use cmtscope_java::JavaParser;
use cmtscope_java::load::owning_project;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Runs a query over many files in parallel against one read-only index.
///
/// Results are grouped by file in the order the paths were given, and in
/// source order within a file. Files the query does not apply to are
/// skipped, and so are files that fail to parse. Each file is resolved
/// against the project whose `project_markers` file sits closest above it.
pub fn search_files(
    param: &SearchParam,
    index: &JavaItemIndex,
    paths: &[PathBuf],
    parser: &JavaParser,
    project_markers: &[String],
) -> Result<Vec<SearchResult>> {
    let per_file: Vec<Vec<SearchResult>> = paths
        .par_iter()
        .filter(|path| param.applies_to(path))
        .map(|path| search_file(param, index, path, parser, project_markers))
        .collect::<Result<_>>()?;
    Ok(per_file.into_iter().flatten().collect())
}

fn search_file(
    param: &SearchParam,
    index: &JavaItemIndex,
    path: &Path,
    parser: &JavaParser,
    project_markers: &[String],
) -> Result<Vec<SearchResult>> {
    let text = fs::read_to_string(path)?;
    let unit = match parser.parse(path, &text) {
        Ok(unit) if !unit.has_errors => unit,
        Ok(_) => {
            warn!(path = %path.display(), "skipping file with syntax errors");
            return Ok(Vec::new());
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unparsable file");
            return Ok(Vec::new());
        }
    };
    let project = owning_project(index, path, project_markers);
    let cx = SearchContext::for_project(index, &unit, project);
    let results = param.find_all(&cx);
    debug!(path = %path.display(), matches = results.len(), "searched");
    Ok(results)
}

/// Every `.java` file below `root`, sorted by path.
pub fn java_sources(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|x| x == "java"))
        .map(|e| e.into_path())
        .collect();
    paths.sort();
    paths
}
