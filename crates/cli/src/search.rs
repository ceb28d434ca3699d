use anyhow::Context;
use cmtscope_core::{ApiFileManager, JavaItemIndex, LoadConfig};
use cmtscope_java::{JavaParser, WorkspaceLoader};
use cmtscope_search::{SearchParam, SearchResult, java_sources, search_files};
use std::path::Path;
use tracing::info;

fn index_for(workspace: &Path, snapshot: Option<&Path>, config: &LoadConfig) -> anyhow::Result<JavaItemIndex> {
    match snapshot {
        Some(path) => ApiFileManager::read(path).with_context(|| format!("reading snapshot {}", path.display())),
        None => Ok(WorkspaceLoader::new(config.clone()).load(workspace)?.index),
    }
}

pub fn format_result(root: &Path, result: &SearchResult) -> String {
    let path = result.path.strip_prefix(root).unwrap_or(&result.path);
    let first_line = result.text.lines().next().unwrap_or_default();
    let mut line = format!("{}:{}: [{}] {}", path.display(), result.line, result.node_kind, first_line);
    for capture in &result.captures {
        let groups: Vec<&str> = capture.groups.iter().map(|g| g.as_deref().unwrap_or("-")).collect();
        line.push_str(&format!(" {{{} => {}}}", capture.text, groups.join(", ")));
    }
    line
}

pub fn run(workspace: &Path, query: &Path, snapshot: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(query).with_context(|| format!("reading query {}", query.display()))?;
    let param = SearchParam::from_xml(&text)?;
    let config = super::index::load_config(None, None, false)?;
    let index = index_for(workspace, snapshot, &config)?;

    let paths = java_sources(workspace);
    info!("Searching {} files...", paths.len());
    let results = search_files(&param, &index, &paths, &JavaParser::new(), &config.project_markers)?;
    info!("{} matches", results.len());

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            println!("{}", format_result(workspace, result));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmtscope_search::Capture;
    use std::path::PathBuf;

    #[test]
    fn results_print_relative_to_the_workspace() {
        let result = SearchResult {
            path: PathBuf::from("/ws/app/src/a/Main.java"),
            node: cmtscope_java::JavaParser::new()
                .parse("A.java", "class A {}")
                .expect("parse")
                .ast
                .root(),
            node_kind: "MethodDeclaration",
            start: 10,
            end: 40,
            line: 3,
            text: "String getName() {\n  return name;\n}".to_string(),
            captures: vec![Capture {
                pattern: "get(\\w+)".to_string(),
                text: "getName".to_string(),
                groups: vec![Some("Name".to_string())],
            }],
        };
        assert_eq!(
            format_result(Path::new("/ws"), &result),
            "app/src/a/Main.java:3: [MethodDeclaration] String getName() { {getName => Name}"
        );
    }
}
