//! Eclipse project metadata: `.project` and `.classpath`.

use crate::error::{JavaError, Result};
use roxmltree::Document;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EclipseClasspath {
    /// Source folders relative to the project directory.
    pub source_folders: Vec<String>,
    /// Names of workspace projects this one requires (`/other`).
    pub required_projects: Vec<String>,
}

fn parse<'a>(text: &'a str, file: &str) -> Result<Document<'a>> {
    Document::parse(text).map_err(|e| JavaError::Config(format!("{file}: {e}")))
}

/// Reads `.classpath`. `kind="src"` entries with relative paths are source
/// folders; those starting with `/` name required projects.
pub fn read_classpath(text: &str) -> Result<EclipseClasspath> {
    let doc = parse(text, ".classpath")?;
    let mut classpath = EclipseClasspath::default();
    let entries = doc
        .root_element()
        .children()
        .filter(|n| n.has_tag_name("classpathentry"))
        .filter(|n| n.attribute("kind") == Some("src"));
    for entry in entries {
        let Some(path) = entry.attribute("path").map(str::trim) else {
            continue;
        };
        match path.strip_prefix('/') {
            Some(project) if !project.is_empty() => {
                classpath.required_projects.push(project.to_string())
            }
            Some(_) => {}
            None if path.is_empty() => {}
            None => classpath.source_folders.push(path.to_string()),
        }
    }
    Ok(classpath)
}

/// The `<name>` of a `.project` description.
pub fn read_project_name(text: &str) -> Result<Option<String>> {
    let doc = parse(text, ".project")?;
    Ok(doc
        .root_element()
        .children()
        .find(|n| n.has_tag_name("name"))
        .and_then(|n| n.text())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_folders_and_required_projects() {
        let cp = read_classpath(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<classpath>
  <classpathentry kind="src" path="src/main/java"/>
  <classpathentry kind="src" path="/commons"/>
  <classpathentry kind="con" path="org.eclipse.jdt.launching.JRE_CONTAINER"/>
  <classpathentry kind="lib" path="lib/x.jar"/>
  <classpathentry kind="output" path="bin"/>
</classpath>"#,
        )
        .expect("classpath");
        assert_eq!(cp.source_folders, vec!["src/main/java"]);
        assert_eq!(cp.required_projects, vec!["commons"]);
    }

    #[test]
    fn project_name_is_trimmed() {
        let name = read_project_name(
            "<projectDescription>\n  <name> billing </name>\n  <comment/>\n</projectDescription>",
        )
        .expect("project");
        assert_eq!(name.as_deref(), Some("billing"));
        assert!(read_project_name("<projectDescription").is_err());
    }
}
