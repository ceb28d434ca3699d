//! `Class-Path` handling for `META-INF/MANIFEST.MF`.

/// One `Class-Path` entry reduced to the name of the project it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ManifestDependency {
    /// An archive, named after its file stem (`lib/a.jar` is `a`).
    Archive(String),
    /// A directory entry (ending in `/`), named after its last segment.
    Directory(String),
}

impl ManifestDependency {
    pub fn name(&self) -> &str {
        match self {
            ManifestDependency::Archive(name) | ManifestDependency::Directory(name) => name,
        }
    }
}

/// Joins continuation lines (a line break followed by one space).
fn unfold(manifest: &str) -> String {
    manifest
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace("\n ", "")
}

/// Raw `Class-Path` tokens. Tokens glued together without a separator
/// (`a.jarb.jar`, which wrapped manifests produce) are split apart.
pub fn class_path_tokens(manifest: &str) -> Vec<String> {
    let unfolded = unfold(manifest);
    let Some(value) = unfolded.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case("Class-Path").then_some(value)
    }) else {
        return Vec::new();
    };
    value.split_whitespace().flat_map(split_glued).collect()
}

fn split_glued(token: &str) -> Vec<String> {
    let lower = token.to_ascii_lowercase();
    let mut out = Vec::new();
    let mut start = 0;
    let mut from = 0;
    while let Some(pos) = [".jar", ".rar"]
        .iter()
        .filter_map(|ext| lower[from..].find(ext).map(|p| p + from))
        .min()
    {
        let end = pos + 4;
        if end < token.len() && !token[end..].starts_with('/') {
            out.push(token[start..end].to_string());
            start = end;
        }
        from = end;
    }
    if start < token.len() {
        out.push(token[start..].to_string());
    }
    out
}

/// Dependencies named by the manifest's `Class-Path`, in order, without
/// duplicates.
pub fn dependencies(manifest: &str) -> Vec<ManifestDependency> {
    let mut out: Vec<ManifestDependency> = Vec::new();
    for token in class_path_tokens(manifest) {
        let dependency = if token.ends_with('/') || token.ends_with('\\') {
            match token.split(['/', '\\']).rfind(|s| !s.is_empty() && *s != ".") {
                Some(last) => ManifestDependency::Directory(last.to_string()),
                None => continue,
            }
        } else {
            let file = token.rsplit(['/', '\\']).next().unwrap_or(&token);
            let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
            if stem.is_empty() {
                continue;
            }
            ManifestDependency::Archive(stem.to_string())
        };
        if !out.contains(&dependency) {
            out.push(dependency);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(manifest: &str) -> Vec<String> {
        dependencies(manifest)
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    #[test]
    fn continuation_lines_are_joined() {
        let manifest = "Manifest-Version: 1.0\nClass-Path: a.jar\n b.jar\nMain-Class: x.Y\n";
        assert_eq!(names(manifest), vec!["a", "b"]);
        assert_eq!(names("Class-Path: lib/a.jar\r\n  ../b.jar\r\n"), vec!["a", "b"]);
    }

    #[test]
    fn paths_are_reduced_to_names() {
        let deps = dependencies("Class-Path: lib/ext/commons-lang.jar classes/ ./conf/ x.rar\n");
        assert_eq!(
            deps,
            vec![
                ManifestDependency::Archive("commons-lang".to_string()),
                ManifestDependency::Directory("classes".to_string()),
                ManifestDependency::Directory("conf".to_string()),
                ManifestDependency::Archive("x".to_string()),
            ]
        );
    }

    #[test]
    fn glued_archive_names_are_split() {
        assert_eq!(
            class_path_tokens("Class-Path: lib/a.jarlib/b.JARc.rar\n"),
            vec!["lib/a.jar", "lib/b.JAR", "c.rar"]
        );
        assert!(class_path_tokens("Manifest-Version: 1.0\n").is_empty());
    }
}
