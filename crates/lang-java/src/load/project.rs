use super::binary::BinaryPackageTask;
use super::context::{Dependency, LoadKey, LoadingContext, SourceFile};
use super::priority;
use super::source::source_chain;
use crate::classfile::{is_anonymous, read_class};
use crate::classpath::{EclipseClasspath, read_classpath, read_project_name};
use crate::manifest::{self, ManifestDependency};
use cmtscope_core::{AttrKey, ItemId, ItemKind, JavaItemIndex, LoadConfig};
use cmtscope_ingest::{BoxError, Spawner, Task};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

const MANIFEST: &str = "META-INF/MANIFEST.MF";

fn eclipse_classpath(dir: &Path) -> Option<EclipseClasspath> {
    let path = dir.join(".classpath");
    let text = std::fs::read_to_string(&path).ok()?;
    match read_classpath(&text) {
        Ok(classpath) => Some(classpath),
        Err(err) => {
            warn!(path = %path.display(), "ignoring unreadable .classpath: {err}");
            None
        }
    }
}

/// Source folders of a project: `.classpath` entries, or the configured
/// fallback names that exist on disk.
pub(crate) fn source_folders(dir: &Path, config: &LoadConfig) -> Vec<String> {
    if let Some(classpath) = eclipse_classpath(dir) {
        if !classpath.source_folders.is_empty() {
            return classpath.source_folders;
        }
    }
    config
        .source_folders
        .iter()
        .filter(|f| dir.join(f).is_dir())
        .cloned()
        .collect()
}

fn project_name(dir: &Path) -> String {
    let declared = std::fs::read_to_string(dir.join(".project"))
        .ok()
        .and_then(|text| match read_project_name(&text) {
            Ok(name) => name,
            Err(err) => {
                warn!(dir = %dir.display(), "ignoring unreadable .project: {err}");
                None
            }
        });
    declared.unwrap_or_else(|| {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string())
    })
}

/// Project item of the nearest directory above `path` that holds one of
/// `markers`, looked up by the name loading gave it.
pub fn owning_project(index: &JavaItemIndex, path: &Path, markers: &[String]) -> Option<ItemId> {
    let dir = path
        .ancestors()
        .find(|dir| markers.iter().any(|m| dir.join(m).is_file()))?;
    index.find_item(None, &project_name(dir), ItemKind::Project)
}

/// Reads one archive entry in full. Checksum and decompression failures
/// surface here rather than when the entry is opened.
fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> zip::result::ZipResult<Vec<u8>> {
    let mut entry = archive.by_name(name)?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Dotted package name of `file` relative to `root`.
fn package_hint(root: &Path, file: &Path) -> Option<String> {
    let relative = file.parent()?.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("."))
}

/// Registers an Eclipse-style project and fans out one group per source
/// file.
pub struct ProjectTask;

impl Task<LoadingContext> for ProjectTask {
    fn name(&self) -> String {
        "load project".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::ProjectDir]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Project]
    }

    fn run(&mut self, ctx: &mut LoadingContext, spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let Some(dir) = ctx.project_dir.as_ref().map(|d| d.path.clone()) else {
            return Ok(());
        };
        let shared = ctx.shared.clone();
        let name = project_name(&dir);
        let folders = source_folders(&dir, &shared.config);

        let mut dependencies: Vec<Dependency> = eclipse_classpath(&dir)
            .map(|cp| cp.required_projects)
            .unwrap_or_default()
            .into_iter()
            .map(Dependency::Project)
            .collect();
        let manifests = std::iter::once(dir.join(MANIFEST))
            .chain(folders.iter().map(|f| dir.join(f).join(MANIFEST)));
        for path in manifests {
            if let Ok(text) = std::fs::read_to_string(&path) {
                dependencies.extend(manifest::dependencies(&text).into_iter().map(Dependency::Manifest));
            }
        }

        let project = {
            let mut index = shared.write()?;
            let project = index.create_project(&name);
            if shared.matches_third_party(&name) {
                if let Some(item) = index.get_mut(project) {
                    item.set_flag(AttrKey::ThirdParty, true);
                }
            }
            project
        };
        shared.count(|s| s.projects += 1);
        info!(project = %name, dir = %dir.display(), folders = ?folders, "loading project");

        ctx.project = Some(project);
        ctx.dependencies = dependencies;
        spawner.spawn_here(priority::PROJECT_DEPENDENCIES, ProjectDepsTask);

        for folder in &folders {
            let root = dir.join(folder);
            let files = WalkDir::new(&root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().is_some_and(|x| x == "java"));
            for entry in files {
                let path = entry.path().to_path_buf();
                let mut child = ctx.child();
                child.project = Some(project);
                child.source = Some(SourceFile {
                    package_hint: package_hint(&root, &path),
                    path,
                });
                spawner.spawn_new(priority::PACKAGE, source_chain(), child);
            }
        }
        Ok(())
    }
}

/// Links a project to the projects it declares as dependencies. Binds
/// `DependenciesLoaded` only when every dependency resolved.
pub struct ProjectDepsTask;

impl Task<LoadingContext> for ProjectDepsTask {
    fn name(&self) -> String {
        "load project dependencies".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Project]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::DependenciesLoaded]
    }

    fn run(&mut self, ctx: &mut LoadingContext, _spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let Some(project) = ctx.project else {
            return Ok(());
        };
        let mut missing: Vec<String> = Vec::new();
        let project_name = {
            let mut index = ctx.shared.write()?;
            for dependency in &ctx.dependencies {
                let (name, target) = match dependency {
                    Dependency::Project(name) | Dependency::Manifest(ManifestDependency::Archive(name)) => {
                        (name, index.find_item(None, name, ItemKind::Project))
                    }
                    Dependency::Manifest(ManifestDependency::Directory(name)) => {
                        let pseudo = index.create_project(name);
                        if let Some(item) = index.get_mut(pseudo) {
                            item.set_flag(AttrKey::ThirdParty, true);
                            item.set_flag(AttrKey::Pseudo, true);
                        }
                        (name, Some(pseudo))
                    }
                };
                match target {
                    Some(target) => {
                        index.add_dependency(project, target);
                    }
                    None => missing.push(name.clone()),
                }
            }
            index.get(project).map(|p| p.name().to_string()).unwrap_or_default()
        };

        if missing.is_empty() {
            ctx.dependencies_loaded = true;
        } else {
            warn!(project = %project_name, missing = ?missing, "project dependencies not found");
            ctx.shared.count(|s| s.unresolved_dependencies += missing.len());
        }
        Ok(())
    }
}

/// Registers a JAR/RAR archive as a project and schedules its dependency
/// check and entry loading.
pub struct ArchiveProjectTask;

impl Task<LoadingContext> for ArchiveProjectTask {
    fn name(&self) -> String {
        "load archive project".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Archive]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Project]
    }

    fn run(&mut self, ctx: &mut LoadingContext, spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let Some(path) = ctx.archive.clone() else {
            return Ok(());
        };
        let shared = ctx.shared.clone();
        let mut archive = match File::open(&path).map_err(zip::result::ZipError::from).and_then(ZipArchive::new) {
            Ok(archive) => archive,
            Err(err) => {
                warn!(archive = %path.display(), "skipping unreadable archive: {err}");
                shared.count(|s| s.skipped_files += 1);
                return Ok(());
            }
        };
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut manifest_text = String::new();
        if let Ok(mut entry) = archive.by_name(MANIFEST) {
            if let Err(err) = entry.read_to_string(&mut manifest_text) {
                warn!(archive = %path.display(), "unreadable manifest: {err}");
                manifest_text.clear();
            }
        }

        let project = {
            let mut index = shared.write()?;
            let project = index.create_project(&name);
            if shared.config.jars_are_third_party || shared.matches_third_party(&name) {
                if let Some(item) = index.get_mut(project) {
                    item.set_flag(AttrKey::ThirdParty, true);
                }
            }
            project
        };
        shared.count(|s| {
            s.projects += 1;
            s.archives += 1;
        });
        debug!(archive = %path.display(), project = %name, "loading archive");

        ctx.project = Some(project);
        ctx.dependencies = manifest::dependencies(&manifest_text)
            .into_iter()
            .map(Dependency::Manifest)
            .collect();
        spawner.spawn_here(priority::PROJECT_DEPENDENCIES, ProjectDepsTask);
        spawner.spawn_here(
            priority::PACKAGE,
            ArchiveEntriesTask {
                gated: shared.config.require_jar_dependencies,
            },
        );
        Ok(())
    }
}

/// Reads the entries of an archive and fans out one group per class file,
/// plus one per source entry that has no compiled counterpart.
pub struct ArchiveEntriesTask {
    /// Wait for `DependenciesLoaded`; an archive whose dependencies never
    /// resolve is left unloaded.
    pub gated: bool,
}

impl Task<LoadingContext> for ArchiveEntriesTask {
    fn name(&self) -> String {
        "load archive entries".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        if self.gated {
            vec![LoadKey::Project, LoadKey::DependenciesLoaded]
        } else {
            vec![LoadKey::Project]
        }
    }

    fn run(&mut self, ctx: &mut LoadingContext, spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let (Some(path), Some(project)) = (ctx.archive.clone(), ctx.project) else {
            return Ok(());
        };
        let mut archive = match File::open(&path).map_err(zip::result::ZipError::from).and_then(ZipArchive::new) {
            Ok(archive) => archive,
            Err(err) => {
                warn!(archive = %path.display(), "skipping unreadable archive: {err}");
                ctx.shared.count(|s| s.skipped_files += 1);
                return Ok(());
            }
        };
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        let compiled: HashSet<&str> = names
            .iter()
            .filter_map(|n| n.strip_suffix(".class"))
            .collect();

        let mut class_files = 0;
        let mut skipped = 0;
        for name in &names {
            if let Some(binary) = name.strip_suffix(".class") {
                if is_anonymous(binary)
                    || binary.ends_with("module-info")
                    || binary.ends_with("package-info")
                {
                    continue;
                }
                let bytes = match read_entry(&mut archive, name) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(archive = %path.display(), entry = %name, "skipping unreadable entry: {err}");
                        skipped += 1;
                        continue;
                    }
                };
                match read_class(bytes) {
                    Ok(class) => {
                        class_files += 1;
                        let mut child = ctx.child();
                        child.project = Some(project);
                        child.binary = Some(Arc::new(class));
                        spawner.spawn_new(priority::PACKAGE, BinaryPackageTask, child);
                    }
                    Err(err) => {
                        warn!(archive = %path.display(), entry = %name, "skipping class file: {err}");
                        skipped += 1;
                    }
                }
            } else if let Some(stem) = name.strip_suffix(".java") {
                if compiled.contains(stem) {
                    continue;
                }
                let text = match read_entry(&mut archive, name) {
                    Ok(bytes) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(err) => {
                            warn!(archive = %path.display(), entry = %name, "skipping source entry: {err}");
                            skipped += 1;
                            continue;
                        }
                    },
                    Err(err) => {
                        warn!(archive = %path.display(), entry = %name, "skipping unreadable entry: {err}");
                        skipped += 1;
                        continue;
                    }
                };
                let package_hint = name
                    .rsplit_once('/')
                    .map_or(String::new(), |(dir, _)| dir.replace('/', "."));
                let mut child = ctx.child();
                child.project = Some(project);
                child.source = Some(SourceFile {
                    path: PathBuf::from(format!("{}!/{name}", path.display())),
                    package_hint: Some(package_hint),
                });
                child.text = Some(text);
                spawner.spawn_new(priority::PACKAGE, source_chain(), child);
            }
        }
        ctx.shared.count(|s| {
            s.class_files += class_files;
            s.skipped_files += skipped;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_hint_follows_directories() {
        let root = Path::new("/w/app/src");
        assert_eq!(
            package_hint(root, Path::new("/w/app/src/com/acme/A.java")).as_deref(),
            Some("com.acme")
        );
        assert_eq!(package_hint(root, Path::new("/w/app/src/A.java")).as_deref(), Some(""));
    }

    #[test]
    fn fallback_source_folders_must_exist() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("src")).expect("mkdir");
        let config = LoadConfig {
            source_folders: vec!["src".to_string(), "test".to_string()],
            ..LoadConfig::default()
        };
        assert_eq!(source_folders(dir.path(), &config), vec!["src".to_string()]);

        std::fs::write(
            dir.path().join(".classpath"),
            r#"<classpath><classpathentry kind="src" path="java"/></classpath>"#,
        )
        .expect("write");
        assert_eq!(source_folders(dir.path(), &config), vec!["java".to_string()]);
    }
}
