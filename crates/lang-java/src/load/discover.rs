use super::context::{LoadKey, LoadingContext, ProjectDir};
use super::priority;
use super::project::{ArchiveProjectTask, ProjectTask, source_folders};
use cmtscope_ingest::{BoxError, Spawner, Task};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Finds project directories (by marker file) and archives under the
/// workspace root and fans out one group per project or archive.
pub struct DiscoverTask;

impl DiscoverTask {
    fn is_project(dir: &Path, markers: &[String]) -> bool {
        markers.iter().any(|m| dir.join(m).is_file())
    }
}

impl Task<LoadingContext> for DiscoverTask {
    fn name(&self) -> String {
        "discover workspace".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Workspace]
    }

    fn run(&mut self, ctx: &mut LoadingContext, spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let Some(root) = ctx.workspace.clone() else {
            return Ok(());
        };
        let config = &ctx.shared.config;

        let mut projects: Vec<PathBuf> = Vec::new();
        let mut archives: Vec<PathBuf> = Vec::new();
        let mut claimed: Vec<PathBuf> = Vec::new();

        let mut walker = WalkDir::new(&root).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable path: {err}");
                    continue;
                }
            };
            let path = entry.path();
            if entry.file_type().is_dir() {
                let hidden = entry.depth() > 0
                    && entry.file_name().to_str().is_some_and(|n| n.starts_with('.'));
                if hidden || claimed.iter().any(|c| c == path) {
                    walker.skip_current_dir();
                    continue;
                }
                if Self::is_project(path, &config.project_markers) {
                    claimed.extend(source_folders(path, config).into_iter().map(|f| path.join(f)));
                    projects.push(path.to_path_buf());
                }
            } else if entry.file_type().is_file() && config.is_archive(path) {
                archives.push(path.to_path_buf());
            }
        }

        info!(
            root = %root.display(),
            projects = projects.len(),
            archives = archives.len(),
            "discovered workspace"
        );
        for path in projects {
            let mut child = ctx.child();
            child.project_dir = Some(ProjectDir { path });
            spawner.spawn_new(priority::PROJECT, ProjectTask, child);
        }
        for path in archives {
            let mut child = ctx.child();
            child.archive = Some(path);
            spawner.spawn_new(priority::PROJECT, ArchiveProjectTask, child);
        }
        Ok(())
    }
}
