use super::context::{LoadShared, LoadStats, LoadingContext};
use super::discover::DiscoverTask;
use super::priority;
use crate::error::{JavaError, Result};
use cmtscope_core::model::prune;
use cmtscope_core::model::util::propagate_third_party;
use cmtscope_core::{JavaItemIndex, LoadConfig};
use cmtscope_ingest::{RunReport, SchedulerConfig, TaskList};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub stats: LoadStats,
    pub run: RunReport,
    /// Items dropped by third-party pruning.
    pub pruned: usize,
}

pub struct LoadOutcome {
    pub index: JavaItemIndex,
    pub report: LoadReport,
}

/// Builds an item index from a workspace directory.
///
/// With a base index, the new index is layered on top of it: items already
/// in the base are found rather than created again.
pub struct WorkspaceLoader {
    config: LoadConfig,
    base: Option<Arc<JavaItemIndex>>,
}

impl WorkspaceLoader {
    pub fn new(config: LoadConfig) -> Self {
        Self { config, base: None }
    }

    pub fn with_base(mut self, base: Arc<JavaItemIndex>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn load(&self, root: &Path) -> Result<LoadOutcome> {
        if !root.is_dir() {
            return Err(JavaError::Config(format!("workspace {} is not a directory", root.display())));
        }
        let started = Instant::now();
        let index = match &self.base {
            Some(base) => JavaItemIndex::with_base(base.clone()),
            None => JavaItemIndex::new(),
        };
        let shared = Arc::new(LoadShared::new(index, self.config.clone())?);

        let mut tasks = TaskList::new(SchedulerConfig {
            workers: self.config.workers.max(1),
        });
        let mut ctx = LoadingContext::new(shared.clone());
        ctx.workspace = Some(root.to_path_buf());
        tasks.push_new(priority::DISCOVER, DiscoverTask, ctx);
        let run = tasks.wait_for_completion()?;
        drop(tasks);

        if !run.stalled.is_empty() {
            warn!(count = run.stalled.len(), tasks = ?run.stalled, "tasks never became ready");
        }
        if !run.incomplete.is_empty() {
            info!(count = run.incomplete.len(), "tasks finished without their outputs");
        }

        let mut index = shared.take_index()?;
        let mut pruned = 0;
        if self.config.prune_third_party {
            let outcome = prune(&index);
            pruned = outcome.removed;
            index = outcome.index;
        }
        let flagged = propagate_third_party(&mut index);
        debug!(flagged, "third-party flag copied to project members");
        let stats = shared.stats();
        info!(
            root = %root.display(),
            projects = stats.projects,
            classes = stats.classes,
            methods = stats.methods,
            items = index.len(),
            pruned,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "workspace loaded"
        );
        Ok(LoadOutcome {
            index,
            report: LoadReport { stats, run, pruned },
        })
    }
}
