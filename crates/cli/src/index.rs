use anyhow::Context;
use cmtscope_core::{ApiFileManager, LoadConfig};
use cmtscope_java::WorkspaceLoader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct IndexArgs {
    pub path: PathBuf,
    pub out: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub base: Option<PathBuf>,
    pub workers: Option<usize>,
    pub no_prune: bool,
}

/// File settings, then environment, then flags.
pub fn load_config(file: Option<&Path>, workers: Option<usize>, no_prune: bool) -> anyhow::Result<LoadConfig> {
    let mut config = match file {
        Some(path) => LoadConfig::from_file(path).with_context(|| format!("reading config {}", path.display()))?,
        None => LoadConfig::default(),
    }
    .apply_env();
    if let Some(workers) = workers {
        config.workers = workers.max(1);
    }
    if no_prune {
        config.prune_third_party = false;
    }
    Ok(config)
}

pub fn run(args: IndexArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref(), args.workers, args.no_prune)?;
    let snapshot_version = config.snapshot_version;
    let mut loader = WorkspaceLoader::new(config);
    if let Some(base) = &args.base {
        let index = ApiFileManager::read(base).with_context(|| format!("reading base snapshot {}", base.display()))?;
        loader = loader.with_base(Arc::new(index));
    }

    info!("Loading workspace at: {}...", args.path.display());
    let outcome = loader.load(&args.path)?;
    let report = &outcome.report;
    if !report.run.stalled.is_empty() {
        warn!("{} tasks stalled on unresolved dependencies", report.run.stalled.len());
    }

    let out = args.out.unwrap_or_else(|| args.path.clone());
    let version = ApiFileManager::next_version(&out)?.max(snapshot_version);
    let written = ApiFileManager::write(&outcome.index, &out, version)?;

    let stats = &report.stats;
    info!("Indexing complete!");
    info!("Projects: {} ({} archives)", stats.projects, stats.archives);
    info!("Classes: {}, methods: {}, fields: {}", stats.classes, stats.methods, stats.fields);
    info!(
        "Pseudo methods: {}, unresolved calls: {}, skipped files: {}",
        stats.pseudo_methods, stats.unresolved_calls, stats.skipped_files
    );
    info!("Pruned: {}", report.pruned);
    println!("{}", written.display());
    Ok(())
}
