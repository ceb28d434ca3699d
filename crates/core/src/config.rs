use crate::error::Result;
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for loading a workspace into an item index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Worker threads per scheduler band; 1 runs cooperatively on the caller's thread.
    pub workers: usize,
    /// Synthesize placeholder methods for call targets that cannot be found.
    pub create_pseudo_methods: bool,
    /// Drop third-party items nothing first-party refers to once loading finishes.
    pub prune_third_party: bool,
    /// Flag every archive project as third-party.
    pub jars_are_third_party: bool,
    /// Regexes on project names that flag a project as third-party.
    pub third_party_patterns: Vec<String>,
    /// Skip package/class/method loading of an archive whose manifest
    /// dependencies did not all resolve.
    pub require_jar_dependencies: bool,
    /// Source folders used when a project has no `.classpath`.
    pub source_folders: Vec<String>,
    /// Files whose presence marks a directory as a project.
    pub project_markers: Vec<String>,
    pub archive_extensions: Vec<String>,
    pub snapshot_version: u32,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            create_pseudo_methods: true,
            prune_third_party: true,
            jars_are_third_party: true,
            third_party_patterns: Vec::new(),
            require_jar_dependencies: true,
            source_folders: vec!["src".to_string()],
            project_markers: vec![".project".to_string()],
            archive_extensions: vec!["jar".to_string(), "rar".to_string()],
            snapshot_version: 1,
        }
    }
}

impl LoadConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Applies `CMTSCOPE_WORKERS` and `CMTSCOPE_NO_PRUNE` when set.
    pub fn apply_env(mut self) -> Self {
        if let Some(workers) = std::env::var("CMTSCOPE_WORKERS")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            self.workers = workers.max(1);
        }
        if let Ok(v) = std::env::var("CMTSCOPE_NO_PRUNE") {
            if matches!(v.trim(), "1" | "true" | "yes") {
                self.prune_third_party = false;
            }
        }
        self
    }

    pub fn third_party_matcher(&self) -> Result<RegexSet> {
        Ok(RegexSet::new(&self.third_party_patterns)?)
    }

    pub fn is_archive(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                self.archive_extensions
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(e))
            })
            .unwrap_or(false)
    }
}
