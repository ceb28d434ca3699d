use crate::ast::{AstId, CompilationUnit, JavaParser};
use crate::classfile::BinaryClass;
use crate::error::Result;
use crate::manifest::ManifestDependency;
use crate::resolve::CallSite;
use cmtscope_core::model::util::project_of;
use cmtscope_core::{CoreError, ItemId, JavaItemIndex, LoadConfig};
use cmtscope_ingest::TaskContext;
use regex::RegexSet;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Slots a loading task can require or produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadKey {
    Workspace,
    ProjectDir,
    Archive,
    Project,
    DependenciesLoaded,
    Source,
    SourceText,
    Unit,
    Binary,
    Package,
    Classes,
    ClassDependencies,
    Methods,
    PseudoMethods,
    MethodDependencies,
}

/// A project dependency as declared by `.classpath` or a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    Project(String),
    Manifest(ManifestDependency),
}

/// An Eclipse-style project directory.
#[derive(Debug, Clone)]
pub struct ProjectDir {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Package implied by the file's location, when known.
    pub package_hint: Option<String>,
}

/// Counters reported at the end of a load.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub projects: usize,
    pub archives: usize,
    pub source_files: usize,
    pub class_files: usize,
    pub skipped_files: usize,
    pub packages: usize,
    pub classes: usize,
    pub methods: usize,
    pub fields: usize,
    pub pseudo_methods: usize,
    pub unresolved_calls: usize,
    pub unresolved_supertypes: usize,
    pub unresolved_dependencies: usize,
}

/// State every task group shares: the index under construction and the
/// load settings.
pub struct LoadShared {
    index: RwLock<JavaItemIndex>,
    pub config: LoadConfig,
    third_party: RegexSet,
    pub parser: JavaParser,
    stats: Mutex<LoadStats>,
}

impl LoadShared {
    pub fn new(index: JavaItemIndex, config: LoadConfig) -> Result<Self> {
        let third_party = config.third_party_matcher()?;
        Ok(Self {
            index: RwLock::new(index),
            config,
            third_party,
            parser: JavaParser::new(),
            stats: Mutex::new(LoadStats::default()),
        })
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, JavaItemIndex>> {
        self.index
            .read()
            .map_err(|_| CoreError::State("item index lock poisoned".to_string()).into())
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, JavaItemIndex>> {
        self.index
            .write()
            .map_err(|_| CoreError::State("item index lock poisoned".to_string()).into())
    }

    /// Moves the index out, leaving an empty one behind.
    pub fn take_index(&self) -> Result<JavaItemIndex> {
        Ok(std::mem::take(&mut *self.write()?))
    }

    pub fn count(&self, update: impl FnOnce(&mut LoadStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        update(&mut stats);
    }

    pub fn stats(&self) -> LoadStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Whether a project name matches a configured third-party pattern.
    pub fn matches_third_party(&self, name: &str) -> bool {
        self.third_party.is_match(name)
    }

    /// Picks the candidate from `project` when there is one, else the first.
    pub fn prefer_project(
        index: &JavaItemIndex,
        project: Option<ItemId>,
        candidates: &[ItemId],
    ) -> Option<ItemId> {
        project
            .and_then(|own| {
                candidates
                    .iter()
                    .copied()
                    .find(|c| project_of(index, *c) == Some(own))
            })
            .or_else(|| candidates.first().copied())
    }
}

/// Per-group context of the loading pipeline.
///
/// Every slot is optional; a task may run once the slots it names as inputs
/// are bound. [`LoadingContext::child`] starts a new group that shares the
/// index and configuration but none of the bindings.
pub struct LoadingContext {
    pub shared: Arc<LoadShared>,
    pub workspace: Option<PathBuf>,
    pub project_dir: Option<ProjectDir>,
    pub archive: Option<PathBuf>,
    pub project: Option<ItemId>,
    pub dependencies: Vec<Dependency>,
    pub dependencies_loaded: bool,
    pub source: Option<SourceFile>,
    pub text: Option<String>,
    pub unit: Option<Arc<CompilationUnit>>,
    pub binary: Option<Arc<BinaryClass>>,
    pub package: Option<ItemId>,
    /// Type declarations of the unit with their class items, outer first.
    pub classes: Option<Vec<(Option<AstId>, ItemId)>>,
    pub class_dependencies: bool,
    /// Method and constructor declarations with their method items.
    pub methods: Option<Vec<(AstId, ItemId)>>,
    pub calls: Option<Vec<CallSite>>,
    pub method_dependencies: bool,
}

impl LoadingContext {
    pub fn new(shared: Arc<LoadShared>) -> Self {
        Self {
            shared,
            workspace: None,
            project_dir: None,
            archive: None,
            project: None,
            dependencies: Vec::new(),
            dependencies_loaded: false,
            source: None,
            text: None,
            unit: None,
            binary: None,
            package: None,
            classes: None,
            class_dependencies: false,
            methods: None,
            calls: None,
            method_dependencies: false,
        }
    }

    pub fn child(&self) -> Self {
        Self::new(self.shared.clone())
    }
}

impl TaskContext for LoadingContext {
    type Key = LoadKey;

    fn has(&self, key: LoadKey) -> bool {
        match key {
            LoadKey::Workspace => self.workspace.is_some(),
            LoadKey::ProjectDir => self.project_dir.is_some(),
            LoadKey::Archive => self.archive.is_some(),
            LoadKey::Project => self.project.is_some(),
            LoadKey::DependenciesLoaded => self.dependencies_loaded,
            LoadKey::Source => self.source.is_some(),
            LoadKey::SourceText => self.text.is_some(),
            LoadKey::Unit => self.unit.is_some(),
            LoadKey::Binary => self.binary.is_some(),
            LoadKey::Package => self.package.is_some(),
            LoadKey::Classes => self.classes.is_some(),
            LoadKey::ClassDependencies => self.class_dependencies,
            LoadKey::Methods => self.methods.is_some(),
            LoadKey::PseudoMethods => self.calls.is_some(),
            LoadKey::MethodDependencies => self.method_dependencies,
        }
    }
}
