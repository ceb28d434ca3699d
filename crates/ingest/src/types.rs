use std::sync::{Arc, Mutex};

use crate::traits::TaskContext;

/// Higher priorities run first; equal priorities run in insertion order.
pub type Priority = i32;

/// Handle to a task group's context. Tasks spawned into the same group see
/// each other's outputs.
pub type Group<C> = Arc<Mutex<C>>;

pub fn new_group<C: TaskContext>(ctx: C) -> Group<C> {
    Arc::new(Mutex::new(ctx))
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of worker threads used to run one priority band. `1` keeps the
    /// cooperative single-threaded behaviour.
    pub workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

#[derive(Debug, Default, Clone)]
pub struct RunReport {
    pub executed: usize,
    pub spawned: usize,
    /// Tasks that finished without binding every declared output.
    pub incomplete: Vec<String>,
    /// Tasks whose inputs were never satisfied.
    pub stalled: Vec<String>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.incomplete.is_empty() && self.stalled.is_empty()
    }
}
