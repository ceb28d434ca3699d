use std::cmp::Reverse;
use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{IngestError, Result};
use crate::traits::{Task, TaskContext};
use crate::types::{Group, Priority, RunReport, SchedulerConfig, new_group};

pub mod kernel;

pub(crate) struct Pending<C: TaskContext> {
    pub(crate) priority: Priority,
    pub(crate) task: Box<dyn Task<C>>,
    pub(crate) group: Group<C>,
}

/// Collects the tasks a running task wants to enqueue. The scheduler merges
/// them into the pending list once the task returns.
pub struct Spawner<C: TaskContext> {
    current: Group<C>,
    spawned: Vec<Pending<C>>,
}

impl<C: TaskContext> Spawner<C> {
    pub(crate) fn new(current: Group<C>) -> Self {
        Self {
            current,
            spawned: Vec::new(),
        }
    }

    /// Group of the task that is running.
    pub fn current_group(&self) -> Group<C> {
        self.current.clone()
    }

    /// Enqueue a later phase into the running task's own group.
    pub fn spawn_here(&mut self, priority: Priority, task: impl Task<C> + 'static) {
        let group = self.current.clone();
        self.spawn(priority, task, &group);
    }

    /// Enqueue a task into an existing group.
    pub fn spawn(&mut self, priority: Priority, task: impl Task<C> + 'static, group: &Group<C>) {
        self.spawned.push(Pending {
            priority,
            task: Box::new(task),
            group: group.clone(),
        });
    }

    /// Enqueue a task into a fresh group built from `ctx`, returning the
    /// group so that later phases can be spawned into it.
    pub fn spawn_new(
        &mut self,
        priority: Priority,
        task: impl Task<C> + 'static,
        ctx: C,
    ) -> Group<C> {
        let group = new_group(ctx);
        self.spawn(priority, task, &group);
        group
    }

    pub(crate) fn into_spawned(self) -> Vec<Pending<C>> {
        self.spawned
    }
}

type QueueKey = (Reverse<Priority>, u64);

/// The pending-task list and its scheduling loop.
pub struct TaskList<C: TaskContext> {
    config: SchedulerConfig,
    pending: BTreeMap<QueueKey, Pending<C>>,
    next_seq: u64,
    report: RunReport,
}

impl<C: TaskContext> TaskList<C> {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            pending: BTreeMap::new(),
            next_seq: 0,
            report: RunReport::default(),
        }
    }

    pub fn push(&mut self, priority: Priority, task: impl Task<C> + 'static, group: &Group<C>) {
        self.insert(Pending {
            priority,
            task: Box::new(task),
            group: group.clone(),
        });
    }

    pub fn push_new(&mut self, priority: Priority, task: impl Task<C> + 'static, ctx: C) -> Group<C> {
        let group = new_group(ctx);
        self.push(priority, task, &group);
        group
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn insert(&mut self, pending: Pending<C>) {
        let key = (Reverse(pending.priority), self.next_seq);
        self.next_seq += 1;
        self.pending.insert(key, pending);
    }

    fn is_eligible(pending: &Pending<C>) -> Result<bool> {
        let inputs = pending.task.input_constraints();
        if inputs.is_empty() {
            return Ok(true);
        }
        let ctx = pending
            .group
            .lock()
            .map_err(|_| IngestError::Execution("task context lock poisoned".to_string()))?;
        Ok(inputs.iter().all(|k| ctx.has(*k)))
    }

    /// Removes the next batch of runnable tasks: the first eligible task in
    /// priority order and, when running with several workers, every other
    /// eligible task of the same priority.
    fn take_band(&mut self) -> Result<Vec<Pending<C>>> {
        let mut band_priority = None;
        let mut keys = Vec::new();
        for (key, pending) in &self.pending {
            if let Some(p) = band_priority {
                if pending.priority != p {
                    break;
                }
            }
            if Self::is_eligible(pending)? {
                band_priority = Some(pending.priority);
                keys.push(*key);
                if self.config.workers <= 1 {
                    break;
                }
            }
        }
        Ok(keys
            .into_iter()
            .filter_map(|k| self.pending.remove(&k))
            .collect())
    }

    /// Runs pending tasks until none is eligible. Stalled tasks are reported
    /// and dropped; the first task error aborts the run.
    pub fn wait_for_completion(&mut self) -> Result<RunReport> {
        let pool = kernel::build_pool(&self.config)?;
        loop {
            let band = self.take_band()?;
            if band.is_empty() {
                break;
            }
            debug!(
                "running band of {} task(s) at priority {}",
                band.len(),
                band[0].priority
            );
            let outcomes = kernel::run_band(pool.as_ref(), band);
            for outcome in outcomes {
                let outcome = outcome?;
                self.report.executed += 1;
                if !outcome.missing_outputs.is_empty() {
                    warn!(
                        "task '{}' finished without {:?}",
                        outcome.name, outcome.missing_outputs
                    );
                    self.report.incomplete.push(outcome.name);
                }
                self.report.spawned += outcome.spawned.len();
                for pending in outcome.spawned {
                    self.insert(pending);
                }
            }
        }

        let stalled: Vec<String> = std::mem::take(&mut self.pending)
            .into_values()
            .map(|p| p.task.name())
            .collect();
        if !stalled.is_empty() {
            warn!("{} task(s) never became runnable", stalled.len());
            for name in &stalled {
                debug!("stalled task: {name}");
            }
        }
        self.report.stalled.extend(stalled);
        Ok(std::mem::take(&mut self.report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Ctx {
        ready: bool,
    }

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum Key {
        Ready,
    }

    impl TaskContext for Ctx {
        type Key = Key;
        fn has(&self, key: Key) -> bool {
            match key {
                Key::Ready => self.ready,
            }
        }
    }

    struct Log {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        needs_ready: bool,
    }

    impl Task<Ctx> for Log {
        fn name(&self) -> String {
            self.label.to_string()
        }
        fn input_constraints(&self) -> Vec<Key> {
            if self.needs_ready { vec![Key::Ready] } else { vec![] }
        }
        fn run(&mut self, _ctx: &mut Ctx, _spawner: &mut Spawner<Ctx>) -> std::result::Result<(), BoxError> {
            self.log.lock().unwrap().push(self.label);
            Ok(())
        }
    }

    #[test]
    fn equal_priorities_run_in_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut list = TaskList::new(SchedulerConfig::default());
        for label in ["a", "b", "c"] {
            list.push_new(
                5,
                Log {
                    label,
                    log: log.clone(),
                    needs_ready: false,
                },
                Ctx::default(),
            );
        }
        list.push_new(
            9,
            Log {
                label: "first",
                log: log.clone(),
                needs_ready: false,
            },
            Ctx::default(),
        );
        let report = list.wait_for_completion().unwrap();
        assert_eq!(report.executed, 4);
        assert_eq!(*log.lock().unwrap(), vec!["first", "a", "b", "c"]);
    }

    #[test]
    fn unsatisfied_inputs_are_reported_as_stalled() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut list = TaskList::new(SchedulerConfig::default());
        list.push_new(
            1,
            Log {
                label: "waits",
                log: log.clone(),
                needs_ready: true,
            },
            Ctx::default(),
        );
        let report = list.wait_for_completion().unwrap();
        assert_eq!(report.executed, 0);
        assert_eq!(report.stalled, vec!["waits".to_string()]);
        assert!(log.lock().unwrap().is_empty());
    }
}
