use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::trace;

use crate::error::{IngestError, Result};
use crate::runtime::{Pending, Spawner};
use crate::traits::TaskContext;
use crate::types::SchedulerConfig;

pub(crate) struct TaskOutcome<C: TaskContext> {
    pub(crate) name: String,
    pub(crate) missing_outputs: Vec<C::Key>,
    pub(crate) spawned: Vec<Pending<C>>,
}

pub(crate) fn build_pool(config: &SchedulerConfig) -> Result<Option<ThreadPool>> {
    if config.workers <= 1 {
        return Ok(None);
    }
    ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("cmtscope-task-{i}"))
        .build()
        .map(Some)
        .map_err(|e| IngestError::Execution(format!("failed to build worker pool: {e}")))
}

/// Runs one band. Outcomes come back in band order regardless of how the
/// workers interleaved, so spawned tasks are merged deterministically.
pub(crate) fn run_band<C: TaskContext>(
    pool: Option<&ThreadPool>,
    band: Vec<Pending<C>>,
) -> Vec<Result<TaskOutcome<C>>> {
    match pool {
        Some(pool) if band.len() > 1 => {
            pool.install(|| band.into_par_iter().map(execute).collect())
        }
        _ => band.into_iter().map(execute).collect(),
    }
}

fn execute<C: TaskContext>(pending: Pending<C>) -> Result<TaskOutcome<C>> {
    let Pending {
        mut task, group, ..
    } = pending;
    let name = task.name();
    let mut spawner = Spawner::new(group.clone());
    let mut ctx = group
        .lock()
        .map_err(|_| IngestError::Execution(format!("context of '{name}' is poisoned")))?;

    if let Some(key) = task.input_constraints().into_iter().find(|k| !ctx.has(*k)) {
        return Err(IngestError::MissingInput {
            task: name,
            key: format!("{key:?}"),
        });
    }

    trace!("running task '{name}'");
    task.run(&mut ctx, &mut spawner)
        .map_err(|e| IngestError::TaskFailed {
            task: name.clone(),
            message: e.to_string(),
        })?;

    let missing_outputs = task
        .output_constraints()
        .into_iter()
        .filter(|k| !ctx.has(*k))
        .collect();

    Ok(TaskOutcome {
        name,
        missing_outputs,
        spawned: spawner.into_spawned(),
    })
}
