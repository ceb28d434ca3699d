use tracing::debug;

use crate::error::BoxError;
use crate::runtime::Spawner;
use crate::traits::{Task, TaskContext};

/// A fixed sequence of tasks scheduled as one unit over one shared context.
///
/// The chain needs the inputs of its first member and produces the outputs of
/// its last. When a member's inputs are missing (an earlier member bailed out
/// on a recoverable problem) the rest of the chain is skipped.
pub struct ChainTask<C: TaskContext> {
    name: String,
    tasks: Vec<Box<dyn Task<C>>>,
}

impl<C: TaskContext> ChainTask<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    pub fn then(mut self, task: impl Task<C> + 'static) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<C: TaskContext> Task<C> for ChainTask<C> {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn input_constraints(&self) -> Vec<C::Key> {
        self.tasks
            .first()
            .map(|t| t.input_constraints())
            .unwrap_or_default()
    }

    fn output_constraints(&self) -> Vec<C::Key> {
        self.tasks
            .last()
            .map(|t| t.output_constraints())
            .unwrap_or_default()
    }

    fn run(&mut self, ctx: &mut C, spawner: &mut Spawner<C>) -> Result<(), BoxError> {
        for task in &mut self.tasks {
            if let Some(key) = task.input_constraints().into_iter().find(|k| !ctx.has(*k)) {
                debug!(
                    "chain '{}' stopped before '{}': {:?} unbound",
                    self.name,
                    task.name(),
                    key
                );
                return Ok(());
            }
            task.run(ctx, spawner)?;
        }
        Ok(())
    }
}
