use std::fmt::Debug;
use std::hash::Hash;

use crate::error::BoxError;
use crate::runtime::Spawner;

/// Per-group state shared by the tasks of one group.
///
/// The key type is a closed set of named slots; `has` reports whether a slot
/// is currently bound, which is all the scheduler needs to decide eligibility.
pub trait TaskContext: Send + 'static {
    type Key: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    fn has(&self, key: Self::Key) -> bool;
}

pub trait Task<C: TaskContext>: Send {
    fn name(&self) -> String;

    /// Keys that must be bound in the group context before the task may run.
    fn input_constraints(&self) -> Vec<C::Key> {
        Vec::new()
    }

    /// Keys the task promises to bind when it completes normally.
    fn output_constraints(&self) -> Vec<C::Key> {
        Vec::new()
    }

    fn run(&mut self, ctx: &mut C, spawner: &mut Spawner<C>) -> Result<(), BoxError>;
}
