//! Priority and constraint driven task scheduling.
//!
//! Tasks declare the context keys they need and the keys they produce. A
//! [`TaskList`] runs them by descending priority once their inputs are
//! present, and a running task may spawn further tasks through its
//! [`Spawner`].

pub mod chain;
pub mod error;
pub mod runtime;
pub mod traits;
pub mod types;

pub use chain::ChainTask;
pub use error::{BoxError, IngestError};
pub use runtime::{Spawner, TaskList};
pub use traits::{Task, TaskContext};
pub use types::{Group, Priority, RunReport, SchedulerConfig, new_group};
