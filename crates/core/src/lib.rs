//! Item graph, pruning and snapshot persistence for cmtscope.

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod storage;

pub use config::LoadConfig;
pub use error::{CoreError, Result};
pub use model::{AttrKey, ItemId, ItemKind, JavaItem, JavaItemIndex};
pub use storage::ApiFileManager;
