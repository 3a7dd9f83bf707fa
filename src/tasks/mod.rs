//! Task records, their state machine, and the in-memory store

mod model;
mod retention;
mod store;

pub use model::{Task, TaskId, TaskStatus};
pub use retention::{RetentionPolicy, spawn_sweeper};
pub use store::{StoreError, TaskStore};
