//! Task execution
//!
//! [`WorkerPool`] owns a fixed set of workers fed through bounded
//! channels. Every worker hands each task id to the [`TaskExecutor`],
//! which walks the task through extraction and download.

mod executor;
mod pool;

pub use executor::{TaskExecutor, output_file_name};
pub use pool::{PoolError, WorkerPool};
