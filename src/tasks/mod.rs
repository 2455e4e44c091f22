//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Purge: asks the pool to reclaim expired items at the configured interval

mod purge;

pub use purge::spawn_purge_task;
