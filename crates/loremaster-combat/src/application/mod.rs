//! Scheduler services.

pub mod scheduler;
