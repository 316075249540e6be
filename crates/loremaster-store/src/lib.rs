//! Loremaster Store — live session storage.
//!
//! Durable persistence is out of scope for the engine; this crate keeps the
//! sessions of the running process and hands out shared handles to them.

pub mod memory_store;
