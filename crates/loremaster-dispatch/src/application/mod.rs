//! Dispatcher runtime and the standard handler set.

pub mod broadcast;
pub mod dispatcher;
pub mod handler;
pub mod handlers;
