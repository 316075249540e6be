//! Narrator services.

pub mod cache;
pub mod narrator;
pub mod runtime;
