//! Narrator domain types.

pub mod request;
pub mod role;
pub mod stream;
pub mod tools;
