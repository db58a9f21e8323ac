//! # taskbot-memory
//!
//! Persistent task store for taskbot (SQLite-backed).

pub mod store;

pub use store::{Store, Task};
