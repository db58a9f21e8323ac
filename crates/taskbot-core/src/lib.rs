//! # taskbot-core
//!
//! Core types, traits, configuration, and error handling for the task bot.

pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod sanitize;
pub mod traits;
