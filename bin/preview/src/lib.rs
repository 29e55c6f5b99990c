//! Command-line preview of varflow trigger documents.
//!
//! Loads a trigger from JSON, validates it and shows what the runtime
//! would do with it: the cron expression and upcoming firings for timers,
//! the effective error strategies for data-flow links.

pub mod config;
pub mod error;
pub mod preview;
