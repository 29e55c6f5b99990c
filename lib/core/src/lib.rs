//! Core types shared by the varflow crates.
//!
//! This crate provides the identifier types used to address variables,
//! triggers and workflow nodes, and the `Result` alias every layer uses to
//! propagate errors with rootcause.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{NodeId, ParseIdError, TriggerId, VariableId};
