//! Collaborator contracts consumed by the engine and their SQLite backends.
//!
//! # Responsibility
//! - Define the herd directory and vaccination store interfaces.
//! - Isolate SQL details from the scheduling engine.
//!
//! # Invariants
//! - Write paths validate models before any SQL mutation.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod directory_repo;
pub mod error;
mod sql;
pub mod vaccination_repo;
