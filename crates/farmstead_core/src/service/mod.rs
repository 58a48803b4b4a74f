//! Vaccination scheduling engine.
//!
//! # Responsibility
//! - Generate schedules, drive entry status transitions, compute reminders
//!   and coordinate bulk scheduling on top of the directory and store
//!   contracts.
//! - Keep callers decoupled from storage details.
//!
//! # Invariants
//! - Single-entity operations fail fast; bulk operations isolate per-item
//!   failures inside their result.
//! - Reminder computation never writes.

pub mod bulk;
pub mod error;
pub mod reminder;
pub mod schedule;
pub mod scope;
pub mod transition;
mod vaccination_service;

pub use vaccination_service::VaccinationService;
