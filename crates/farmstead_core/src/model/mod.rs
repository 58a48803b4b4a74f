//! Domain model for the herd directory and vaccination records.
//!
//! # Responsibility
//! - Define canonical data structures used by the scheduling engine.
//! - Keep validation rules next to the types they protect.
//!
//! # Invariants
//! - Every record is identified by a stable UUID v4.
//! - Schedule metadata lives in typed fields, never inside free-text notes.

pub mod animal;
pub mod reminder;
pub mod vaccination;

use uuid::Uuid;

/// Identifier of a farm. Farms themselves are owned by the surrounding system.
pub type FarmId = Uuid;
/// Identifier of an animal group (herd, flock, pen).
pub type GroupId = Uuid;
/// Identifier of one animal.
pub type AnimalId = Uuid;
/// Identifier of one health/vaccination entry.
pub type EntryId = Uuid;
