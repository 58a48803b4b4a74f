//! Livestock vaccination scheduling and reminder engine.
//!
//! This crate owns the business invariants for vaccination schedules:
//! recurring schedule generation, the per-entry status state machine,
//! reminder ranking across the farm / group / animal hierarchy, and bulk
//! scheduling with per-item failure isolation.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BulkConfig, ConfigError, CriticalKeyword, EngineConfig, PriorityPolicy};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::animal::{Animal, AnimalGroup, AnimalValidationError, HealthStatus, Sex};
pub use model::reminder::{Priority, Reminder, ReminderSummary, ReminderType};
pub use model::vaccination::{
    Annotation, AnnotationKind, EntryValidationError, RecordKind, ScheduleItem, VaccinationEntry,
    VaccinationStatus,
};
pub use model::{AnimalId, EntryId, FarmId, GroupId};
pub use repo::directory_repo::{AnimalDirectory, SqliteAnimalDirectory};
pub use repo::error::{RepoError, RepoResult};
pub use repo::vaccination_repo::{SqliteVaccinationStore, VaccinationStore};
pub use service::bulk::{
    AnimalBulkResult, AnimalFilter, BulkOutcome, BulkScheduleOptions, BulkScheduleRequest,
    BulkScheduleResult, BulkTarget, ItemError, SkippedItem,
};
pub use service::error::{RecordRef, TransitionAction, VaccinationError, VaccinationResult};
pub use service::reminder::{ReminderQuery, ReminderReport};
pub use service::schedule::{CreateScheduleRequest, NextDate, ScheduleResult, ScheduleTarget};
pub use service::scope::{Scope, ScopedAnimal};
pub use service::transition::{
    CancelRequest, CompleteRequest, CompletionResult, RescheduleRequest,
};
pub use service::VaccinationService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
