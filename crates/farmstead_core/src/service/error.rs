//! Error taxonomy surfaced by the vaccination engine.

use crate::model::vaccination::{EntryValidationError, RecordKind, VaccinationStatus};
use crate::model::EntryId;
use crate::repo::error::RepoError;
use crate::service::bulk::BulkScheduleResult;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type VaccinationResult<T> = Result<T, VaccinationError>;

/// Kind of record a lookup missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRef {
    Animal,
    Group,
    Entry,
    Record,
}

impl Display for RecordRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Animal => f.write_str("animal"),
            Self::Group => f.write_str("group"),
            Self::Entry => f.write_str("vaccination entry"),
            Self::Record => f.write_str("record"),
        }
    }
}

/// Transition names used in `InvalidTransition` errors and log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    Complete,
    Reschedule,
    Cancel,
}

impl Display for TransitionAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => f.write_str("complete"),
            Self::Reschedule => f.write_str("reschedule"),
            Self::Cancel => f.write_str("cancel"),
        }
    }
}

#[derive(Debug)]
pub enum VaccinationError {
    /// Unknown animal, group or entry id.
    NotFound { target: RecordRef, id: Uuid },
    /// Resolved scope has no animals to work on.
    EmptyTarget(String),
    /// Missing or malformed input.
    Validation(String),
    /// Transition attempted out of a terminal state.
    InvalidTransition {
        entry_id: EntryId,
        status: VaccinationStatus,
        action: TransitionAction,
    },
    /// Transition attempted on a non-vaccination record.
    InvalidRecordType { entry_id: EntryId, kind: RecordKind },
    /// Bulk run finished with isolated per-item errors.
    PartialFailure { processed: usize, errors: usize },
    /// Caller's version is stale.
    Conflict {
        entry_id: EntryId,
        expected: i64,
        actual: i64,
    },
    /// Bulk run exceeded its time budget. `partial` holds the animals
    /// processed before the budget ran out; their entries are already stored.
    Timeout {
        elapsed_ms: u128,
        partial: Box<BulkScheduleResult>,
    },
    Repo(RepoError),
}

impl Display for VaccinationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { target, id } => write!(f, "{target} not found: {id}"),
            Self::EmptyTarget(details) => write!(f, "no animals to schedule: {details}"),
            Self::Validation(details) => write!(f, "invalid input: {details}"),
            Self::InvalidTransition {
                entry_id,
                status,
                action,
            } => write!(
                f,
                "cannot {action} entry {entry_id}: status `{status}` is terminal"
            ),
            Self::InvalidRecordType { entry_id, kind } => write!(
                f,
                "entry {entry_id} is a `{kind}` record, not a vaccination"
            ),
            Self::PartialFailure { processed, errors } => write!(
                f,
                "bulk scheduling finished with {errors} item errors across {processed} animals"
            ),
            Self::Conflict {
                entry_id,
                expected,
                actual,
            } => write!(
                f,
                "entry {entry_id} changed concurrently: expected version {expected}, found {actual}"
            ),
            Self::Timeout {
                elapsed_ms,
                partial,
            } => write!(
                f,
                "bulk scheduling timed out after {elapsed_ms} ms with {} animals processed",
                partial.totals.processed
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for VaccinationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for VaccinationError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound {
                target: RecordRef::Record,
                id,
            },
            RepoError::VersionConflict {
                id,
                expected,
                actual,
            } => Self::Conflict {
                entry_id: id,
                expected,
                actual,
            },
            RepoError::EntryValidation(err) => Self::Validation(err.to_string()),
            other => Self::Repo(other),
        }
    }
}

impl From<EntryValidationError> for VaccinationError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}
