//! Repository error shared by the directory and the vaccination store.

use crate::db::DbError;
use crate::model::animal::AnimalValidationError;
use crate::model::vaccination::EntryValidationError;
use crate::model::GroupId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence and query failures.
#[derive(Debug)]
pub enum RepoError {
    EntryValidation(EntryValidationError),
    AnimalValidation(AnimalValidationError),
    Db(DbError),
    /// Target record does not exist.
    NotFound(Uuid),
    /// Conditional write lost against a concurrent writer.
    VersionConflict {
        id: Uuid,
        expected: i64,
        actual: i64,
    },
    /// Tag already used by another animal in the same group.
    DuplicateTag { group_id: GroupId, tag: String },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted into a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntryValidation(err) => write!(f, "{err}"),
            Self::AnimalValidation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::VersionConflict {
                id,
                expected,
                actual,
            } => write!(
                f,
                "version conflict on {id}: expected stored version {expected}, found {actual}"
            ),
            Self::DuplicateTag { group_id, tag } => {
                write!(f, "tag `{tag}` already used in group {group_id}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::EntryValidation(err) => Some(err),
            Self::AnimalValidation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EntryValidationError> for RepoError {
    fn from(value: EntryValidationError) -> Self {
        Self::EntryValidation(value)
    }
}

impl From<AnimalValidationError> for RepoError {
    fn from(value: AnimalValidationError) -> Self {
        Self::AnimalValidation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
