//! Herd record store: connection bootstrap and schema versioning.
//!
//! Every connection handed to the directory or the vaccination store comes
//! from [`open_db`] or [`open_db_in_memory`], which enable foreign keys and
//! bring the schema to [`migrations::latest_version`] before returning.
//! Schema progress is stamped in `PRAGMA user_version`; repositories check
//! that stamp in `try_new` and refuse anything else.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or migrating the herd record store.
#[derive(Debug)]
pub enum DbError {
    /// SQLite could not open the file or in-memory database.
    Open {
        mode: &'static str,
        source: rusqlite::Error,
    },
    /// One migration step failed; the whole batch was rolled back.
    Migration { version: u32, source: rusqlite::Error },
    /// The file carries a schema stamp from a newer build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Any other SQLite failure (pragmas, queries issued by repositories).
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { mode, source } => {
                write!(f, "cannot open herd database ({mode}): {source}")
            }
            Self::Migration { version, source } => {
                write!(f, "herd schema migration {version} failed: {source}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "herd database is at schema {db_version}, this build knows up to {latest_supported}"
            ),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } | Self::Migration { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
