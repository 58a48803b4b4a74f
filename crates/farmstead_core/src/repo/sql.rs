//! Row conversion helpers shared by SQLite repositories.

use crate::db::migrations::{current_user_version, latest_version};
use crate::repo::error::{RepoError, RepoResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use uuid::Uuid;

const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

pub(crate) fn to_epoch_ms(value: DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

pub(crate) fn from_epoch_ms(value: i64, column: &'static str) -> RepoResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid epoch ms `{value}` in {column}"))
    })
}

pub(crate) fn from_optional_epoch_ms(
    value: Option<i64>,
    column: &'static str,
) -> RepoResult<Option<DateTime<Utc>>> {
    value.map(|ms| from_epoch_ms(ms, column)).transpose()
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn birth_date_to_db(value: NaiveDate) -> String {
    value.format(BIRTH_DATE_FORMAT).to_string()
}

pub(crate) fn parse_birth_date(value: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, BIRTH_DATE_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!("invalid date `{value}` in animals.birth_date"))
    })
}
