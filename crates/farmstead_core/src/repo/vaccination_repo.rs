//! Vaccination entry store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist health/vaccination entries with typed schedule fields.
//! - Enforce optimistic concurrency on updates.
//!
//! # Invariants
//! - `save` inserts entries at version 1 and updates later versions only when
//!   the stored version is exactly one behind.
//! - `find_by_animal` returns most-recent-first by record date
//!   (`completed_at`, else `scheduled_at`, else `created_at`), then
//!   `created_at DESC, uuid ASC`.

use crate::model::vaccination::{Annotation, RecordKind, VaccinationEntry, VaccinationStatus};
use crate::model::{AnimalId, EntryId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sql::{
    ensure_schema_ready, from_epoch_ms, from_optional_epoch_ms, parse_uuid, to_epoch_ms,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ENTRY_SELECT_SQL: &str = "SELECT
    uuid,
    animal_uuid,
    kind,
    vaccination_type,
    description,
    veterinarian,
    cost,
    scheduled_at,
    completed_at,
    status,
    notes,
    annotations,
    follow_up_of,
    version,
    created_at,
    updated_at
FROM health_entries";

/// Storage for vaccination entries, as consumed by the engine.
pub trait VaccinationStore {
    /// Inserts a new entry (version 1) or applies a versioned update.
    fn save(&self, entry: &VaccinationEntry) -> RepoResult<()>;
    fn find_by_id(&self, id: EntryId) -> RepoResult<Option<VaccinationEntry>>;
    /// Entries for one animal, most recent first.
    fn find_by_animal(&self, animal_id: AnimalId) -> RepoResult<Vec<VaccinationEntry>>;
}

impl<T: VaccinationStore + ?Sized> VaccinationStore for &T {
    fn save(&self, entry: &VaccinationEntry) -> RepoResult<()> {
        (**self).save(entry)
    }

    fn find_by_id(&self, id: EntryId) -> RepoResult<Option<VaccinationEntry>> {
        (**self).find_by_id(id)
    }

    fn find_by_animal(&self, animal_id: AnimalId) -> RepoResult<Vec<VaccinationEntry>> {
        (**self).find_by_animal(animal_id)
    }
}

/// SQLite-backed vaccination store.
pub struct SqliteVaccinationStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVaccinationStore<'conn> {
    /// Creates a store over a fully migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn stored_version(&self, id: EntryId) -> RepoResult<Option<i64>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM health_entries WHERE uuid = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }

    fn insert(&self, entry: &VaccinationEntry, annotations: &str) -> RepoResult<()> {
        if let Some(actual) = self.stored_version(entry.id)? {
            return Err(RepoError::VersionConflict {
                id: entry.id,
                expected: 0,
                actual,
            });
        }

        self.conn.execute(
            "INSERT INTO health_entries (
                uuid,
                animal_uuid,
                kind,
                vaccination_type,
                description,
                veterinarian,
                cost,
                scheduled_at,
                completed_at,
                status,
                notes,
                annotations,
                follow_up_of,
                version,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16);",
            params![
                entry.id.to_string(),
                entry.animal_id.to_string(),
                entry.kind.as_str(),
                entry.vaccination_type.as_str(),
                entry.description.as_str(),
                entry.veterinarian.as_deref(),
                entry.cost,
                entry.scheduled_date.map(to_epoch_ms),
                entry.completed_date.map(to_epoch_ms),
                entry.status.as_str(),
                entry.notes.as_str(),
                annotations,
                entry.follow_up_of.map(|id| id.to_string()),
                entry.version,
                to_epoch_ms(entry.created_at),
                to_epoch_ms(entry.updated_at),
            ],
        )?;
        Ok(())
    }

    fn update(&self, entry: &VaccinationEntry, annotations: &str) -> RepoResult<()> {
        let expected = entry.version - 1;
        let changed = self.conn.execute(
            "UPDATE health_entries
             SET
                kind = ?3,
                vaccination_type = ?4,
                description = ?5,
                veterinarian = ?6,
                cost = ?7,
                scheduled_at = ?8,
                completed_at = ?9,
                status = ?10,
                notes = ?11,
                annotations = ?12,
                follow_up_of = ?13,
                version = ?14,
                updated_at = ?15
             WHERE uuid = ?1
               AND version = ?2;",
            params![
                entry.id.to_string(),
                expected,
                entry.kind.as_str(),
                entry.vaccination_type.as_str(),
                entry.description.as_str(),
                entry.veterinarian.as_deref(),
                entry.cost,
                entry.scheduled_date.map(to_epoch_ms),
                entry.completed_date.map(to_epoch_ms),
                entry.status.as_str(),
                entry.notes.as_str(),
                annotations,
                entry.follow_up_of.map(|id| id.to_string()),
                entry.version,
                to_epoch_ms(entry.updated_at),
            ],
        )?;

        if changed == 0 {
            return match self.stored_version(entry.id)? {
                Some(actual) => Err(RepoError::VersionConflict {
                    id: entry.id,
                    expected,
                    actual,
                }),
                None => Err(RepoError::NotFound(entry.id)),
            };
        }
        Ok(())
    }
}

impl VaccinationStore for SqliteVaccinationStore<'_> {
    fn save(&self, entry: &VaccinationEntry) -> RepoResult<()> {
        entry.validate()?;
        let annotations = serde_json::to_string(&entry.annotations).map_err(|err| {
            RepoError::InvalidData(format!("failed to encode annotations: {err}"))
        })?;

        if entry.version == 1 {
            self.insert(entry, &annotations)
        } else {
            self.update(entry, &annotations)
        }
    }

    fn find_by_id(&self, id: EntryId) -> RepoResult<Option<VaccinationEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_entry_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_animal(&self, animal_id: AnimalId) -> RepoResult<Vec<VaccinationEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT_SQL}
             WHERE animal_uuid = ?1
             ORDER BY COALESCE(completed_at, scheduled_at, created_at) DESC,
                      created_at DESC,
                      uuid ASC;"
        ))?;
        let mut rows = stmt.query([animal_id.to_string()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<VaccinationEntry> {
    let uuid_text: String = row.get("uuid")?;
    let animal_text: String = row.get("animal_uuid")?;

    let kind_text: String = row.get("kind")?;
    let kind = RecordKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid kind `{kind_text}` in health_entries.kind"))
    })?;

    let status_text: String = row.get("status")?;
    let status = VaccinationStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in health_entries.status"
        ))
    })?;

    let annotations_text: String = row.get("annotations")?;
    let annotations: Vec<Annotation> = serde_json::from_str(&annotations_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid annotations in health_entries.annotations: {err}"
        ))
    })?;

    let follow_up_of = row
        .get::<_, Option<String>>("follow_up_of")?
        .map(|value| parse_uuid(&value, "health_entries.follow_up_of"))
        .transpose()?;

    let entry = VaccinationEntry {
        id: parse_uuid(&uuid_text, "health_entries.uuid")?,
        animal_id: parse_uuid(&animal_text, "health_entries.animal_uuid")?,
        kind,
        vaccination_type: row.get("vaccination_type")?,
        description: row.get("description")?,
        veterinarian: row.get("veterinarian")?,
        cost: row.get("cost")?,
        scheduled_date: from_optional_epoch_ms(
            row.get("scheduled_at")?,
            "health_entries.scheduled_at",
        )?,
        completed_date: from_optional_epoch_ms(
            row.get("completed_at")?,
            "health_entries.completed_at",
        )?,
        status,
        notes: row.get("notes")?,
        annotations,
        follow_up_of,
        version: row.get("version")?,
        created_at: from_epoch_ms(row.get("created_at")?, "health_entries.created_at")?,
        updated_at: from_epoch_ms(row.get("updated_at")?, "health_entries.updated_at")?,
    };
    entry.validate()?;
    Ok(entry)
}
