//! Herd directory contract and SQLite implementation.
//!
//! # Responsibility
//! - Resolve farm -> groups -> animals for the scheduling engine.
//! - Keep `animal_groups.current_count` in step with membership.
//!
//! # Invariants
//! - Group listing is deterministic: `name ASC, uuid ASC`.
//! - Animal listing is deterministic: `tag ASC, uuid ASC`.
//! - Adding or removing an animal rewrites the group count in the same
//!   transaction as the membership change.

use crate::model::animal::{Animal, AnimalGroup, HealthStatus, Sex};
use crate::model::{AnimalId, FarmId, GroupId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sql::{
    birth_date_to_db, ensure_schema_ready, from_epoch_ms, parse_birth_date, parse_uuid,
    to_epoch_ms,
};
use log::info;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const GROUP_SELECT_SQL: &str = "SELECT
    uuid,
    farm_uuid,
    name,
    species,
    breed,
    current_count
FROM animal_groups";

const ANIMAL_SELECT_SQL: &str = "SELECT
    uuid,
    group_uuid,
    tag,
    name,
    sex,
    birth_date,
    breed,
    weight,
    health_status,
    created_at,
    updated_at
FROM animals";

/// Read side of the herd directory, as consumed by the engine.
pub trait AnimalDirectory {
    fn get_animal(&self, id: AnimalId) -> RepoResult<Option<Animal>>;
    fn list_animals_by_group(&self, group_id: GroupId) -> RepoResult<Vec<Animal>>;
    fn list_groups_by_farm(&self, farm_id: FarmId) -> RepoResult<Vec<AnimalGroup>>;
    fn get_group(&self, id: GroupId) -> RepoResult<Option<AnimalGroup>>;
    fn update_group_count(&self, id: GroupId, new_count: u32) -> RepoResult<()>;
}

impl<T: AnimalDirectory + ?Sized> AnimalDirectory for &T {
    fn get_animal(&self, id: AnimalId) -> RepoResult<Option<Animal>> {
        (**self).get_animal(id)
    }

    fn list_animals_by_group(&self, group_id: GroupId) -> RepoResult<Vec<Animal>> {
        (**self).list_animals_by_group(group_id)
    }

    fn list_groups_by_farm(&self, farm_id: FarmId) -> RepoResult<Vec<AnimalGroup>> {
        (**self).list_groups_by_farm(farm_id)
    }

    fn get_group(&self, id: GroupId) -> RepoResult<Option<AnimalGroup>> {
        (**self).get_group(id)
    }

    fn update_group_count(&self, id: GroupId, new_count: u32) -> RepoResult<()> {
        (**self).update_group_count(id, new_count)
    }
}

/// SQLite-backed herd directory.
pub struct SqliteAnimalDirectory<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAnimalDirectory<'conn> {
    /// Creates a directory over a fully migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Inserts a new, empty group.
    pub fn create_group(&self, group: &AnimalGroup) -> RepoResult<GroupId> {
        group.validate()?;
        self.conn.execute(
            "INSERT INTO animal_groups (
                uuid,
                farm_uuid,
                name,
                species,
                breed,
                current_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0);",
            params![
                group.id.to_string(),
                group.farm_id.to_string(),
                group.name.trim(),
                group.species.trim(),
                group.breed.as_deref(),
            ],
        )?;
        Ok(group.id)
    }

    /// Adds an animal to its group and refreshes the group count atomically.
    pub fn add_animal(&self, animal: &Animal) -> RepoResult<AnimalId> {
        animal.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_group(&tx, animal.group_id)?.is_none() {
            return Err(RepoError::NotFound(animal.group_id));
        }

        let tag = animal.tag.trim();
        let tag_taken: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM animals WHERE group_uuid = ?1 AND tag = ?2);",
            params![animal.group_id.to_string(), tag],
            |row| row.get(0),
        )?;
        if tag_taken == 1 {
            return Err(RepoError::DuplicateTag {
                group_id: animal.group_id,
                tag: tag.to_string(),
            });
        }

        tx.execute(
            "INSERT INTO animals (
                uuid,
                group_uuid,
                tag,
                name,
                sex,
                birth_date,
                breed,
                weight,
                health_status,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                animal.id.to_string(),
                animal.group_id.to_string(),
                tag,
                animal.name.as_deref(),
                animal.sex.as_str(),
                animal.birth_date.map(birth_date_to_db),
                animal.breed.as_deref(),
                animal.weight,
                animal.health_status.as_str(),
                to_epoch_ms(animal.created_at),
                to_epoch_ms(animal.updated_at),
            ],
        )?;
        let count = recount_group(&tx, animal.group_id)?;
        tx.commit()?;

        info!(
            "event=animal_add module=directory status=ok group_id={} group_count={}",
            animal.group_id, count
        );
        Ok(animal.id)
    }

    /// Removes an animal and refreshes its group count atomically.
    pub fn remove_animal(&self, id: AnimalId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let group_id = match load_animal(&tx, id)? {
            Some(animal) => animal.group_id,
            None => return Err(RepoError::NotFound(id)),
        };

        tx.execute("DELETE FROM animals WHERE uuid = ?1;", [id.to_string()])?;
        let count = recount_group(&tx, group_id)?;
        tx.commit()?;

        info!(
            "event=animal_remove module=directory status=ok group_id={group_id} group_count={count}"
        );
        Ok(())
    }
}

impl AnimalDirectory for SqliteAnimalDirectory<'_> {
    fn get_animal(&self, id: AnimalId) -> RepoResult<Option<Animal>> {
        load_animal(self.conn, id)
    }

    fn list_animals_by_group(&self, group_id: GroupId) -> RepoResult<Vec<Animal>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ANIMAL_SELECT_SQL}
             WHERE group_uuid = ?1
             ORDER BY tag ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([group_id.to_string()])?;
        let mut animals = Vec::new();
        while let Some(row) = rows.next()? {
            animals.push(parse_animal_row(row)?);
        }
        Ok(animals)
    }

    fn list_groups_by_farm(&self, farm_id: FarmId) -> RepoResult<Vec<AnimalGroup>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GROUP_SELECT_SQL}
             WHERE farm_uuid = ?1
             ORDER BY name ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([farm_id.to_string()])?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row)?);
        }
        Ok(groups)
    }

    fn get_group(&self, id: GroupId) -> RepoResult<Option<AnimalGroup>> {
        load_group(self.conn, id)
    }

    fn update_group_count(&self, id: GroupId, new_count: u32) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE animal_groups
             SET
                current_count = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), i64::from(new_count)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn load_group(conn: &Connection, id: GroupId) -> RepoResult<Option<AnimalGroup>> {
    let mut stmt = conn.prepare(&format!("{GROUP_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_group_row(row)?)),
        None => Ok(None),
    }
}

fn load_animal(conn: &Connection, id: AnimalId) -> RepoResult<Option<Animal>> {
    let mut stmt = conn.prepare(&format!("{ANIMAL_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_animal_row(row)?)),
        None => Ok(None),
    }
}

fn recount_group(conn: &Connection, group_id: GroupId) -> RepoResult<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM animals WHERE group_uuid = ?1;",
        [group_id.to_string()],
        |row| row.get(0),
    )?;
    conn.execute(
        "UPDATE animal_groups
         SET
            current_count = ?2,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        params![group_id.to_string(), i64::from(count)],
    )?;
    Ok(count)
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<AnimalGroup> {
    let uuid_text: String = row.get("uuid")?;
    let farm_text: String = row.get("farm_uuid")?;
    let current_count: i64 = row.get("current_count")?;
    let current_count = u32::try_from(current_count).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid count `{current_count}` in animal_groups.current_count"
        ))
    })?;

    Ok(AnimalGroup {
        id: parse_uuid(&uuid_text, "animal_groups.uuid")?,
        farm_id: parse_uuid(&farm_text, "animal_groups.farm_uuid")?,
        name: row.get("name")?,
        species: row.get("species")?,
        breed: row.get("breed")?,
        current_count,
    })
}

fn parse_animal_row(row: &Row<'_>) -> RepoResult<Animal> {
    let uuid_text: String = row.get("uuid")?;
    let group_text: String = row.get("group_uuid")?;

    let sex_text: String = row.get("sex")?;
    let sex = Sex::parse(&sex_text)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid sex `{sex_text}` in animals.sex")))?;

    let status_text: String = row.get("health_status")?;
    let health_status = HealthStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid health status `{status_text}` in animals.health_status"
        ))
    })?;

    let birth_date = row
        .get::<_, Option<String>>("birth_date")?
        .map(|value| parse_birth_date(&value))
        .transpose()?;

    let animal = Animal {
        id: parse_uuid(&uuid_text, "animals.uuid")?,
        tag: row.get("tag")?,
        name: row.get("name")?,
        group_id: parse_uuid(&group_text, "animals.group_uuid")?,
        sex,
        birth_date,
        breed: row.get("breed")?,
        weight: row.get("weight")?,
        health_status,
        created_at: from_epoch_ms(row.get("created_at")?, "animals.created_at")?,
        updated_at: from_epoch_ms(row.get("updated_at")?, "animals.updated_at")?,
    };
    animal.validate()?;
    Ok(animal)
}
