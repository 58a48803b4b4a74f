use chrono::{DateTime, Duration, TimeZone, Utc};
use farmstead_core::db::open_db_in_memory;
use farmstead_core::{
    Animal, AnimalGroup, Annotation, AnnotationKind, RecordKind, RepoError, ScheduleItem,
    SqliteAnimalDirectory, SqliteVaccinationStore, VaccinationEntry, VaccinationStatus,
    VaccinationStore,
};
use rusqlite::Connection;
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap()
}

fn seed_animal(conn: &Connection) -> Animal {
    let directory = SqliteAnimalDirectory::try_new(conn).unwrap();
    let group = AnimalGroup::new(Uuid::new_v4(), "Dairy", "cattle");
    directory.create_group(&group).unwrap();
    let animal = Animal::new(group.id, "D-1", now());
    directory.add_animal(&animal).unwrap();
    animal
}

fn entry_for(animal: &Animal, vaccination_type: &str, days_from_now: i64) -> VaccinationEntry {
    let item = ScheduleItem::new(vaccination_type, "routine dose", now());
    VaccinationEntry::scheduled(
        animal.id,
        &item,
        now() + Duration::days(days_from_now),
        now(),
    )
}

#[test]
fn save_and_find_roundtrip_preserves_annotations() {
    let conn = open_db_in_memory().unwrap();
    let animal = seed_animal(&conn);
    let store = SqliteVaccinationStore::try_new(&conn).unwrap();

    let mut entry = entry_for(&animal, "Clostridial 7-in-1", 10);
    entry.veterinarian = Some("Dr. Okafor".to_string());
    entry.cost = Some(4.75);
    store.save(&entry).unwrap();

    let mut annotation = Annotation::new(AnnotationKind::Rescheduled, now());
    annotation.from_date = entry.scheduled_date;
    annotation.to_date = Some(now() + Duration::days(12));
    annotation.reason = Some("vet unavailable".to_string());
    entry.scheduled_date = annotation.to_date;
    entry.status = VaccinationStatus::Rescheduled;
    entry.record_transition(annotation);
    store.save(&entry).unwrap();

    let loaded = store.find_by_id(entry.id).unwrap().unwrap();
    assert_eq!(loaded, entry);
    assert_eq!(loaded.version, 2);
    assert_eq!(loaded.annotations.len(), 1);
    assert_eq!(loaded.annotations[0].reason.as_deref(), Some("vet unavailable"));
}

#[test]
fn stale_update_is_a_version_conflict() {
    let conn = open_db_in_memory().unwrap();
    let animal = seed_animal(&conn);
    let store = SqliteVaccinationStore::try_new(&conn).unwrap();

    let entry = entry_for(&animal, "Leptospirosis", 3);
    store.save(&entry).unwrap();

    let mut first = entry.clone();
    first.append_note("first writer");
    first.record_transition(Annotation::new(AnnotationKind::Rescheduled, now()));
    store.save(&first).unwrap();

    let mut second = entry.clone();
    second.append_note("second writer");
    second.record_transition(Annotation::new(AnnotationKind::Cancelled, now()));
    let err = store.save(&second).unwrap_err();
    assert!(matches!(
        err,
        RepoError::VersionConflict {
            expected: 1,
            actual: 2,
            ..
        }
    ));

    let stored = store.find_by_id(entry.id).unwrap().unwrap();
    assert_eq!(stored.notes, "first writer");
}

#[test]
fn inserting_same_entry_twice_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let animal = seed_animal(&conn);
    let store = SqliteVaccinationStore::try_new(&conn).unwrap();

    let entry = entry_for(&animal, "BVD", 5);
    store.save(&entry).unwrap();
    let err = store.save(&entry).unwrap_err();
    assert!(matches!(err, RepoError::VersionConflict { .. }));
}

#[test]
fn updating_unknown_entry_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let animal = seed_animal(&conn);
    let store = SqliteVaccinationStore::try_new(&conn).unwrap();

    let mut entry = entry_for(&animal, "BVD", 5);
    entry.record_transition(Annotation::new(AnnotationKind::Cancelled, now()));
    let err = store.save(&entry).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == entry.id));
}

#[test]
fn invalid_entries_are_never_written() {
    let conn = open_db_in_memory().unwrap();
    let animal = seed_animal(&conn);
    let store = SqliteVaccinationStore::try_new(&conn).unwrap();

    let mut blank_type = entry_for(&animal, "   ", 5);
    blank_type.vaccination_type = "   ".to_string();
    assert!(matches!(
        store.save(&blank_type).unwrap_err(),
        RepoError::EntryValidation(_)
    ));

    let mut completed_without_date = entry_for(&animal, "IBR", 5);
    completed_without_date.status = VaccinationStatus::Completed;
    assert!(matches!(
        store.save(&completed_without_date).unwrap_err(),
        RepoError::EntryValidation(_)
    ));

    assert!(store.find_by_animal(animal.id).unwrap().is_empty());
}

#[test]
fn find_by_animal_returns_most_recent_first() {
    let conn = open_db_in_memory().unwrap();
    let animal = seed_animal(&conn);
    let store = SqliteVaccinationStore::try_new(&conn).unwrap();

    let older = entry_for(&animal, "Anthrax", -40);
    let newer = entry_for(&animal, "Anthrax", 20);
    let mut treatment = entry_for(&animal, "", 0);
    treatment.kind = RecordKind::Treatment;
    treatment.vaccination_type = String::new();
    treatment.scheduled_date = None;
    for entry in [&older, &newer, &treatment] {
        store.save(entry).unwrap();
    }

    let ids: Vec<Uuid> = store
        .find_by_animal(animal.id)
        .unwrap()
        .into_iter()
        .map(|entry| entry.id)
        .collect();
    assert_eq!(ids, vec![newer.id, treatment.id, older.id]);

    assert!(store.find_by_animal(Uuid::new_v4()).unwrap().is_empty());
}
