use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use farmstead_core::db::open_db_in_memory;
use farmstead_core::{
    Animal, AnimalFilter, AnimalGroup, AnimalId, BulkOutcome, BulkScheduleOptions,
    BulkScheduleRequest, BulkTarget, EngineConfig, EntryId, FixedClock, HealthStatus, RepoError,
    RepoResult, ScheduleItem, SqliteAnimalDirectory, SqliteVaccinationStore, VaccinationEntry,
    VaccinationError, VaccinationService, VaccinationStatus, VaccinationStore,
};
use rusqlite::Connection;
use std::cell::Cell;
use std::time::Duration as StdDuration;
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap()
}

/// Wraps a store, counting writes and failing saves for selected types.
struct RecordingStore<S> {
    inner: S,
    saves: Cell<usize>,
    failing_types: Vec<String>,
    save_delay: Option<StdDuration>,
}

impl<S> RecordingStore<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            saves: Cell::new(0),
            failing_types: Vec::new(),
            save_delay: None,
        }
    }

    fn failing(mut self, vaccination_type: &str) -> Self {
        self.failing_types.push(vaccination_type.to_string());
        self
    }

    fn slow(mut self, delay: StdDuration) -> Self {
        self.save_delay = Some(delay);
        self
    }
}

impl<S: VaccinationStore> VaccinationStore for RecordingStore<S> {
    fn save(&self, entry: &VaccinationEntry) -> RepoResult<()> {
        self.saves.set(self.saves.get() + 1);
        if let Some(delay) = self.save_delay {
            std::thread::sleep(delay);
        }
        if self
            .failing_types
            .iter()
            .any(|failing| failing == &entry.vaccination_type)
        {
            return Err(RepoError::InvalidData("disk full".to_string()));
        }
        self.inner.save(entry)
    }

    fn find_by_id(&self, id: EntryId) -> RepoResult<Option<VaccinationEntry>> {
        self.inner.find_by_id(id)
    }

    fn find_by_animal(&self, animal_id: AnimalId) -> RepoResult<Vec<VaccinationEntry>> {
        self.inner.find_by_animal(animal_id)
    }
}

struct Paddocks {
    farm_id: Uuid,
    angus: AnimalGroup,
    hereford: AnimalGroup,
    empty: AnimalGroup,
    animals: Vec<Animal>,
}

/// Two stocked groups of two animals each plus one empty group.
fn seed_paddocks(conn: &Connection) -> Paddocks {
    let directory = SqliteAnimalDirectory::try_new(conn).unwrap();
    let farm_id = Uuid::new_v4();
    let angus = AnimalGroup::new(farm_id, "Angus paddock", "cattle");
    let hereford = AnimalGroup::new(farm_id, "Hereford paddock", "cattle");
    let empty = AnimalGroup::new(farm_id, "Yards", "cattle");
    for group in [&angus, &hereford, &empty] {
        directory.create_group(group).unwrap();
    }

    let specs = [
        (&angus, "A-1", "Angus", 400, HealthStatus::Healthy),
        (&angus, "A-2", "Angus", 90, HealthStatus::Sick),
        (&hereford, "H-1", "Hereford", 700, HealthStatus::Healthy),
        (&hereford, "H-2", "Hereford", 30, HealthStatus::Healthy),
    ];
    let animals = specs
        .into_iter()
        .map(|(group, tag, breed, age_days, health)| {
            let mut animal = Animal::new(group.id, tag, now());
            animal.breed = Some(breed.to_string());
            animal.birth_date = Some(now().date_naive() - Duration::days(age_days));
            animal.health_status = health;
            directory.add_animal(&animal).unwrap();
            animal
        })
        .collect();

    Paddocks {
        farm_id,
        angus,
        hereford,
        empty,
        animals,
    }
}

fn history(conn: &Connection, animal: &Animal, vaccination_type: &str, days_ago: i64) -> VaccinationEntry {
    let store = SqliteVaccinationStore::try_new(conn).unwrap();
    let item = ScheduleItem::new(vaccination_type, "earlier dose", now());
    let mut entry = VaccinationEntry::scheduled(
        animal.id,
        &item,
        now() - Duration::days(days_ago + 1),
        now() - Duration::days(days_ago + 1),
    );
    store.save(&entry).unwrap();
    entry.status = VaccinationStatus::Completed;
    entry.completed_date = Some(now() - Duration::days(days_ago));
    entry.version += 1;
    store.save(&entry).unwrap();
    entry
}

fn item(vaccination_type: &str, cost: f64) -> ScheduleItem {
    ScheduleItem::new(vaccination_type, "bulk dose", now() + Duration::days(7)).with_estimated_cost(cost)
}

fn service<'c, S: VaccinationStore>(
    conn: &'c Connection,
    store: S,
) -> VaccinationService<SqliteAnimalDirectory<'c>, S> {
    VaccinationService::new(SqliteAnimalDirectory::try_new(conn).unwrap(), store)
        .with_clock(FixedClock(now()))
}

#[test]
fn recently_vaccinated_animals_are_skipped() {
    let conn = open_db_in_memory().unwrap();
    let paddocks = seed_paddocks(&conn);
    let a1 = &paddocks.animals[0];
    let a2 = &paddocks.animals[1];
    let recent = history(&conn, a1, "FMD", 10);
    history(&conn, a2, "FMD", 45);

    let store = SqliteVaccinationStore::try_new(&conn).unwrap();
    let result = service(&conn, &store)
        .bulk_schedule(&BulkScheduleRequest {
            target: BulkTarget::Groups(vec![paddocks.angus.id]),
            items: vec![item("FMD booster", 6.0)],
            options: BulkScheduleOptions {
                skip_if_recently_vaccinated: true,
                recent_vaccination_days: Some(30),
                ..BulkScheduleOptions::default()
            },
        })
        .unwrap();

    assert_eq!(result.outcome, BulkOutcome::Completed);
    assert_eq!(result.results.len(), 2);

    let first = &result.results[0];
    assert_eq!(first.animal_id, a1.id);
    assert!(first.scheduled.is_empty());
    assert_eq!(first.skipped.len(), 1);
    assert!(first.skipped[0].reason.contains("30 days"));
    assert_eq!(first.skipped[0].matched_entry, recent.id);
    assert_eq!(store.find_by_animal(a1.id).unwrap().len(), 1);

    let second = &result.results[1];
    assert_eq!(second.scheduled.len(), 1);
    assert!(second.skipped.is_empty());
    assert_eq!(store.find_by_animal(a2.id).unwrap().len(), 2);

    assert_eq!(result.totals.processed, 2);
    assert_eq!(result.totals.scheduled, 1);
    assert_eq!(result.totals.skipped, 1);
    let fmd = &result.summary.by_vaccination_type["FMD booster"];
    assert_eq!((fmd.scheduled, fmd.skipped, fmd.errors), (1, 1, 0));
}

#[test]
fn cancelled_history_does_not_suppress_scheduling() {
    let conn = open_db_in_memory().unwrap();
    let paddocks = seed_paddocks(&conn);
    let animal = &paddocks.animals[2];
    let store = SqliteVaccinationStore::try_new(&conn).unwrap();

    let earlier = ScheduleItem::new("Pinkeye", "dose", now() - Duration::days(2));
    let mut cancelled = VaccinationEntry::scheduled(animal.id, &earlier, earlier.scheduled_date, now());
    store.save(&cancelled).unwrap();
    cancelled.status = VaccinationStatus::Cancelled;
    cancelled.version += 1;
    store.save(&cancelled).unwrap();

    let result = service(&conn, &store)
        .bulk_schedule(&BulkScheduleRequest {
            target: BulkTarget::Animals(vec![animal.id]),
            items: vec![item("pinkeye", 2.0)],
            options: BulkScheduleOptions {
                skip_if_recently_vaccinated: true,
                ..BulkScheduleOptions::default()
            },
        })
        .unwrap();

    assert_eq!(result.totals.scheduled, 1);
    assert_eq!(result.totals.skipped, 0);
}

#[test]
fn empty_targets_fail_without_touching_the_store() {
    let conn = open_db_in_memory().unwrap();
    let paddocks = seed_paddocks(&conn);
    let recording = RecordingStore::new(SqliteVaccinationStore::try_new(&conn).unwrap());

    let engine = service(&conn, &recording);
    let err = engine
        .bulk_schedule(&BulkScheduleRequest {
            target: BulkTarget::Groups(vec![paddocks.empty.id]),
            items: vec![item("Anthrax", 1.0)],
            options: BulkScheduleOptions::default(),
        })
        .unwrap_err();
    assert!(matches!(err, VaccinationError::EmptyTarget(_)));

    let err = engine
        .bulk_schedule(&BulkScheduleRequest {
            target: BulkTarget::Farm(paddocks.farm_id),
            items: vec![item("Anthrax", 1.0)],
            options: BulkScheduleOptions {
                filter: Some(AnimalFilter {
                    breed: Some("Wagyu".to_string()),
                    ..AnimalFilter::default()
                }),
                ..BulkScheduleOptions::default()
            },
        })
        .unwrap_err();
    assert!(matches!(err, VaccinationError::EmptyTarget(_)));

    let err = engine
        .bulk_schedule(&BulkScheduleRequest {
            target: BulkTarget::Farm(Uuid::new_v4()),
            items: vec![item("Anthrax", 1.0)],
            options: BulkScheduleOptions::default(),
        })
        .unwrap_err();
    assert!(matches!(err, VaccinationError::EmptyTarget(_)));

    assert_eq!(recording.saves.get(), 0);
}

#[test]
fn unknown_ids_and_oversized_runs_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let paddocks = seed_paddocks(&conn);
    let recording = RecordingStore::new(SqliteVaccinationStore::try_new(&conn).unwrap());

    let err = service(&conn, &recording)
        .bulk_schedule(&BulkScheduleRequest {
            target: BulkTarget::Groups(vec![paddocks.angus.id, Uuid::new_v4()]),
            items: vec![item("Anthrax", 1.0)],
            options: BulkScheduleOptions::default(),
        })
        .unwrap_err();
    assert!(matches!(err, VaccinationError::NotFound { .. }));

    let mut config = EngineConfig::default();
    config.bulk.max_batch_size = 3;
    let err = service(&conn, &recording)
        .with_config(config)
        .bulk_schedule(&BulkScheduleRequest {
            target: BulkTarget::Groups(vec![paddocks.angus.id]),
            items: vec![item("Anthrax", 1.0), item("Blackleg", 1.0)],
            options: BulkScheduleOptions::default(),
        })
        .unwrap_err();
    assert!(matches!(err, VaccinationError::Validation(_)));

    assert_eq!(recording.saves.get(), 0);
}

#[test]
fn item_failures_are_isolated_per_animal() {
    let conn = open_db_in_memory().unwrap();
    let paddocks = seed_paddocks(&conn);
    let recording = RecordingStore::new(SqliteVaccinationStore::try_new(&conn).unwrap()).failing("Blackleg");

    let mut negative = item("Lepto", 1.0);
    negative.estimated_cost = Some(-5.0);

    let result = service(&conn, &recording)
        .bulk_schedule(&BulkScheduleRequest {
            target: BulkTarget::Groups(vec![paddocks.hereford.id]),
            items: vec![item("Anthrax", 2.5), item("Blackleg", 1.0), negative],
            options: BulkScheduleOptions::default(),
        })
        .unwrap();

    assert_eq!(result.outcome, BulkOutcome::PartialFailure);
    assert_eq!(result.totals.processed, 2);
    assert_eq!(result.totals.scheduled, 2);
    assert_eq!(result.totals.errors, 4);
    assert_eq!(recording.saves.get(), 4);

    for animal_result in &result.results {
        assert_eq!(animal_result.scheduled.len(), 1);
        assert_eq!(animal_result.scheduled[0].vaccination_type, "Anthrax");
        let failed: Vec<&str> = animal_result
            .errors
            .iter()
            .map(|error| error.vaccination_type.as_str())
            .collect();
        assert_eq!(failed, vec!["Blackleg", "Lepto"]);
    }

    let err = result.ensure_complete().unwrap_err();
    assert!(matches!(
        err,
        VaccinationError::PartialFailure {
            processed: 2,
            errors: 4
        }
    ));
}

#[test]
fn filters_narrow_population_and_summaries_group_results() {
    let conn = open_db_in_memory().unwrap();
    let paddocks = seed_paddocks(&conn);
    let store = SqliteVaccinationStore::try_new(&conn).unwrap();

    let result = service(&conn, &store)
        .bulk_schedule(&BulkScheduleRequest {
            target: BulkTarget::Farm(paddocks.farm_id),
            items: vec![item("Anthrax", 2.5), item("Blackleg", 1.5)],
            options: BulkScheduleOptions {
                filter: Some(AnimalFilter {
                    age_min_days: Some(60),
                    health_statuses: vec![HealthStatus::Healthy],
                    ..AnimalFilter::default()
                }),
                ..BulkScheduleOptions::default()
            },
        })
        .unwrap()
        .ensure_complete()
        .unwrap();

    let tags: Vec<&str> = result
        .results
        .iter()
        .map(|animal_result| animal_result.animal_tag.as_str())
        .collect();
    assert_eq!(tags, vec!["A-1", "H-1"]);

    assert_eq!(result.totals.scheduled, 4);
    assert_eq!(result.summary.total_estimated_cost, 8.0);
    assert_eq!(result.summary.by_vaccination_type["Anthrax"].estimated_cost, 5.0);
    assert_eq!(result.summary.by_vaccination_type["Blackleg"].scheduled, 2);

    let angus = &result.summary.by_group[&paddocks.angus.id];
    assert_eq!((angus.animals, angus.scheduled), (1, 2));
    assert_eq!(angus.estimated_cost, 4.0);
    assert!(!result.summary.by_group.contains_key(&paddocks.empty.id));

    let breed_only = service(&conn, &store)
        .bulk_schedule(&BulkScheduleRequest {
            target: BulkTarget::Farm(paddocks.farm_id),
            items: vec![item("Pinkeye", 1.0)],
            options: BulkScheduleOptions {
                filter: Some(AnimalFilter {
                    breed: Some("hereford".to_string()),
                    age_max_days: Some(100),
                    ..AnimalFilter::default()
                }),
                ..BulkScheduleOptions::default()
            },
        })
        .unwrap();
    assert_eq!(breed_only.results.len(), 1);
    assert_eq!(breed_only.results[0].animal_tag, "H-2");
}

#[test]
fn exhausted_time_budget_is_a_timeout() {
    let conn = open_db_in_memory().unwrap();
    let paddocks = seed_paddocks(&conn);
    let recording = RecordingStore::new(SqliteVaccinationStore::try_new(&conn).unwrap());

    let mut config = EngineConfig::default();
    config.bulk.max_duration_ms = 0;
    let err = service(&conn, &recording)
        .with_config(config)
        .bulk_schedule(&BulkScheduleRequest {
            target: BulkTarget::Farm(paddocks.farm_id),
            items: vec![item("Anthrax", 1.0)],
            options: BulkScheduleOptions::default(),
        })
        .unwrap_err();
    match err {
        VaccinationError::Timeout { partial, .. } => {
            assert_eq!(partial.totals.processed, 0);
            assert!(partial.results.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(recording.saves.get(), 0);
}

#[test]
fn timeout_reports_animals_processed_before_the_budget_ran_out() {
    let conn = open_db_in_memory().unwrap();
    let paddocks = seed_paddocks(&conn);
    let recording = RecordingStore::new(SqliteVaccinationStore::try_new(&conn).unwrap())
        .slow(StdDuration::from_millis(600));

    let mut config = EngineConfig::default();
    config.bulk.max_duration_ms = 300;
    let err = service(&conn, &recording)
        .with_config(config)
        .bulk_schedule(&BulkScheduleRequest {
            target: BulkTarget::Groups(vec![paddocks.angus.id]),
            items: vec![item("Anthrax", 1.0)],
            options: BulkScheduleOptions::default(),
        })
        .unwrap_err();

    let partial = match err {
        VaccinationError::Timeout { partial, .. } => partial,
        other => panic!("unexpected error: {other}"),
    };
    assert_eq!(partial.totals.processed, 1);
    assert_eq!(partial.results[0].animal_id, paddocks.animals[0].id);
    let written = &partial.results[0].scheduled[0];
    assert_eq!(recording.find_by_id(written.id).unwrap().unwrap(), *written);
    assert!(recording
        .find_by_animal(paddocks.animals[1].id)
        .unwrap()
        .is_empty());
}

#[test]
fn blank_item_type_is_an_error_even_with_matching_history() {
    let conn = open_db_in_memory().unwrap();
    let paddocks = seed_paddocks(&conn);
    let animal = &paddocks.animals[2];
    history(&conn, animal, "FMD", 5);
    let store = SqliteVaccinationStore::try_new(&conn).unwrap();

    let result = service(&conn, &store)
        .bulk_schedule(&BulkScheduleRequest {
            target: BulkTarget::Animals(vec![animal.id]),
            items: vec![item("   ", 1.0), item("FMD", 1.0)],
            options: BulkScheduleOptions {
                skip_if_recently_vaccinated: true,
                ..BulkScheduleOptions::default()
            },
        })
        .unwrap();

    let animal_result = &result.results[0];
    assert_eq!(animal_result.errors.len(), 1);
    assert_eq!(animal_result.errors[0].vaccination_type, "");
    assert_eq!(animal_result.skipped.len(), 1);
    assert_eq!(animal_result.skipped[0].vaccination_type, "FMD");
    assert!(animal_result.scheduled.is_empty());
    assert_eq!(result.outcome, BulkOutcome::PartialFailure);
}

#[test]
fn birth_dates_drive_age_filters() {
    let animal = {
        let mut animal = Animal::new(Uuid::new_v4(), "Z-1", now());
        animal.birth_date = NaiveDate::from_ymd_opt(2026, 5, 1);
        animal
    };
    let today = now().date_naive();

    let young = AnimalFilter {
        age_max_days: Some(31),
        ..AnimalFilter::default()
    };
    assert!(young.matches(&animal, today));

    let older = AnimalFilter {
        age_min_days: Some(32),
        ..AnimalFilter::default()
    };
    assert!(!older.matches(&animal, today));
}
