//! Bulk scheduling across a resolved animal population.
//!
//! # Responsibility
//! - Resolve farm / groups / animals into a target set and filter it.
//! - Apply every schedule item to every animal, skipping recent matches.
//! - Isolate per-item failures inside the result.
//!
//! # Invariants
//! - Empty target sets fail `EmptyTarget` before any store write.
//! - Results are reported in input order regardless of outcome.
//! - Only `EmptyTarget`, `NotFound`, `Validation` of the whole request and
//!   `Timeout` fail the call; everything else lands in per-animal errors.

use crate::model::animal::{Animal, HealthStatus};
use crate::model::vaccination::{
    contains_ignore_case, ScheduleItem, VaccinationEntry, VaccinationStatus,
};
use crate::model::{AnimalId, EntryId, FarmId, GroupId};
use crate::repo::directory_repo::AnimalDirectory;
use crate::repo::error::RepoResult;
use crate::repo::vaccination_repo::VaccinationStore;
use crate::service::error::{VaccinationError, VaccinationResult};
use crate::service::scope::{Scope, ScopedAnimal};
use crate::service::VaccinationService;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::{info, warn};
use std::collections::BTreeMap;
use std::time::Instant;

/// Population a bulk run starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkTarget {
    Farm(FarmId),
    Groups(Vec<GroupId>),
    Animals(Vec<AnimalId>),
}

/// Narrows the resolved population. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimalFilter {
    /// Case-insensitive exact breed match.
    pub breed: Option<String>,
    pub age_min_days: Option<i64>,
    pub age_max_days: Option<i64>,
    /// Empty means any status.
    pub health_statuses: Vec<HealthStatus>,
}

impl AnimalFilter {
    /// Animals without a birth date never match an age bound.
    pub fn matches(&self, animal: &Animal, today: NaiveDate) -> bool {
        if let Some(breed) = self.breed.as_deref().map(str::trim) {
            let animal_breed = animal.breed.as_deref().map(str::trim).unwrap_or_default();
            if !animal_breed.eq_ignore_ascii_case(breed) {
                return false;
            }
        }
        if self.age_min_days.is_some() || self.age_max_days.is_some() {
            let Some(age) = animal.age_in_days(today) else {
                return false;
            };
            if self.age_min_days.is_some_and(|min| age < min) {
                return false;
            }
            if self.age_max_days.is_some_and(|max| age > max) {
                return false;
            }
        }
        self.health_statuses.is_empty() || self.health_statuses.contains(&animal.health_status)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkScheduleOptions {
    pub filter: Option<AnimalFilter>,
    pub skip_if_recently_vaccinated: bool,
    /// `None` uses the configured default.
    pub recent_vaccination_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkScheduleRequest {
    pub target: BulkTarget,
    pub items: Vec<ScheduleItem>,
    pub options: BulkScheduleOptions,
}

/// Schedule item not applied because a matching vaccination is recent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub vaccination_type: String,
    pub reason: String,
    /// Existing entry that triggered the skip.
    pub matched_entry: EntryId,
}

/// Failure isolated to one (animal, item) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    pub vaccination_type: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimalBulkResult {
    pub animal_id: AnimalId,
    pub animal_tag: String,
    pub group_id: GroupId,
    pub scheduled: Vec<VaccinationEntry>,
    pub skipped: Vec<SkippedItem>,
    pub errors: Vec<ItemError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkTotals {
    /// Animals processed.
    pub processed: usize,
    pub scheduled: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeSummary {
    pub scheduled: usize,
    pub skipped: usize,
    pub errors: usize,
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSummary {
    pub animals: usize,
    pub scheduled: usize,
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkSummary {
    pub by_vaccination_type: BTreeMap<String, TypeSummary>,
    pub by_group: BTreeMap<GroupId, GroupSummary>,
    /// Sum over entries actually written.
    pub total_estimated_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    Completed,
    PartialFailure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkScheduleResult {
    pub results: Vec<AnimalBulkResult>,
    pub totals: BulkTotals,
    pub summary: BulkSummary,
    pub outcome: BulkOutcome,
}

impl BulkScheduleResult {
    /// Turns a partial outcome into `PartialFailure` for fail-on-any callers.
    pub fn ensure_complete(self) -> VaccinationResult<Self> {
        match self.outcome {
            BulkOutcome::Completed => Ok(self),
            BulkOutcome::PartialFailure => Err(VaccinationError::PartialFailure {
                processed: self.totals.processed,
                errors: self.totals.errors,
            }),
        }
    }

    fn from_results(results: Vec<AnimalBulkResult>) -> Self {
        let mut totals = BulkTotals::default();
        let mut summary = BulkSummary::default();

        for result in &results {
            totals.processed += 1;
            totals.scheduled += result.scheduled.len();
            totals.skipped += result.skipped.len();
            totals.errors += result.errors.len();

            let group = summary.by_group.entry(result.group_id).or_default();
            group.animals += 1;
            group.scheduled += result.scheduled.len();

            for entry in &result.scheduled {
                let cost = entry.cost.unwrap_or(0.0);
                group.estimated_cost += cost;
                summary.total_estimated_cost += cost;
                let by_type = summary
                    .by_vaccination_type
                    .entry(entry.vaccination_type.clone())
                    .or_default();
                by_type.scheduled += 1;
                by_type.estimated_cost += cost;
            }
            for skipped in &result.skipped {
                summary
                    .by_vaccination_type
                    .entry(skipped.vaccination_type.clone())
                    .or_default()
                    .skipped += 1;
            }
            for error in &result.errors {
                summary
                    .by_vaccination_type
                    .entry(error.vaccination_type.clone())
                    .or_default()
                    .errors += 1;
            }
        }

        let outcome = if totals.errors == 0 {
            BulkOutcome::Completed
        } else {
            BulkOutcome::PartialFailure
        };
        Self {
            results,
            totals,
            summary,
            outcome,
        }
    }
}

impl<D: AnimalDirectory, S: VaccinationStore> VaccinationService<D, S> {
    /// Schedules every item for every targeted animal.
    pub fn bulk_schedule(
        &self,
        request: &BulkScheduleRequest,
    ) -> VaccinationResult<BulkScheduleResult> {
        let started_at = Instant::now();
        if request.items.is_empty() {
            return Err(VaccinationError::Validation(
                "at least one schedule item is required".to_string(),
            ));
        }
        let recent_days = request
            .options
            .recent_vaccination_days
            .unwrap_or(self.config.bulk.default_recent_vaccination_days);
        if request.options.skip_if_recently_vaccinated && recent_days < 1 {
            return Err(VaccinationError::Validation(format!(
                "recent vaccination window must be at least 1 day, got {recent_days}"
            )));
        }

        let base = self.resolve_bulk_target(&request.target)?;
        if base.is_empty() {
            return Err(VaccinationError::EmptyTarget(
                "bulk target resolved to no animals".to_string(),
            ));
        }

        let now = self.now();
        let targets: Vec<ScopedAnimal> = match request.options.filter.as_ref() {
            Some(filter) => {
                let today = now.date_naive();
                base.into_iter()
                    .filter(|scoped| filter.matches(&scoped.animal, today))
                    .collect()
            }
            None => base,
        };
        if targets.is_empty() {
            return Err(VaccinationError::EmptyTarget(
                "no animals match the filter criteria".to_string(),
            ));
        }

        let planned = targets.len().saturating_mul(request.items.len());
        if planned > self.config.bulk.max_batch_size {
            return Err(VaccinationError::Validation(format!(
                "bulk run of {planned} items exceeds the limit of {}",
                self.config.bulk.max_batch_size
            )));
        }

        info!(
            "event=bulk_schedule module=vaccination status=start animals={} items={} skip_recent={}",
            targets.len(),
            request.items.len(),
            request.options.skip_if_recently_vaccinated
        );

        let skip_window = request
            .options
            .skip_if_recently_vaccinated
            .then(|| (recent_days, now - Duration::days(recent_days)));
        let max_duration = self.config.bulk.max_duration();
        let mut results = Vec::with_capacity(targets.len());

        for scoped in &targets {
            if started_at.elapsed() > max_duration {
                let elapsed_ms = started_at.elapsed().as_millis();
                warn!(
                    "event=bulk_schedule module=vaccination status=timeout elapsed_ms={elapsed_ms} processed={}",
                    results.len()
                );
                return Err(VaccinationError::Timeout {
                    elapsed_ms,
                    partial: Box::new(BulkScheduleResult::from_results(results)),
                });
            }
            results.push(self.schedule_for_animal(scoped, &request.items, skip_window, now));
        }

        let result = BulkScheduleResult::from_results(results);
        info!(
            "event=bulk_schedule module=vaccination status=ok processed={} scheduled={} skipped={} errors={} duration_ms={}",
            result.totals.processed,
            result.totals.scheduled,
            result.totals.skipped,
            result.totals.errors,
            started_at.elapsed().as_millis()
        );
        Ok(result)
    }

    fn resolve_bulk_target(&self, target: &BulkTarget) -> VaccinationResult<Vec<ScopedAnimal>> {
        match target {
            BulkTarget::Farm(farm_id) => self.resolve_scope(&Scope::Farm(*farm_id)),
            BulkTarget::Groups(group_ids) => self.resolve_groups(group_ids),
            BulkTarget::Animals(animal_ids) => self.resolve_animals(animal_ids),
        }
    }

    fn schedule_for_animal(
        &self,
        scoped: &ScopedAnimal,
        items: &[ScheduleItem],
        skip_window: Option<(i64, DateTime<Utc>)>,
        now: DateTime<Utc>,
    ) -> AnimalBulkResult {
        let mut result = AnimalBulkResult {
            animal_id: scoped.animal.id,
            animal_tag: scoped.animal.tag.clone(),
            group_id: scoped.group.id,
            scheduled: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
        };

        for item in items {
            let vaccination_type = item.vaccination_type.trim().to_string();
            if let Err(err) = item.validate() {
                self.record_item_error(&mut result, vaccination_type, err.to_string());
                continue;
            }

            if let Some((days, cutoff)) = skip_window {
                match self.recent_match(scoped.animal.id, &vaccination_type, cutoff) {
                    Ok(Some(matched_entry)) => {
                        result.skipped.push(SkippedItem {
                            vaccination_type,
                            reason: format!("Recently vaccinated within {days} days"),
                            matched_entry,
                        });
                        continue;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        self.record_item_error(&mut result, vaccination_type, err.to_string());
                        continue;
                    }
                }
            }

            let entry = VaccinationEntry::scheduled(scoped.animal.id, item, item.scheduled_date, now);
            match self.store.save(&entry) {
                Ok(()) => result.scheduled.push(entry),
                Err(err) => self.record_item_error(&mut result, vaccination_type, err.to_string()),
            }
        }

        result
    }

    /// Finds a live vaccination entry of a matching type recorded on or after `cutoff`.
    ///
    /// Matching is a case-insensitive substring test in either direction.
    /// Blank types on either side never match.
    fn recent_match(
        &self,
        animal_id: AnimalId,
        vaccination_type: &str,
        cutoff: DateTime<Utc>,
    ) -> RepoResult<Option<EntryId>> {
        if vaccination_type.trim().is_empty() {
            return Ok(None);
        }
        let existing = self.store.find_by_animal(animal_id)?;
        Ok(existing
            .iter()
            .filter(|entry| entry.is_vaccination() && entry.status != VaccinationStatus::Cancelled)
            .filter(|entry| entry.record_date() >= cutoff)
            .filter(|entry| !entry.vaccination_type.trim().is_empty())
            .find(|entry| {
                contains_ignore_case(vaccination_type, &entry.vaccination_type)
                    || contains_ignore_case(&entry.vaccination_type, vaccination_type)
            })
            .map(|entry| entry.id))
    }

    fn record_item_error(
        &self,
        result: &mut AnimalBulkResult,
        vaccination_type: String,
        message: String,
    ) {
        warn!(
            "event=bulk_item module=vaccination status=error animal_id={} vaccination_type={} error={}",
            result.animal_id, vaccination_type, message
        );
        result.errors.push(ItemError {
            vaccination_type,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::AnimalFilter;
    use crate::model::animal::{Animal, HealthStatus};
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn animal(birth: Option<NaiveDate>, breed: Option<&str>) -> Animal {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let mut animal = Animal::new(Uuid::new_v4(), "A-1", now);
        animal.birth_date = birth;
        animal.breed = breed.map(str::to_string);
        animal
    }

    #[test]
    fn empty_filter_matches_everything() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        assert!(AnimalFilter::default().matches(&animal(None, None), today));
    }

    #[test]
    fn breed_match_ignores_case() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let filter = AnimalFilter {
            breed: Some("angus".to_string()),
            ..AnimalFilter::default()
        };
        assert!(filter.matches(&animal(None, Some("Angus")), today));
        assert!(!filter.matches(&animal(None, Some("Hereford")), today));
        assert!(!filter.matches(&animal(None, None), today));
    }

    #[test]
    fn age_bounds_are_inclusive_and_require_birth_date() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let filter = AnimalFilter {
            age_min_days: Some(30),
            age_max_days: Some(60),
            ..AnimalFilter::default()
        };
        let born = |days: i64| Some(today - chrono::Duration::days(days));
        assert!(filter.matches(&animal(born(30), None), today));
        assert!(filter.matches(&animal(born(60), None), today));
        assert!(!filter.matches(&animal(born(29), None), today));
        assert!(!filter.matches(&animal(born(61), None), today));
        assert!(!filter.matches(&animal(None, None), today));
    }

    #[test]
    fn health_status_list_restricts_matches() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let filter = AnimalFilter {
            health_statuses: vec![HealthStatus::Healthy, HealthStatus::Recovering],
            ..AnimalFilter::default()
        };
        let mut sick = animal(None, None);
        sick.health_status = HealthStatus::Sick;
        assert!(filter.matches(&animal(None, None), today));
        assert!(!filter.matches(&sick, today));
    }
}
