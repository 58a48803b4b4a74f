//! Schedule generation: initial and optionally recurring entries.
//!
//! # Invariants
//! - With `auto_schedule_next`, exactly two entries are written per
//!   (animal, item) pair; otherwise exactly one.
//! - Input is fully validated before the first write.
//! - Repeated calls create new entries every time.

use crate::model::vaccination::{ScheduleItem, VaccinationEntry};
use crate::model::{AnimalId, GroupId};
use crate::repo::directory_repo::AnimalDirectory;
use crate::repo::vaccination_repo::VaccinationStore;
use crate::service::error::{VaccinationError, VaccinationResult};
use crate::service::scope::ScopedAnimal;
use crate::service::VaccinationService;
use chrono::{DateTime, Duration, Utc};
use log::info;

/// Animals a schedule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleTarget {
    Animals(Vec<AnimalId>),
    Group(GroupId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateScheduleRequest {
    pub target: ScheduleTarget,
    pub items: Vec<ScheduleItem>,
    /// Also write the next recurrence of every item.
    pub auto_schedule_next: bool,
}

/// Next recurrence computed for one schedule item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextDate {
    pub vaccination_type: String,
    pub next_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleResult {
    /// Ordered by animal, then item; each follow-up right after its initial entry.
    pub entries: Vec<VaccinationEntry>,
    /// One per item, in item order.
    pub next_dates: Vec<NextDate>,
}

impl<D: AnimalDirectory, S: VaccinationStore> VaccinationService<D, S> {
    /// Creates Scheduled entries for every (animal, item) pair.
    pub fn create_schedule(
        &self,
        request: &CreateScheduleRequest,
    ) -> VaccinationResult<ScheduleResult> {
        if request.items.is_empty() {
            return Err(VaccinationError::Validation(
                "at least one schedule item is required".to_string(),
            ));
        }
        let mut intervals = Vec::with_capacity(request.items.len());
        let mut next_dates = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let interval_days = item.validate_recurring()?;
            intervals.push(interval_days);
            next_dates.push(NextDate {
                vaccination_type: item.vaccination_type.trim().to_string(),
                next_date: item.scheduled_date + Duration::days(interval_days),
            });
        }

        let animals = self.resolve_schedule_target(&request.target)?;
        let now = self.now();
        let per_pair = if request.auto_schedule_next { 2 } else { 1 };
        let mut entries = Vec::with_capacity(animals.len() * request.items.len() * per_pair);

        for scoped in &animals {
            for (item, interval_days) in request.items.iter().zip(&intervals) {
                let initial =
                    VaccinationEntry::scheduled(scoped.animal.id, item, item.scheduled_date, now);
                self.store.save(&initial)?;

                if request.auto_schedule_next {
                    let follow_up = initial.follow_up(item.scheduled_date, *interval_days, now);
                    self.store.save(&follow_up)?;
                    entries.push(initial);
                    entries.push(follow_up);
                } else {
                    entries.push(initial);
                }
            }
        }

        info!(
            "event=schedule_create module=vaccination status=ok animals={} items={} entries={} auto_next={}",
            animals.len(),
            request.items.len(),
            entries.len(),
            request.auto_schedule_next
        );

        Ok(ScheduleResult {
            entries,
            next_dates,
        })
    }

    fn resolve_schedule_target(
        &self,
        target: &ScheduleTarget,
    ) -> VaccinationResult<Vec<ScopedAnimal>> {
        match target {
            ScheduleTarget::Animals(animal_ids) => {
                if animal_ids.is_empty() {
                    return Err(VaccinationError::EmptyTarget(
                        "no animal ids given".to_string(),
                    ));
                }
                self.resolve_animals(animal_ids)
            }
            ScheduleTarget::Group(group_id) => {
                let animals = self.resolve_groups(&[*group_id])?;
                if animals.is_empty() {
                    return Err(VaccinationError::EmptyTarget(format!(
                        "group {group_id} has no animals"
                    )));
                }
                Ok(animals)
            }
        }
    }
}
