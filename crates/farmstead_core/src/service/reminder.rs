//! Reminder computation: classify and rank open vaccination entries.
//!
//! # Invariants
//! - Read-only: never writes to the store.
//! - Output is sorted by priority (High first), then scheduled date, then
//!   entry id, so equal inputs always produce equal output.

use crate::config::PriorityPolicy;
use crate::model::reminder::{Priority, Reminder, ReminderSummary, ReminderType};
use crate::model::vaccination::contains_ignore_case;
use crate::repo::directory_repo::AnimalDirectory;
use crate::repo::vaccination_repo::VaccinationStore;
use crate::service::error::{VaccinationError, VaccinationResult};
use crate::service::scope::Scope;
use crate::service::VaccinationService;
use chrono::{DateTime, Duration, Utc};
use log::debug;

/// Entries due within this many days are `DueSoon` and at least `High`.
pub const DUE_SOON_DAYS: i64 = 7;
/// Non-critical entries due within this many days are at least `Medium`.
pub const MEDIUM_PRIORITY_DAYS: i64 = 14;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Reminder query options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderQuery {
    pub scope: Scope,
    /// Lookahead window; `None` uses the configured default.
    pub days_ahead: Option<i64>,
    pub include_overdue: bool,
    /// Case-insensitive substring filter on the vaccination type.
    pub vaccination_type: Option<String>,
    pub priority: Option<Priority>,
}

impl ReminderQuery {
    /// Default query for a scope: configured window, overdue included.
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            days_ahead: None,
            include_overdue: true,
            vaccination_type: None,
            priority: None,
        }
    }

    pub fn days_ahead(mut self, days: i64) -> Self {
        self.days_ahead = Some(days);
        self
    }

    pub fn include_overdue(mut self, include: bool) -> Self {
        self.include_overdue = include;
        self
    }

    pub fn vaccination_type(mut self, filter: impl Into<String>) -> Self {
        self.vaccination_type = Some(filter.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderReport {
    pub reminders: Vec<Reminder>,
    pub summary: ReminderSummary,
    pub generated_at: DateTime<Utc>,
    pub days_ahead: i64,
}

impl<D: AnimalDirectory, S: VaccinationStore> VaccinationService<D, S> {
    /// Computes ranked reminders for every open vaccination entry in scope.
    pub fn get_reminders(&self, query: &ReminderQuery) -> VaccinationResult<ReminderReport> {
        let days_ahead = query
            .days_ahead
            .unwrap_or(self.config.reminders.default_days_ahead);
        if days_ahead < 0 {
            return Err(VaccinationError::Validation(format!(
                "days ahead must not be negative, got {days_ahead}"
            )));
        }

        let now = self.now();
        let type_filter = query
            .vaccination_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let animals = self.resolve_scope(&query.scope)?;
        let mut reminders = Vec::new();
        let mut examined = 0usize;

        for scoped in &animals {
            for entry in self.store.find_by_animal(scoped.animal.id)? {
                examined += 1;
                if !entry.is_vaccination() || !entry.status.is_open() {
                    continue;
                }
                if let Some(filter) = type_filter {
                    if !contains_ignore_case(&entry.vaccination_type, filter) {
                        continue;
                    }
                }
                let Some(scheduled_date) = entry.scheduled_date else {
                    continue;
                };

                let days_until_due = days_until_due(scheduled_date, now);
                let Some(reminder_type) = classify(
                    days_until_due,
                    scheduled_date,
                    now,
                    days_ahead,
                    query.include_overdue,
                ) else {
                    continue;
                };
                let priority = priority_for(
                    reminder_type,
                    days_until_due,
                    &entry.vaccination_type,
                    &self.config.priority,
                );
                if query.priority.is_some_and(|wanted| wanted != priority) {
                    continue;
                }

                reminders.push(Reminder {
                    entry_id: entry.id,
                    animal_id: scoped.animal.id,
                    animal_tag: scoped.animal.tag.clone(),
                    animal_name: scoped.animal.name.clone(),
                    group_id: scoped.group.id,
                    vaccination_type: entry.vaccination_type,
                    description: entry.description,
                    veterinarian: entry.veterinarian,
                    scheduled_date,
                    days_until_due,
                    priority,
                    reminder_type,
                    estimated_cost: entry.cost,
                });
            }
        }

        reminders.sort_by(|left, right| {
            left.priority
                .cmp(&right.priority)
                .then(left.scheduled_date.cmp(&right.scheduled_date))
                .then(left.entry_id.cmp(&right.entry_id))
        });
        let summary = ReminderSummary::from_reminders(&reminders);

        debug!(
            "event=reminders_compute module=vaccination status=ok animals={} entries={} reminders={} days_ahead={days_ahead}",
            animals.len(),
            examined,
            reminders.len()
        );

        Ok(ReminderReport {
            reminders,
            summary,
            generated_at: now,
            days_ahead,
        })
    }
}

/// Whole days from `now` until `scheduled_date`, rounded up.
pub fn days_until_due(scheduled_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (scheduled_date - now).num_milliseconds();
    -((-millis).div_euclid(MILLIS_PER_DAY))
}

/// Places an entry in a reminder bucket, or `None` when it needs no reminder.
pub fn classify(
    days_until_due: i64,
    scheduled_date: DateTime<Utc>,
    now: DateTime<Utc>,
    days_ahead: i64,
    include_overdue: bool,
) -> Option<ReminderType> {
    if days_until_due < 0 {
        return include_overdue.then_some(ReminderType::Overdue);
    }
    if days_until_due <= DUE_SOON_DAYS {
        return Some(ReminderType::DueSoon);
    }
    (scheduled_date <= now + Duration::days(days_ahead)).then_some(ReminderType::Upcoming)
}

/// Ranks a classified entry; the first matching rule wins.
pub fn priority_for(
    reminder_type: ReminderType,
    days_until_due: i64,
    vaccination_type: &str,
    policy: &PriorityPolicy,
) -> Priority {
    if reminder_type == ReminderType::Overdue {
        return Priority::High;
    }
    if let Some(critical) = policy.critical_match(vaccination_type) {
        return if days_until_due <= critical.high_within_days {
            Priority::High
        } else {
            Priority::Medium
        };
    }
    if days_until_due <= DUE_SOON_DAYS {
        Priority::High
    } else if days_until_due <= MEDIUM_PRIORITY_DAYS {
        Priority::Medium
    } else {
        Priority::Low
    }
}
