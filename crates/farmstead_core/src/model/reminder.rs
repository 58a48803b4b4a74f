//! Derived reminder view. Reminders are computed on demand and never stored.

use crate::model::{AnimalId, EntryId, GroupId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Urgency bucket; `High` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: lower is more urgent.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Position of an entry relative to now and the lookahead window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    Upcoming,
    DueSoon,
    Overdue,
}

/// One actionable reminder derived from an open vaccination entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub entry_id: EntryId,
    pub animal_id: AnimalId,
    pub animal_tag: String,
    pub animal_name: Option<String>,
    pub group_id: GroupId,
    pub vaccination_type: String,
    pub description: String,
    pub veterinarian: Option<String>,
    pub scheduled_date: DateTime<Utc>,
    /// Whole days until due, rounded up; negative when overdue.
    pub days_until_due: i64,
    pub priority: Priority,
    pub reminder_type: ReminderType,
    pub estimated_cost: Option<f64>,
}

/// Aggregates over one reminder query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderSummary {
    pub total: usize,
    pub overdue: usize,
    pub due_soon: usize,
    pub upcoming: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total_estimated_cost: f64,
}

impl ReminderSummary {
    pub fn from_reminders(reminders: &[Reminder]) -> Self {
        let mut summary = Self::default();
        for reminder in reminders {
            summary.total += 1;
            match reminder.reminder_type {
                ReminderType::Overdue => summary.overdue += 1,
                ReminderType::DueSoon => summary.due_soon += 1,
                ReminderType::Upcoming => summary.upcoming += 1,
            }
            match reminder.priority {
                Priority::High => summary.high += 1,
                Priority::Medium => summary.medium += 1,
                Priority::Low => summary.low += 1,
            }
            summary.total_estimated_cost += reminder.estimated_cost.unwrap_or(0.0);
        }
        summary
    }
}
