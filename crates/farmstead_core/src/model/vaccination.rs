//! Vaccination entry model and its status lifecycle.
//!
//! # Responsibility
//! - Define the persisted health/vaccination record and schedule inputs.
//! - Own the terminal-state rules the transition engine enforces.
//!
//! # Invariants
//! - `Completed` and `Cancelled` are terminal.
//! - `Rescheduled` is an audit marker; the entry stays open.
//! - `notes` holds human commentary only; dates and transitions live in typed
//!   fields and `annotations`.
//! - `version` starts at 1 and grows by one per persisted mutation.

use crate::model::{AnimalId, EntryId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Kind of health record. Only `Vaccination` takes part in scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Vaccination,
    Treatment,
    Checkup,
    Other,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vaccination => "vaccination",
            Self::Treatment => "treatment",
            Self::Checkup => "checkup",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "vaccination" => Some(Self::Vaccination),
            "treatment" => Some(Self::Treatment),
            "checkup" => Some(Self::Checkup),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaccinationStatus {
    Scheduled,
    Completed,
    Rescheduled,
    Cancelled,
}

impl VaccinationStatus {
    /// No transition may leave a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Logically scheduled: still waiting to be performed.
    pub fn is_open(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Rescheduled => "rescheduled",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "completed" => Some(Self::Completed),
            "rescheduled" => Some(Self::Rescheduled),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl Display for VaccinationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a transition annotation records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Completed,
    Rescheduled,
    Cancelled,
    FollowUpScheduled,
}

/// Typed audit record appended by every status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub at: DateTime<Utc>,
    /// Scheduled date before a reschedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date: Option<DateTime<Utc>>,
    /// New scheduled date, completion date, or follow-up date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Entry created as a consequence of this transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entry: Option<EntryId>,
}

impl Annotation {
    pub fn new(kind: AnnotationKind, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            at,
            from_date: None,
            to_date: None,
            reason: None,
            related_entry: None,
        }
    }
}

/// Entry validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValidationError {
    BlankVaccinationType,
    NegativeCost(f64),
    MissingCompletedDate,
    InvalidVersion(i64),
    InvalidInterval(i64),
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankVaccinationType => write!(f, "vaccination type must not be blank"),
            Self::NegativeCost(value) => {
                write!(f, "cost must be a non-negative number, got {value}")
            }
            Self::MissingCompletedDate => write!(f, "completed entries require a completed date"),
            Self::InvalidVersion(value) => write!(f, "entry version must be >= 1, got {value}"),
            Self::InvalidInterval(value) => {
                write!(f, "interval must be at least 1 day, got {value}")
            }
        }
    }
}

impl Error for EntryValidationError {}

/// A scheduled or completed health event for one animal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinationEntry {
    pub id: EntryId,
    pub animal_id: AnimalId,
    pub kind: RecordKind,
    pub vaccination_type: String,
    pub description: String,
    pub veterinarian: Option<String>,
    pub cost: Option<f64>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    pub status: VaccinationStatus,
    pub notes: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Entry this one was chained from, for recurring schedules.
    pub follow_up_of: Option<EntryId>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VaccinationEntry {
    /// Builds a new `Scheduled` vaccination entry from a schedule item.
    pub fn scheduled(
        animal_id: AnimalId,
        item: &ScheduleItem,
        scheduled_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            animal_id,
            kind: RecordKind::Vaccination,
            vaccination_type: item.vaccination_type.trim().to_string(),
            description: item.description.clone(),
            veterinarian: item.veterinarian.clone(),
            cost: item.estimated_cost,
            scheduled_date: Some(scheduled_date),
            completed_date: None,
            status: VaccinationStatus::Scheduled,
            notes: item.notes.clone().unwrap_or_default(),
            annotations: Vec::new(),
            follow_up_of: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds the next entry in a recurring series, `interval_days` after `from`.
    ///
    /// The new entry carries a `FollowUpScheduled` annotation pointing back at
    /// `self`.
    pub fn follow_up(&self, from: DateTime<Utc>, interval_days: i64, now: DateTime<Utc>) -> Self {
        let scheduled_date = from + Duration::days(interval_days);
        let mut origin = Annotation::new(AnnotationKind::FollowUpScheduled, now);
        origin.to_date = Some(scheduled_date);
        origin.related_entry = Some(self.id);

        Self {
            id: Uuid::new_v4(),
            animal_id: self.animal_id,
            kind: RecordKind::Vaccination,
            vaccination_type: self.vaccination_type.clone(),
            description: self.description.clone(),
            veterinarian: self.veterinarian.clone(),
            cost: self.cost,
            scheduled_date: Some(scheduled_date),
            completed_date: None,
            status: VaccinationStatus::Scheduled,
            notes: String::new(),
            annotations: vec![origin],
            follow_up_of: Some(self.id),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_vaccination(&self) -> bool {
        self.kind == RecordKind::Vaccination
    }

    /// Date the event happened or is expected to happen.
    pub fn record_date(&self) -> DateTime<Utc> {
        self.completed_date
            .or(self.scheduled_date)
            .unwrap_or(self.created_at)
    }

    /// Appends one line of human commentary.
    pub fn append_note(&mut self, note: &str) {
        let note = note.trim();
        if note.is_empty() {
            return;
        }
        if !self.notes.is_empty() {
            self.notes.push('\n');
        }
        self.notes.push_str(note);
    }

    /// Records a mutation: appends the annotation, bumps version and `updated_at`.
    pub fn record_transition(&mut self, annotation: Annotation) {
        self.updated_at = annotation.at;
        self.annotations.push(annotation);
        self.version += 1;
    }

    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.is_vaccination() && self.vaccination_type.trim().is_empty() {
            return Err(EntryValidationError::BlankVaccinationType);
        }
        if let Some(cost) = self.cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(EntryValidationError::NegativeCost(cost));
            }
        }
        if self.status == VaccinationStatus::Completed && self.completed_date.is_none() {
            return Err(EntryValidationError::MissingCompletedDate);
        }
        if self.version < 1 {
            return Err(EntryValidationError::InvalidVersion(self.version));
        }
        Ok(())
    }
}

/// Transient scheduling input; never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub vaccination_type: String,
    pub description: String,
    /// Days between recurrences. Required by recurring schedules.
    #[serde(default)]
    pub interval_days: Option<i64>,
    /// Absolute date of the (first) vaccination.
    pub scheduled_date: DateTime<Utc>,
    #[serde(default)]
    pub veterinarian: Option<String>,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ScheduleItem {
    pub fn new(
        vaccination_type: impl Into<String>,
        description: impl Into<String>,
        scheduled_date: DateTime<Utc>,
    ) -> Self {
        Self {
            vaccination_type: vaccination_type.into(),
            description: description.into(),
            interval_days: None,
            scheduled_date,
            veterinarian: None,
            estimated_cost: None,
            notes: None,
        }
    }

    pub fn with_interval(mut self, interval_days: i64) -> Self {
        self.interval_days = Some(interval_days);
        self
    }

    pub fn with_estimated_cost(mut self, cost: f64) -> Self {
        self.estimated_cost = Some(cost);
        self
    }

    /// Checks fields needed for a one-off entry.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.vaccination_type.trim().is_empty() {
            return Err(EntryValidationError::BlankVaccinationType);
        }
        if let Some(cost) = self.estimated_cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(EntryValidationError::NegativeCost(cost));
            }
        }
        Ok(())
    }

    /// Checks fields needed for a recurring schedule and returns the interval.
    pub fn validate_recurring(&self) -> Result<i64, EntryValidationError> {
        self.validate()?;
        match self.interval_days {
            Some(days) if days >= 1 => Ok(days),
            Some(days) => Err(EntryValidationError::InvalidInterval(days)),
            None => Err(EntryValidationError::InvalidInterval(0)),
        }
    }

    /// Date of the next recurrence, when an interval is set.
    pub fn next_date(&self) -> Option<DateTime<Utc>> {
        self.interval_days
            .map(|days| self.scheduled_date + Duration::days(days))
    }
}

/// Case-insensitive substring check used by type filters and recency matching.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
