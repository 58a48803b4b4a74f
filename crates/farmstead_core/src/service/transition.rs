//! Status transition engine for vaccination entries.
//!
//! ```text
//! Scheduled --complete--> Completed   (terminal)
//! Scheduled --cancel----> Cancelled   (terminal)
//! Scheduled --reschedule-> Rescheduled (still open; may be rescheduled,
//!                                       completed or cancelled again)
//! ```
//!
//! # Invariants
//! - Guards run in order: record type, terminal state, caller version.
//! - Every successful transition appends one annotation and bumps `version`.
//! - A chained follow-up is written before the completed entry; if the
//!   completion then fails to persist, the follow-up is cancelled and the
//!   entry stays open for a retry.
//! - The store re-checks the version on write, so a concurrent writer that
//!   slips in between read and write still yields `Conflict`.

use crate::model::vaccination::{Annotation, AnnotationKind, VaccinationEntry, VaccinationStatus};
use crate::model::EntryId;
use crate::repo::directory_repo::AnimalDirectory;
use crate::repo::vaccination_repo::VaccinationStore;
use crate::service::error::{RecordRef, TransitionAction, VaccinationError, VaccinationResult};
use crate::service::VaccinationService;
use chrono::{DateTime, Utc};
use log::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteRequest {
    /// Version the caller last read.
    pub expected_version: i64,
    /// Defaults to now.
    pub completed_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Chain a follow-up this many days after completion.
    pub next_interval_days: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescheduleRequest {
    pub expected_version: i64,
    pub new_date: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancelRequest {
    pub expected_version: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub entry: VaccinationEntry,
    pub follow_up: Option<VaccinationEntry>,
}

impl<D: AnimalDirectory, S: VaccinationStore> VaccinationService<D, S> {
    /// Marks an open entry as performed, optionally chaining the next dose.
    pub fn complete_entry(
        &self,
        entry_id: EntryId,
        request: &CompleteRequest,
    ) -> VaccinationResult<CompletionResult> {
        if let Some(days) = request.next_interval_days {
            if days < 1 {
                return Err(VaccinationError::Validation(format!(
                    "next interval must be at least 1 day, got {days}"
                )));
            }
        }

        let mut entry =
            self.load_for_transition(entry_id, request.expected_version, TransitionAction::Complete)?;
        let now = self.now();
        let completed_date = request.completed_date.unwrap_or(now);

        let follow_up = request
            .next_interval_days
            .map(|days| entry.follow_up(completed_date, days, now));

        if let Some(notes) = request.notes.as_deref() {
            entry.append_note(notes);
        }
        entry.completed_date = Some(completed_date);
        entry.status = VaccinationStatus::Completed;

        let mut annotation = Annotation::new(AnnotationKind::Completed, now);
        annotation.to_date = Some(completed_date);
        annotation.related_entry = follow_up.as_ref().map(|next| next.id);
        entry.record_transition(annotation);

        if let Some(next) = follow_up.as_ref() {
            self.store.save(next)?;
        }
        if let Err(err) = self.store.save(&entry) {
            if let Some(next) = follow_up.as_ref() {
                self.withdraw_follow_up(next, now);
            }
            return Err(err.into());
        }

        info!(
            "event=entry_transition module=vaccination status=ok action=complete entry_id={} version={} follow_up={}",
            entry.id,
            entry.version,
            follow_up.is_some()
        );
        Ok(CompletionResult { entry, follow_up })
    }

    /// Moves an open entry to a new date, keeping it open.
    pub fn reschedule_entry(
        &self,
        entry_id: EntryId,
        request: &RescheduleRequest,
    ) -> VaccinationResult<VaccinationEntry> {
        let new_date = request.new_date.ok_or_else(|| {
            VaccinationError::Validation("reschedule requires a new date".to_string())
        })?;

        let mut entry = self.load_for_transition(
            entry_id,
            request.expected_version,
            TransitionAction::Reschedule,
        )?;

        let mut annotation = Annotation::new(AnnotationKind::Rescheduled, self.now());
        annotation.from_date = entry.scheduled_date;
        annotation.to_date = Some(new_date);
        annotation.reason = normalized_reason(request.reason.as_deref());

        entry.scheduled_date = Some(new_date);
        entry.status = VaccinationStatus::Rescheduled;
        entry.record_transition(annotation);
        self.store.save(&entry)?;

        info!(
            "event=entry_transition module=vaccination status=ok action=reschedule entry_id={} version={}",
            entry.id, entry.version
        );
        Ok(entry)
    }

    /// Cancels an open entry.
    pub fn cancel_entry(
        &self,
        entry_id: EntryId,
        request: &CancelRequest,
    ) -> VaccinationResult<VaccinationEntry> {
        let mut entry =
            self.load_for_transition(entry_id, request.expected_version, TransitionAction::Cancel)?;

        let mut annotation = Annotation::new(AnnotationKind::Cancelled, self.now());
        annotation.reason = normalized_reason(request.reason.as_deref());

        entry.status = VaccinationStatus::Cancelled;
        entry.record_transition(annotation);
        self.store.save(&entry)?;

        info!(
            "event=entry_transition module=vaccination status=ok action=cancel entry_id={} version={}",
            entry.id, entry.version
        );
        Ok(entry)
    }

    /// Cancels a follow-up whose originating completion failed to persist.
    fn withdraw_follow_up(&self, follow_up: &VaccinationEntry, now: DateTime<Utc>) {
        let mut withdrawn = follow_up.clone();
        let mut annotation = Annotation::new(AnnotationKind::Cancelled, now);
        annotation.reason = Some("originating completion was not recorded".to_string());
        withdrawn.status = VaccinationStatus::Cancelled;
        withdrawn.record_transition(annotation);

        if let Err(err) = self.store.save(&withdrawn) {
            warn!(
                "event=entry_transition module=vaccination status=error action=withdraw_follow_up entry_id={} error={err}",
                follow_up.id
            );
        }
    }

    fn load_for_transition(
        &self,
        entry_id: EntryId,
        expected_version: i64,
        action: TransitionAction,
    ) -> VaccinationResult<VaccinationEntry> {
        let entry = self
            .store
            .find_by_id(entry_id)?
            .ok_or(VaccinationError::NotFound {
                target: RecordRef::Entry,
                id: entry_id,
            })?;

        let rejection = if !entry.is_vaccination() {
            Some(VaccinationError::InvalidRecordType {
                entry_id,
                kind: entry.kind,
            })
        } else if entry.status.is_terminal() {
            Some(VaccinationError::InvalidTransition {
                entry_id,
                status: entry.status,
                action,
            })
        } else if entry.version != expected_version {
            Some(VaccinationError::Conflict {
                entry_id,
                expected: expected_version,
                actual: entry.version,
            })
        } else {
            None
        };

        match rejection {
            Some(err) => {
                warn!(
                    "event=entry_transition module=vaccination status=rejected action={action} entry_id={entry_id} error={err}"
                );
                Err(err)
            }
            None => Ok(entry),
        }
    }
}

fn normalized_reason(reason: Option<&str>) -> Option<String> {
    reason
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
