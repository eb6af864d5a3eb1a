//! Attendance aggregate.
//!
//! Records attendance for approved registrations, at most once per student
//! and event. Absence is never stored: it is whatever is left of the approved
//! list once present and late records are counted. CSV uploads come through
//! here too, row by row, under the same checks as a single mark.

use super::{PortalAction, PortalEnvironment, persist, record_persistence_failure};
use crate::error::PortalError;
use crate::types::{
    AttendanceId, AttendanceRecord, AttendanceStatus, Event, EventId, EventStatus,
    ImportRejection, ImportSummary, MarkAllSummary, PortalState, RegistrationStatus, Role,
    RollNumber,
};
use campus_core::{SmallVec, effect::Effect, reducer::Reducer};
use campus_runtime::metrics::PortalMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One readable row of an attendance upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRow {
    /// 1-based line of the row in the upload
    pub line: usize,
    /// Student
    pub roll_number: RollNumber,
    /// Present or late
    pub status: AttendanceStatus,
    /// Free-text notes
    pub notes: Option<String>,
}

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the Attendance aggregate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AttendanceAction {
    // Commands
    /// Mark one student present or late
    MarkAttendance {
        /// Event
        event_id: EventId,
        /// Identifier for the new record
        attendance_id: AttendanceId,
        /// Student
        roll_number: RollNumber,
        /// Present or late
        status: AttendanceStatus,
        /// Free-text notes
        notes: Option<String>,
        /// Marking user
        marked_by: String,
    },

    /// Mark every approved, unmarked student present
    MarkAllPresent {
        /// Event
        event_id: EventId,
        /// Marking user
        marked_by: String,
    },

    /// Record the rows of a CSV upload
    ImportAttendance {
        /// Event
        event_id: EventId,
        /// Readable rows
        rows: Vec<AttendanceRow>,
        /// Rows the parser already rejected
        rejected: Vec<ImportRejection>,
        /// Uploading user
        marked_by: String,
    },

    /// Delete an attendance record
    RemoveAttendance {
        /// Event
        event_id: EventId,
        /// Record to delete
        attendance_id: AttendanceId,
    },

    /// Grant OD on an attendance record
    GrantOd {
        /// Event
        event_id: EventId,
        /// Record
        attendance_id: AttendanceId,
        /// Granting user
        granted_by: String,
        /// Role of the granting user
        role: Role,
    },

    // Events
    /// A student was marked
    AttendanceMarked {
        /// The new record
        record: AttendanceRecord,
    },

    /// Bulk marking created records
    AllPresentMarked {
        /// Event
        event_id: EventId,
        /// Records created
        records: Vec<AttendanceRecord>,
        /// Approved students that already had a record
        skipped: usize,
    },

    /// A CSV upload created records
    AttendanceImported {
        /// Event
        event_id: EventId,
        /// Records created
        records: Vec<AttendanceRecord>,
        /// Rows skipped, in file order
        rejected: Vec<ImportRejection>,
    },

    /// A record was deleted
    AttendanceRemoved {
        /// Event
        event_id: EventId,
        /// Record
        attendance_id: AttendanceId,
    },

    /// OD was granted
    OdGranted {
        /// Event
        event_id: EventId,
        /// Record
        attendance_id: AttendanceId,
        /// Granting user
        granted_by: String,
        /// When granted
        granted_at: DateTime<Utc>,
    },

    /// Command was rejected
    #[serde(skip)]
    ValidationFailed {
        /// Why
        error: PortalError,
    },

    /// The domain event could not be appended to the log
    #[serde(skip)]
    PersistenceFailed {
        /// Store error
        error: String,
    },
}

impl AttendanceAction {
    /// Name of the action; domain events carry a schema version suffix.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MarkAttendance { .. } => "MarkAttendance",
            Self::MarkAllPresent { .. } => "MarkAllPresent",
            Self::ImportAttendance { .. } => "ImportAttendance",
            Self::RemoveAttendance { .. } => "RemoveAttendance",
            Self::GrantOd { .. } => "GrantOd",
            Self::AttendanceMarked { .. } => "AttendanceMarked.v1",
            Self::AllPresentMarked { .. } => "AllPresentMarked.v1",
            Self::AttendanceImported { .. } => "AttendanceImported.v1",
            Self::AttendanceRemoved { .. } => "AttendanceRemoved.v1",
            Self::OdGranted { .. } => "OdGranted.v1",
            Self::ValidationFailed { .. } => "ValidationFailed",
            Self::PersistenceFailed { .. } => "PersistenceFailed",
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Attendance aggregate
#[derive(Clone, Debug, Default)]
pub struct AttendanceReducer;

impl AttendanceReducer {
    /// Creates a new `AttendanceReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn open_event<'a>(
        state: &'a PortalState,
        event_id: &EventId,
    ) -> Result<&'a Event, PortalError> {
        state
            .event(event_id)
            .ok_or(PortalError::EventNotFound(*event_id))
    }

    fn ensure_open(event: &Event) -> Result<(), PortalError> {
        match event.status {
            EventStatus::Draft | EventStatus::Cancelled => {
                Err(PortalError::AttendanceClosed(event.status))
            },
            EventStatus::Active | EventStatus::Completed => Ok(()),
        }
    }

    /// Validates `MarkAttendance`; returns the student's name
    fn validate_mark(
        state: &PortalState,
        event_id: &EventId,
        roll_number: &RollNumber,
    ) -> Result<String, PortalError> {
        let event = Self::open_event(state, event_id)?;

        let registration = event
            .registration_of(roll_number)
            .filter(|r| r.status == RegistrationStatus::Approved)
            .ok_or_else(|| PortalError::NotRegistered(roll_number.to_string()))?;

        if event.attendance_of(roll_number).is_some() {
            return Err(PortalError::AlreadyMarked(roll_number.to_string()));
        }

        Self::ensure_open(event)?;

        Ok(registration.student.name.clone())
    }

    /// Records for every approved student without one, plus the skip count
    fn plan_mark_all(
        state: &PortalState,
        event_id: &EventId,
        marked_by: &str,
        now: DateTime<Utc>,
    ) -> Result<(Vec<AttendanceRecord>, usize), PortalError> {
        let event = Self::open_event(state, event_id)?;
        Self::ensure_open(event)?;

        let mut records = Vec::new();
        let mut skipped = 0;

        for registration in event
            .registrations
            .iter()
            .filter(|r| r.status == RegistrationStatus::Approved)
        {
            if event.attendance_of(&registration.student.roll_number).is_some() {
                skipped += 1;
                continue;
            }
            records.push(AttendanceRecord {
                id: AttendanceId::new(),
                event_id: *event_id,
                roll_number: registration.student.roll_number.clone(),
                student_name: registration.student.name.clone(),
                status: AttendanceStatus::Present,
                marked_at: now,
                marked_by: marked_by.to_string(),
                notes: None,
                od_granted_by: None,
                od_granted_at: None,
            });
        }

        Ok((records, skipped))
    }

    /// Records for the acceptable rows of an upload, plus every rejection
    /// in file order
    fn plan_import(
        state: &PortalState,
        event_id: &EventId,
        rows: Vec<AttendanceRow>,
        mut rejected: Vec<ImportRejection>,
        marked_by: &str,
        now: DateTime<Utc>,
    ) -> Result<(Vec<AttendanceRecord>, Vec<ImportRejection>), PortalError> {
        let event = Self::open_event(state, event_id)?;
        Self::ensure_open(event)?;

        let mut records = Vec::new();
        let mut seen: HashSet<RollNumber> = HashSet::new();

        for row in rows {
            let registration = event
                .registration_of(&row.roll_number)
                .filter(|r| r.status == RegistrationStatus::Approved);

            let outcome = match registration {
                None => Err(PortalError::NotRegistered(row.roll_number.to_string())),
                Some(_)
                    if event.attendance_of(&row.roll_number).is_some()
                        || seen.contains(&row.roll_number) =>
                {
                    Err(PortalError::AlreadyMarked(row.roll_number.to_string()))
                },
                Some(registration) => Ok(registration.student.name.clone()),
            };

            match outcome {
                Ok(student_name) => {
                    seen.insert(row.roll_number.clone());
                    records.push(AttendanceRecord {
                        id: AttendanceId::new(),
                        event_id: *event_id,
                        roll_number: row.roll_number,
                        student_name,
                        status: row.status,
                        marked_at: now,
                        marked_by: marked_by.to_string(),
                        notes: row.notes,
                        od_granted_by: None,
                        od_granted_at: None,
                    });
                },
                Err(error) => rejected.push(ImportRejection {
                    line: row.line,
                    roll_number: row.roll_number.to_string(),
                    reason: error.to_string(),
                }),
            }
        }

        rejected.sort_by_key(|r| r.line);
        Ok((records, rejected))
    }

    fn validate_remove(
        state: &PortalState,
        event_id: &EventId,
        attendance_id: AttendanceId,
    ) -> Result<(), PortalError> {
        let event = Self::open_event(state, event_id)?;
        event
            .attendance_record(attendance_id)
            .ok_or(PortalError::AttendanceNotFound(attendance_id))?;
        Ok(())
    }

    fn validate_grant_od(
        state: &PortalState,
        event_id: &EventId,
        attendance_id: AttendanceId,
        role: Role,
    ) -> Result<(), PortalError> {
        if !role.is_staff() {
            return Err(PortalError::Forbidden(
                "Only faculty or admins can grant OD".to_string(),
            ));
        }

        let event = Self::open_event(state, event_id)?;
        let record = event
            .attendance_record(attendance_id)
            .ok_or(PortalError::AttendanceNotFound(attendance_id))?;

        if record.od_granted() {
            return Err(PortalError::OdAlreadyGranted);
        }

        Ok(())
    }

    /// Applies an event to state
    fn apply_event(state: &mut PortalState, action: &AttendanceAction) {
        match action {
            AttendanceAction::AttendanceMarked { record } => {
                if let Some(event) = state.event_mut(&record.event_id) {
                    event.attendance.push(record.clone());
                }
                state.last_error = None;
            },
            AttendanceAction::AllPresentMarked {
                event_id,
                records,
                skipped,
            } => {
                if let Some(event) = state.event_mut(event_id) {
                    event.attendance.extend(records.iter().cloned());
                }
                state.last_mark_all = Some(MarkAllSummary {
                    marked: records.len(),
                    skipped: *skipped,
                });
                state.last_error = None;
            },
            AttendanceAction::AttendanceImported {
                event_id,
                records,
                rejected,
            } => {
                if let Some(event) = state.event_mut(event_id) {
                    event.attendance.extend(records.iter().cloned());
                }
                state.last_import = Some(ImportSummary {
                    imported: records.len(),
                    rejected: rejected.clone(),
                });
                state.last_error = None;
            },
            AttendanceAction::AttendanceRemoved {
                event_id,
                attendance_id,
            } => {
                if let Some(event) = state.event_mut(event_id) {
                    event.attendance.retain(|a| a.id != *attendance_id);
                }
                state.last_error = None;
            },
            AttendanceAction::OdGranted {
                event_id,
                attendance_id,
                granted_by,
                granted_at,
            } => {
                if let Some(record) = state
                    .event_mut(event_id)
                    .and_then(|e| e.attendance.iter_mut().find(|a| a.id == *attendance_id))
                {
                    record.od_granted_by = Some(granted_by.clone());
                    record.od_granted_at = Some(*granted_at);
                }
                state.last_error = None;
            },
            AttendanceAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            },
            AttendanceAction::PersistenceFailed { error } => {
                record_persistence_failure(state, error);
            },
            // Commands don't modify state
            AttendanceAction::MarkAttendance { .. }
            | AttendanceAction::MarkAllPresent { .. }
            | AttendanceAction::ImportAttendance { .. }
            | AttendanceAction::RemoveAttendance { .. }
            | AttendanceAction::GrantOd { .. } => {},
        }
    }

    fn reject(
        state: &mut PortalState,
        error: PortalError,
    ) -> SmallVec<[Effect<AttendanceAction>; 4]> {
        tracing::debug!(code = error.code(), %error, "Attendance command rejected");
        Self::apply_event(state, &AttendanceAction::ValidationFailed { error });
        SmallVec::new()
    }

    /// Persists an applied event
    fn create_effects(
        state: &mut PortalState,
        event: AttendanceAction,
        env: &PortalEnvironment,
    ) -> SmallVec<[Effect<AttendanceAction>; 4]> {
        persist(state, env, PortalAction::Attendance(event), |error| {
            AttendanceAction::PersistenceFailed { error }
        })
    }
}

impl Reducer for AttendanceReducer {
    type State = PortalState;
    type Action = AttendanceAction;
    type Environment = PortalEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            AttendanceAction::MarkAttendance {
                event_id,
                attendance_id,
                roll_number,
                status,
                notes,
                marked_by,
            } => {
                let student_name = match Self::validate_mark(state, &event_id, &roll_number) {
                    Ok(name) => name,
                    Err(error) => return Self::reject(state, error),
                };

                let event = AttendanceAction::AttendanceMarked {
                    record: AttendanceRecord {
                        id: attendance_id,
                        event_id,
                        roll_number,
                        student_name,
                        status,
                        marked_at: env.clock.now(),
                        marked_by,
                        notes: notes.filter(|n| !n.trim().is_empty()),
                        od_granted_by: None,
                        od_granted_at: None,
                    },
                };
                Self::apply_event(state, &event);
                PortalMetrics::record_attendance(status.as_str(), 1);

                Self::create_effects(state, event, env)
            },

            AttendanceAction::MarkAllPresent {
                event_id,
                marked_by,
            } => {
                let now = env.clock.now();
                let (records, skipped) =
                    match Self::plan_mark_all(state, &event_id, &marked_by, now) {
                        Ok(plan) => plan,
                        Err(error) => return Self::reject(state, error),
                    };

                if records.is_empty() {
                    state.last_mark_all = Some(MarkAllSummary { marked: 0, skipped });
                    state.last_error = None;
                    return SmallVec::new();
                }

                let marked = records.len();
                let event = AttendanceAction::AllPresentMarked {
                    event_id,
                    records,
                    skipped,
                };
                Self::apply_event(state, &event);
                PortalMetrics::record_attendance("present", marked as u64);
                tracing::info!(%event_id, marked, skipped, "Marked all approved students present");

                Self::create_effects(state, event, env)
            },

            AttendanceAction::ImportAttendance {
                event_id,
                rows,
                rejected,
                marked_by,
            } => {
                let now = env.clock.now();
                let (records, rejected) =
                    match Self::plan_import(state, &event_id, rows, rejected, &marked_by, now) {
                        Ok(plan) => plan,
                        Err(error) => return Self::reject(state, error),
                    };

                if records.is_empty() {
                    state.last_import = Some(ImportSummary {
                        imported: 0,
                        rejected,
                    });
                    state.last_error = None;
                    return SmallVec::new();
                }

                for status in [AttendanceStatus::Present, AttendanceStatus::Late] {
                    let count = records.iter().filter(|r| r.status == status).count();
                    if count > 0 {
                        PortalMetrics::record_attendance(status.as_str(), count as u64);
                    }
                }
                tracing::info!(
                    %event_id,
                    imported = records.len(),
                    rejected = rejected.len(),
                    "Imported attendance upload"
                );

                let event = AttendanceAction::AttendanceImported {
                    event_id,
                    records,
                    rejected,
                };
                Self::apply_event(state, &event);

                Self::create_effects(state, event, env)
            },

            AttendanceAction::RemoveAttendance {
                event_id,
                attendance_id,
            } => {
                if let Err(error) = Self::validate_remove(state, &event_id, attendance_id) {
                    return Self::reject(state, error);
                }

                let event = AttendanceAction::AttendanceRemoved {
                    event_id,
                    attendance_id,
                };
                Self::apply_event(state, &event);

                Self::create_effects(state, event, env)
            },

            AttendanceAction::GrantOd {
                event_id,
                attendance_id,
                granted_by,
                role,
            } => {
                if let Err(error) = Self::validate_grant_od(state, &event_id, attendance_id, role)
                {
                    return Self::reject(state, error);
                }

                let event = AttendanceAction::OdGranted {
                    event_id,
                    attendance_id,
                    granted_by,
                    granted_at: env.clock.now(),
                };
                Self::apply_event(state, &event);

                Self::create_effects(state, event, env)
            },

            // ========== Events (from event store replay) ==========
            event => {
                Self::apply_event(state, &event);
                SmallVec::new()
            },
        }
    }
}
