//! Attendance CSV export.
//!
//! Two sheets, both with RFC 4180 quoting and CRLF line endings:
//!
//! - [`attendance_csv`]: one row per approved registration of one event
//! - [`attendance_report_csv`]: recorded attendance across events, filtered
//!   by event, school, category and marking date

use crate::error::PortalError;
use crate::types::{
    AttendanceRecord, Event, EventCategory, EventId, PortalState, RegistrationStatus, School,
};
use chrono::{NaiveDate, SecondsFormat};
use serde::Deserialize;
use std::fmt::Write as _;

/// Header row of the attendance export.
pub const ATTENDANCE_HEADER: [&str; 7] = [
    "Roll Number",
    "Name",
    "Department",
    "Year",
    "Status",
    "Marked At",
    "Marked By",
];

/// Header row of the cross-event report.
pub const REPORT_HEADER: [&str; 10] = [
    "Event",
    "Event Date",
    "School",
    "Category",
    "Roll Number",
    "Name",
    "Status",
    "Marked At",
    "Marked By",
    "OD Granted",
];

/// File name of the cross-event report.
pub const REPORT_FILENAME: &str = "attendance_report.csv";

const MISSING: &str = "N/A";

/// Which attendance records go into the report. Every filter is optional.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReportFilter {
    /// Only this event
    #[serde(default)]
    pub event_id: Option<EventId>,
    /// Only events of this school
    #[serde(default)]
    pub school: Option<School>,
    /// Only events of this category
    #[serde(default)]
    pub category: Option<EventCategory>,
    /// Records marked on or after this day (UTC)
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Records marked on or before this day (UTC)
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl ReportFilter {
    /// Reject an inverted date range.
    ///
    /// # Errors
    ///
    /// [`PortalError::Validation`] when `start_date` is after `end_date`.
    pub fn validate(&self) -> Result<(), PortalError> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => Err(PortalError::Validation(format!(
                "start_date {start} is after end_date {end}"
            ))),
            _ => Ok(()),
        }
    }

    fn keeps_event(&self, event: &Event) -> bool {
        self.event_id.is_none_or(|id| id == event.id)
            && self
                .school
                .as_ref()
                .is_none_or(|school| &event.details.school == school)
            && self.category.is_none_or(|c| c == event.details.category)
    }

    fn keeps_record(&self, record: &AttendanceRecord) -> bool {
        let day = record.marked_at.date_naive();
        self.start_date.is_none_or(|start| day >= start)
            && self.end_date.is_none_or(|end| day <= end)
    }
}

/// Quote a field when it contains a comma, quote, CR or LF.
#[must_use]
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    let line = fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    let _ = write!(out, "{line}\r\n");
}

/// Render the attendance sheet of an event.
///
/// Students without a record are listed as `pending`.
#[must_use]
pub fn attendance_csv(event: &Event) -> String {
    let mut out = String::new();
    push_row(&mut out, &ATTENDANCE_HEADER);

    for registration in event
        .registrations
        .iter()
        .filter(|r| r.status == RegistrationStatus::Approved)
    {
        let student = &registration.student;
        let record = event.attendance_of(&student.roll_number);

        let status = record.map_or("pending", |r| r.status.as_str());
        let marked_at = record.map_or_else(
            || MISSING.to_string(),
            |r| r.marked_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        let marked_by = record.map_or(MISSING, |r| r.marked_by.as_str());
        let year = student.year.to_string();

        push_row(
            &mut out,
            &[
                student.roll_number.as_str(),
                student.name.as_str(),
                student.department.as_str(),
                year.as_str(),
                status,
                marked_at.as_str(),
                marked_by,
            ],
        );
    }

    out
}

/// Render recorded attendance across the events kept by `filter`.
///
/// Events are ordered by date then title, records by marking time. Students
/// without a record do not appear.
#[must_use]
pub fn attendance_report_csv(state: &PortalState, filter: &ReportFilter) -> String {
    let mut events: Vec<&Event> = state
        .events
        .values()
        .filter(|e| filter.keeps_event(e))
        .collect();
    events.sort_by(|a, b| {
        (a.details.date, &a.details.title).cmp(&(b.details.date, &b.details.title))
    });

    let mut out = String::new();
    push_row(&mut out, &REPORT_HEADER);

    for event in events {
        let date = event.details.date.to_string();
        let mut records: Vec<&AttendanceRecord> = event
            .attendance
            .iter()
            .filter(|r| filter.keeps_record(r))
            .collect();
        records.sort_by_key(|r| r.marked_at);

        for record in records {
            let marked_at = record.marked_at.to_rfc3339_opts(SecondsFormat::Secs, true);
            push_row(
                &mut out,
                &[
                    event.details.title.as_str(),
                    date.as_str(),
                    event.details.school.as_str(),
                    event.details.category.as_str(),
                    record.roll_number.as_str(),
                    record.student_name.as_str(),
                    record.status.as_str(),
                    marked_at.as_str(),
                    record.marked_by.as_str(),
                    if record.od_granted() { "yes" } else { "no" },
                ],
            );
        }
    }

    out
}
