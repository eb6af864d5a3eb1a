//! Attendance CSV upload.
//!
//! The first record is a header. A roll number column is required and is
//! found by name (`roll_number`, `roll no`, `student_id`, `university_id`,
//! `roll`); `status` and `notes` are optional. Quoted fields follow RFC 4180,
//! either LF or CRLF line endings are accepted, and other columns (such as a
//! student name) are ignored: names come from the registration.
//!
//! Rows that cannot be read are returned as rejections with their line
//! number; the rest still go through the attendance recorder.

use crate::aggregates::attendance::AttendanceRow;
use crate::error::PortalError;
use crate::types::{AttendanceStatus, ImportRejection, RollNumber};

/// Largest number of data rows accepted in one upload.
pub const MAX_IMPORT_ROWS: usize = 5_000;

const ROLL_HEADERS: [&str; 6] = [
    "rollnumber",
    "rollno",
    "roll",
    "studentid",
    "universityid",
    "enrollmentno",
];
const STATUS_HEADERS: [&str; 2] = ["status", "attendance"];
const NOTES_HEADERS: [&str; 2] = ["notes", "remarks"];

/// Rows ready for the recorder plus the rows that were already rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedUpload {
    /// Readable rows, in file order
    pub rows: Vec<AttendanceRow>,
    /// Unreadable rows, in file order
    pub rejected: Vec<ImportRejection>,
}

/// Parse an attendance upload.
///
/// # Errors
///
/// [`PortalError::Validation`] when the upload is empty, has no roll number
/// column, has no data rows, exceeds [`MAX_IMPORT_ROWS`] or ends inside a
/// quoted field.
pub fn parse_attendance_csv(text: &str) -> Result<ParsedUpload, PortalError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = split_records(text)?
        .into_iter()
        .filter(|(_, fields)| fields.iter().any(|f| !f.trim().is_empty()));

    let (_, header) = records
        .next()
        .ok_or_else(|| PortalError::Validation("CSV upload is empty".to_string()))?;
    let columns = Columns::locate(&header)?;

    let records: Vec<(usize, Vec<String>)> = records.collect();
    if records.is_empty() {
        return Err(PortalError::Validation(
            "CSV upload has no data rows".to_string(),
        ));
    }
    if records.len() > MAX_IMPORT_ROWS {
        return Err(PortalError::Validation(format!(
            "CSV upload has {} rows; at most {MAX_IMPORT_ROWS} are accepted",
            records.len()
        )));
    }

    let mut parsed = ParsedUpload::default();
    for (line, fields) in records {
        match columns.row(line, &fields) {
            Ok(row) => parsed.rows.push(row),
            Err(rejection) => parsed.rejected.push(rejection),
        }
    }

    Ok(parsed)
}

/// Positions of the known columns in the header.
struct Columns {
    roll: usize,
    status: Option<usize>,
    notes: Option<usize>,
}

impl Columns {
    fn locate(header: &[String]) -> Result<Self, PortalError> {
        let names: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
        let find = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));

        let roll = find(&ROLL_HEADERS).ok_or_else(|| {
            PortalError::Validation("CSV header needs a roll number column".to_string())
        })?;

        Ok(Self {
            roll,
            status: find(&STATUS_HEADERS),
            notes: find(&NOTES_HEADERS),
        })
    }

    fn row(&self, line: usize, fields: &[String]) -> Result<AttendanceRow, ImportRejection> {
        let cell = |index: Option<usize>| {
            index
                .and_then(|i| fields.get(i))
                .map_or("", |f| f.trim())
        };

        let raw_roll = cell(Some(self.roll));
        let reject = |reason: String| ImportRejection {
            line,
            roll_number: raw_roll.to_string(),
            reason,
        };

        let roll_number = RollNumber::parse(raw_roll).map_err(|e| reject(e.to_string()))?;
        let status = parse_status(cell(self.status)).map_err(reject)?;
        let notes = Some(cell(self.notes))
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Ok(AttendanceRow {
            line,
            roll_number,
            status,
            notes,
        })
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// A blank status means present. Absence is never recorded.
fn parse_status(raw: &str) -> Result<AttendanceStatus, String> {
    match raw.to_ascii_lowercase().as_str() {
        "" | "present" | "p" => Ok(AttendanceStatus::Present),
        "late" | "l" => Ok(AttendanceStatus::Late),
        other => Err(format!("unknown status '{other}' (expected present or late)")),
    }
}

/// Split `text` into records, each tagged with the line it starts on.
fn split_records(text: &str) -> Result<Vec<(usize, Vec<String>)>, PortalError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut line = 1;
    let mut start = 1;
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                },
                '"' => quoted = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                },
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => quoted = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {},
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push((start, std::mem::take(&mut fields)));
                line += 1;
                start = line;
            },
            _ => field.push(c),
        }
    }

    if quoted {
        return Err(PortalError::Validation(format!(
            "CSV upload ends inside a quoted field starting on line {start}"
        )));
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push((start, fields));
    }

    Ok(records)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reads_known_columns_in_any_order() {
        let parsed = parse_attendance_csv(
            "Notes,Student Name,Roll Number,Status\r\n\
             ,Jane,a001,Present\r\n\
             \"bus, delayed\",Raj,A002,late\r\n\
             ,Pat,A003,\r\n",
        )
        .unwrap();

        assert!(parsed.rejected.is_empty());
        assert_eq!(parsed.rows.len(), 3);
        assert_eq!(parsed.rows[0].roll_number.as_str(), "A001");
        assert_eq!(parsed.rows[0].line, 2);
        assert_eq!(parsed.rows[1].status, AttendanceStatus::Late);
        assert_eq!(parsed.rows[1].notes.as_deref(), Some("bus, delayed"));
        assert_eq!(parsed.rows[2].status, AttendanceStatus::Present);
        assert!(parsed.rows[2].notes.is_none());
    }

    #[test]
    fn roll_column_is_the_only_requirement() {
        let parsed = parse_attendance_csv("studentId\nA001\n\nA002").unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1].line, 4);

        let missing = parse_attendance_csv("name,status\nJane,present\n");
        assert_eq!(
            missing,
            Err(PortalError::Validation(
                "CSV header needs a roll number column".to_string()
            ))
        );
    }

    #[test]
    fn bad_rows_are_rejected_with_their_line() {
        let parsed = parse_attendance_csv(
            "roll_number,status,notes\n\
             \"A001\",absent,\n\
             ,present,no roll\n\
             \"A003\",present,\"two\nlines\"\n\
             A004,late,\n",
        )
        .unwrap();

        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].roll_number.as_str(), "A003");
        assert_eq!(parsed.rows[0].notes.as_deref(), Some("two\nlines"));
        assert_eq!(parsed.rows[1].line, 6);

        assert_eq!(parsed.rejected.len(), 2);
        assert_eq!(parsed.rejected[0].line, 2);
        assert_eq!(parsed.rejected[0].roll_number, "A001");
        assert!(parsed.rejected[0].reason.contains("absent"));
        assert_eq!(parsed.rejected[1].line, 3);
        assert_eq!(parsed.rejected[1].reason, "roll number cannot be empty");
    }

    #[test]
    fn empty_and_malformed_uploads() {
        assert!(parse_attendance_csv("").is_err());
        assert!(parse_attendance_csv("\u{feff}\n  \n").is_err());
        assert!(parse_attendance_csv("roll_number\n").is_err());
        assert!(parse_attendance_csv("roll_number\n\"A001\n").is_err());
    }

    #[test]
    fn oversized_upload_is_refused() {
        let mut text = String::from("roll\n");
        for i in 0..=MAX_IMPORT_ROWS {
            text.push_str(&format!("R{i}\n"));
        }
        assert!(parse_attendance_csv(&text).is_err());
    }
}
