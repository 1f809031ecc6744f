use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::domain::{BlockProvenance, PropertyId};
use super::ledger::{AvailabilityLedger, LedgerError};
use super::repository::BlockedDateRepository;

const PRODID: &str = "-//Bookaway//Availability Calendar//EN";

/// Result of an iCal feed import. `added` counts only days that were not
/// already blocked, so re-importing the same feed reports zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub events: usize,
    pub added: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum IcsImportError {
    #[error("calendar text is missing the BEGIN:VCALENDAR wrapper")]
    MissingCalendar,
    #[error("VEVENT opened at line {line} is never closed")]
    UnterminatedEvent { line: usize },
    #[error("VEVENT ending at line {line} has no DTSTART")]
    MissingDtstart { line: usize },
    #[error("line {line}: '{value}' is not a calendar date")]
    InvalidDate { line: usize, value: String },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Bridges the availability ledger and external iCal feeds (the RFC 5545
/// subset Airbnb-style channels exchange: all-day VEVENTs with a DTSTART).
pub struct CalendarSync<B> {
    ledger: AvailabilityLedger<B>,
}

impl<B> CalendarSync<B>
where
    B: BlockedDateRepository,
{
    pub fn new(ledger: AvailabilityLedger<B>) -> Self {
        Self { ledger }
    }

    /// Imports a feed, blocking one day per VEVENT under the `ical`
    /// provenance. The whole text is parsed before the ledger is touched:
    /// a malformed feed rejects the import wholesale rather than leaving a
    /// half-imported calendar behind. Days already blocked are absorbed by
    /// the ledger's idempotent insert.
    pub fn import_ics(
        &self,
        property: &PropertyId,
        ics: &str,
    ) -> Result<ImportOutcome, IcsImportError> {
        let days = parse_blocked_days(ics)?;

        let mut added = 0;
        for day in &days {
            if self
                .ledger
                .block_day(property, *day, BlockProvenance::Ical)?
            {
                added += 1;
            }
        }

        info!(
            property = %property.0,
            events = days.len(),
            added,
            "imported calendar feed"
        );
        Ok(ImportOutcome {
            events: days.len(),
            added,
        })
    }

    /// Serializes every blocked day of the property, whatever its
    /// provenance, as one all-day VEVENT, with a deterministic index-based
    /// UID so repeated exports of the same calendar are byte-identical.
    pub fn export_ics(&self, property: &PropertyId) -> Result<String, LedgerError> {
        let entries = self.ledger.all_entries(property)?;

        let mut lines: Vec<String> = vec![
            "BEGIN:VCALENDAR".to_string(),
            "VERSION:2.0".to_string(),
            format!("PRODID:{PRODID}"),
        ];
        for (index, entry) in entries.iter().enumerate() {
            lines.push("BEGIN:VEVENT".to_string());
            lines.push(format!("UID:blocked-{index}@bookaway"));
            lines.push(format!(
                "DTSTART;VALUE=DATE:{}",
                entry.date.format("%Y%m%d")
            ));
            lines.push("SUMMARY:Blocked".to_string());
            lines.push("END:VEVENT".to_string());
        }
        lines.push("END:VCALENDAR".to_string());

        let mut text = lines.join("\r\n");
        text.push_str("\r\n");
        Ok(text)
    }
}

/// Extracts one blocked day per VEVENT. Tolerates LF or CRLF endings and
/// both `DTSTART:20240701` and `DTSTART;VALUE=DATE:20240701` forms;
/// datetime values contribute their date part.
fn parse_blocked_days(ics: &str) -> Result<Vec<NaiveDate>, IcsImportError> {
    let mut saw_calendar = false;
    let mut open_event: Option<usize> = None;
    let mut current_start: Option<NaiveDate> = None;
    let mut days = Vec::new();

    for (index, raw_line) in ics.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("BEGIN:VCALENDAR") {
            saw_calendar = true;
        } else if line.eq_ignore_ascii_case("BEGIN:VEVENT") {
            if let Some(opened_at) = open_event {
                return Err(IcsImportError::UnterminatedEvent { line: opened_at });
            }
            open_event = Some(line_number);
            current_start = None;
        } else if line.eq_ignore_ascii_case("END:VEVENT") {
            if open_event.take().is_none() {
                // stray END outside an event; treat like an unterminated
                // structure at this line
                return Err(IcsImportError::UnterminatedEvent { line: line_number });
            }
            match current_start.take() {
                Some(day) => days.push(day),
                None => return Err(IcsImportError::MissingDtstart { line: line_number }),
            }
        } else if open_event.is_some() && is_dtstart(line) {
            let value = match line.split_once(':') {
                Some((_, value)) => value.trim(),
                None => "",
            };
            current_start = Some(parse_ics_date(value).ok_or_else(|| {
                IcsImportError::InvalidDate {
                    line: line_number,
                    value: value.to_string(),
                }
            })?);
        }
    }

    if !saw_calendar {
        return Err(IcsImportError::MissingCalendar);
    }
    if let Some(opened_at) = open_event {
        return Err(IcsImportError::UnterminatedEvent { line: opened_at });
    }

    Ok(days)
}

fn is_dtstart(line: &str) -> bool {
    let upper = line.to_ascii_uppercase();
    upper.starts_with("DTSTART:") || upper.starts_with("DTSTART;")
}

fn parse_ics_date(value: &str) -> Option<NaiveDate> {
    let date_part = match value.split_once('T') {
        Some((date, _time)) => date,
        None => value,
    };
    NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()
}
