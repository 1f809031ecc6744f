use std::sync::Arc;

use super::common::*;
use crate::reservations::domain::BlockProvenance;
use crate::reservations::ical::{CalendarSync, IcsImportError, ImportOutcome};
use crate::reservations::ledger::AvailabilityLedger;

fn sync() -> (CalendarSync<MemoryBlockedDays>, AvailabilityLedger<MemoryBlockedDays>) {
    let ledger = AvailabilityLedger::new(Arc::new(MemoryBlockedDays::default()));
    (CalendarSync::new(ledger.clone()), ledger)
}

const CHANNEL_FEED: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Channel//EN\r\n\
BEGIN:VEVENT\r\nUID:1@channel\r\nDTSTART;VALUE=DATE:20240701\r\nSUMMARY:Not available\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nUID:2@channel\r\nDTSTART;VALUE=DATE:20240702\r\nSUMMARY:Not available\r\nEND:VEVENT\r\n\
END:VCALENDAR\r\n";

#[test]
fn import_blocks_each_event_day_as_ical() {
    let (sync, ledger) = sync();

    let outcome = sync.import_ics(&property(), CHANNEL_FEED).expect("imports");
    assert_eq!(outcome, ImportOutcome { events: 2, added: 2 });

    let entries = ledger
        .entries_in_range(&property(), date(2024, 7, 1), date(2024, 7, 2))
        .expect("list");
    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .all(|entry| entry.provenance == BlockProvenance::Ical));
}

#[test]
fn repeated_import_adds_nothing() {
    let (sync, _ledger) = sync();

    sync.import_ics(&property(), CHANNEL_FEED).expect("first");
    let again = sync.import_ics(&property(), CHANNEL_FEED).expect("second");

    assert_eq!(again.events, 2);
    assert_eq!(again.added, 0);
}

#[test]
fn export_import_round_trip_is_idempotent() {
    let (sync, ledger) = sync();

    ledger
        .block_day(&property(), date(2024, 7, 10), BlockProvenance::Manual)
        .expect("manual");
    ledger
        .block_day(&property(), date(2024, 7, 11), BlockProvenance::Booking)
        .expect("booking");
    sync.import_ics(&property(), CHANNEL_FEED).expect("feed");

    let exported = sync.export_ics(&property()).expect("exports");
    let outcome = sync.import_ics(&property(), &exported).expect("reimports");

    assert_eq!(outcome.events, 4);
    assert_eq!(outcome.added, 0);
}

#[test]
fn export_covers_every_provenance_deterministically() {
    let (sync, ledger) = sync();

    ledger
        .block_day(&property(), date(2024, 7, 2), BlockProvenance::Booking)
        .expect("booking");
    ledger
        .block_day(&property(), date(2024, 7, 1), BlockProvenance::Manual)
        .expect("manual");

    let exported = sync.export_ics(&property()).expect("exports");

    assert_eq!(
        exported,
        "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Bookaway//Availability Calendar//EN\r\n\
BEGIN:VEVENT\r\n\
UID:blocked-0@bookaway\r\n\
DTSTART;VALUE=DATE:20240701\r\n\
SUMMARY:Blocked\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:blocked-1@bookaway\r\n\
DTSTART;VALUE=DATE:20240702\r\n\
SUMMARY:Blocked\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n"
    );
    assert_eq!(sync.export_ics(&property()).expect("again"), exported);
}

#[test]
fn empty_calendar_exports_a_bare_wrapper() {
    let (sync, _ledger) = sync();
    let exported = sync.export_ics(&property()).expect("exports");
    assert!(exported.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(exported.ends_with("END:VCALENDAR\r\n"));
    assert!(!exported.contains("VEVENT"));
}

#[test]
fn malformed_feed_leaves_the_ledger_untouched() {
    let (sync, ledger) = sync();

    let truncated = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\nDTSTART:20240701\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nDTSTART:bogus\r\nEND:VEVENT\r\n\
END:VCALENDAR\r\n";

    match sync.import_ics(&property(), truncated) {
        Err(IcsImportError::InvalidDate { .. }) => {}
        other => panic!("expected invalid date, got {other:?}"),
    }

    // the well-formed first event must not have been applied
    let entries = ledger
        .entries_in_range(&property(), date(2024, 7, 1), date(2024, 7, 31))
        .expect("list");
    assert!(entries.is_empty());
}
