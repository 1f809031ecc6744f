use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for reservations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub String);

/// Identifier for a property owned by the surrounding marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyId(pub String);

/// Inclusive calendar-day interval. `start <= end` holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DateRangeError {
    #[error("range start {start} falls after its end {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Single calendar day as a degenerate range.
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Closed-interval intersection test.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Every day from start to end inclusive, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    pub fn day_count(&self) -> u32 {
        (self.end - self.start).num_days() as u32 + 1
    }

    /// Priced nights for a stay: the checkout day is not slept in.
    pub fn nights(&self) -> u32 {
        self.day_count() - 1
    }
}

/// Lifecycle status of a reservation. `Rejected` and `Cancelled` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
}

impl ReservationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }
}

/// Distinguishes nightly stays from month-scale tenancies. Season rentals
/// share the status lifecycle but never write to the availability ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationKind {
    ShortStay,
    SeasonRental,
}

impl ReservationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ShortStay => "short_stay",
            Self::SeasonRental => "season_rental",
        }
    }

    pub const fn blocks_calendar(self) -> bool {
        matches!(self, Self::ShortStay)
    }
}

/// Origin tag on a blocked date: an operator action, an imported feed, or
/// a confirmed in-house booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockProvenance {
    Manual,
    Ical,
    Booking,
}

impl BlockProvenance {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Ical => "ical",
            Self::Booking => "booking",
        }
    }
}

/// One unavailable calendar day for a property. At most one row exists per
/// (property, date); the first writer's provenance is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedDay {
    pub date: NaiveDate,
    pub provenance: BlockProvenance,
}

/// Contact details passed through from the booking form, opaque to the
/// engine beyond presence checks at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestContact {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A reservation of either kind, as persisted. `total_price` is captured
/// once at creation and never recomputed on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub property_id: PropertyId,
    pub kind: ReservationKind,
    pub range: DateRange,
    pub guest: GuestContact,
    pub occupant_count: u32,
    pub total_price: u32,
    pub status: ReservationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner-managed nightly price for one specific date, taking precedence
/// over the weekday/weekend rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceOverride {
    pub date: NaiveDate,
    pub nightly_rate: u32,
}

impl PriceOverride {
    /// Collapses override rows into the date-keyed map the pricing
    /// calendar consumes. At most one row exists per date upstream; if
    /// duplicates slip in, the last one wins.
    pub fn into_map(
        overrides: impl IntoIterator<Item = PriceOverride>,
    ) -> BTreeMap<NaiveDate, u32> {
        overrides
            .into_iter()
            .map(|entry| (entry.date, entry.nightly_rate))
            .collect()
    }
}

// Ranges deserialize through the raw pair so the invariant cannot be
// bypassed by incoming payloads.
impl<'de> Deserialize<'de> for DateRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawRange {
            start: NaiveDate,
            end: NaiveDate,
        }

        let raw = RawRange::deserialize(deserializer)?;
        DateRange::new(raw.start, raw.end).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        let result = DateRange::new(date(2024, 6, 5), date(2024, 6, 1));
        assert_eq!(
            result,
            Err(DateRangeError::Inverted {
                start: date(2024, 6, 5),
                end: date(2024, 6, 1),
            })
        );
    }

    #[test]
    fn days_enumerates_inclusive_and_ascending() {
        let range = DateRange::new(date(2024, 2, 27), date(2024, 3, 2)).expect("valid range");
        let days: Vec<NaiveDate> = range.days().collect();

        assert_eq!(days.len(), range.day_count() as usize);
        assert_eq!(days.first(), Some(&date(2024, 2, 27)));
        assert_eq!(days.last(), Some(&date(2024, 3, 2)));
        assert!(days.windows(2).all(|pair| pair[0] < pair[1]));
        // leap day is in the middle
        assert!(days.contains(&date(2024, 2, 29)));
    }

    #[test]
    fn single_day_range_has_one_day_and_zero_nights() {
        let range = DateRange::single(date(2024, 7, 1));
        assert_eq!(range.day_count(), 1);
        assert_eq!(range.nights(), 0);
        assert_eq!(range.days().count(), 1);
    }

    #[test]
    fn overlap_is_closed_interval() {
        let june = DateRange::new(date(2024, 6, 1), date(2024, 6, 10)).expect("valid");
        let touching = DateRange::new(date(2024, 6, 10), date(2024, 6, 12)).expect("valid");
        let disjoint = DateRange::new(date(2024, 6, 11), date(2024, 6, 12)).expect("valid");

        assert!(june.overlaps(&touching));
        assert!(touching.overlaps(&june));
        assert!(!june.overlaps(&disjoint));
    }

    #[test]
    fn range_deserialization_enforces_order() {
        let ok: DateRange =
            serde_json::from_str(r#"{"start":"2024-06-01","end":"2024-06-03"}"#).expect("valid");
        assert_eq!(ok.nights(), 2);

        let err =
            serde_json::from_str::<DateRange>(r#"{"start":"2024-06-05","end":"2024-06-03"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn terminal_states_are_final_flags() {
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(!ReservationStatus::Confirmed.is_terminal());
        assert!(ReservationStatus::Rejected.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
    }
}
