use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::reservations::domain::{
    BlockProvenance, BlockedDay, DateRange, GuestContact, PropertyId, Reservation, ReservationId,
};
use crate::reservations::pricing::RateCard;
use crate::reservations::repository::{
    BlockedDateRepository, RepositoryError, ReservationRepository,
};
use crate::reservations::service::ReservationRequest;

#[derive(Default)]
pub(super) struct MemoryReservations {
    records: Mutex<HashMap<ReservationId, Reservation>>,
}

impl ReservationRepository for MemoryReservations {
    fn insert(&self, reservation: Reservation) -> Result<Reservation, RepositoryError> {
        let mut guard = self.records.lock().expect("reservation mutex poisoned");
        if guard.contains_key(&reservation.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(reservation.id.clone(), reservation.clone());
        Ok(reservation)
    }

    fn update(&self, reservation: Reservation) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("reservation mutex poisoned");
        if !guard.contains_key(&reservation.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(reservation.id.clone(), reservation);
        Ok(())
    }

    fn fetch(&self, id: &ReservationId) -> Result<Option<Reservation>, RepositoryError> {
        let guard = self.records.lock().expect("reservation mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_property(&self, property: &PropertyId) -> Result<Vec<Reservation>, RepositoryError> {
        let guard = self.records.lock().expect("reservation mutex poisoned");
        Ok(guard
            .values()
            .filter(|reservation| &reservation.property_id == property)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryBlockedDays {
    days: Mutex<HashMap<PropertyId, BTreeMap<NaiveDate, BlockProvenance>>>,
}

impl BlockedDateRepository for MemoryBlockedDays {
    fn insert_day(&self, property: &PropertyId, day: BlockedDay) -> Result<bool, RepositoryError> {
        let mut guard = self.days.lock().expect("ledger mutex poisoned");
        let calendar = guard.entry(property.clone()).or_default();
        if calendar.contains_key(&day.date) {
            return Ok(false);
        }
        calendar.insert(day.date, day.provenance);
        Ok(true)
    }

    fn remove_days(
        &self,
        property: &PropertyId,
        days: &[NaiveDate],
        provenance: BlockProvenance,
    ) -> Result<usize, RepositoryError> {
        let mut guard = self.days.lock().expect("ledger mutex poisoned");
        let Some(calendar) = guard.get_mut(property) else {
            return Ok(0);
        };
        let mut removed = 0;
        for date in days {
            if calendar.get(date) == Some(&provenance) {
                calendar.remove(date);
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn days_in_range(
        &self,
        property: &PropertyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BlockedDay>, RepositoryError> {
        let guard = self.days.lock().expect("ledger mutex poisoned");
        Ok(guard
            .get(property)
            .map(|calendar| {
                calendar
                    .range(from..=to)
                    .map(|(date, provenance)| BlockedDay {
                        date: *date,
                        provenance: *provenance,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn all_days(&self, property: &PropertyId) -> Result<Vec<BlockedDay>, RepositoryError> {
        let guard = self.days.lock().expect("ledger mutex poisoned");
        Ok(guard
            .get(property)
            .map(|calendar| {
                calendar
                    .iter()
                    .map(|(date, provenance)| BlockedDay {
                        date: *date,
                        provenance: *provenance,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Blocked-day store whose writes can be made to fail on demand, for
/// driving the compensation paths.
#[derive(Default)]
pub(super) struct FlakyBlockedDays {
    pub(super) inner: MemoryBlockedDays,
    fail_inserts: AtomicBool,
    fail_removes: AtomicBool,
}

impl FlakyBlockedDays {
    pub(super) fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::Relaxed);
    }

    pub(super) fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::Relaxed);
    }
}

impl BlockedDateRepository for FlakyBlockedDays {
    fn insert_day(&self, property: &PropertyId, day: BlockedDay) -> Result<bool, RepositoryError> {
        if self.fail_inserts.load(Ordering::Relaxed) {
            return Err(RepositoryError::Unavailable("write refused".to_string()));
        }
        self.inner.insert_day(property, day)
    }

    fn remove_days(
        &self,
        property: &PropertyId,
        days: &[NaiveDate],
        provenance: BlockProvenance,
    ) -> Result<usize, RepositoryError> {
        if self.fail_removes.load(Ordering::Relaxed) {
            return Err(RepositoryError::Unavailable("delete refused".to_string()));
        }
        self.inner.remove_days(property, days, provenance)
    }

    fn days_in_range(
        &self,
        property: &PropertyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BlockedDay>, RepositoryError> {
        self.inner.days_in_range(property, from, to)
    }

    fn all_days(&self, property: &PropertyId) -> Result<Vec<BlockedDay>, RepositoryError> {
        self.inner.all_days(property)
    }
}

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
    DateRange::new(start, end).expect("valid range")
}

pub(super) fn property() -> PropertyId {
    PropertyId("prop-001".to_string())
}

pub(super) fn guest() -> GuestContact {
    GuestContact {
        name: "Avery Walsh".to_string(),
        email: "avery@example.com".to_string(),
        phone: None,
    }
}

pub(super) fn nightly_rates() -> RateCard {
    RateCard {
        weekday_rate: Some(100),
        weekend_rate: Some(120),
        ..RateCard::default()
    }
}

pub(super) fn request(stay: DateRange) -> ReservationRequest {
    ReservationRequest {
        property_id: property(),
        range: stay,
        guest: guest(),
        occupant_count: 2,
    }
}

pub(super) fn stores() -> (Arc<MemoryReservations>, Arc<MemoryBlockedDays>) {
    (
        Arc::new(MemoryReservations::default()),
        Arc::new(MemoryBlockedDays::default()),
    )
}
