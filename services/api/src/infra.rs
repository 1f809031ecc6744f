use bookaway::reservations::{
    BlockProvenance, BlockedDateRepository, BlockedDay, PropertyId, RateCard, RepositoryError,
    Reservation, ReservationId, ReservationRepository,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryReservationRepository {
    records: Mutex<HashMap<ReservationId, Reservation>>,
}

impl ReservationRepository for InMemoryReservationRepository {
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
        if guard.contains_key(&reservation.id) {
            guard.insert(reservation.id.clone(), reservation);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
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

/// Blocked-day store keyed on (property, date) alone, per calendar. The
/// mutex serializes every read-check-write sequence, which is what makes
/// the confirm-time availability re-check trustworthy in this host.
#[derive(Default)]
pub(crate) struct InMemoryBlockedDateRepository {
    calendars: Mutex<HashMap<PropertyId, BTreeMap<NaiveDate, BlockProvenance>>>,
}

impl BlockedDateRepository for InMemoryBlockedDateRepository {
    fn insert_day(&self, property: &PropertyId, day: BlockedDay) -> Result<bool, RepositoryError> {
        let mut guard = self.calendars.lock().expect("calendar mutex poisoned");
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
        let mut guard = self.calendars.lock().expect("calendar mutex poisoned");
        let Some(calendar) = guard.get_mut(property) else {
            return Ok(0);
        };
        let mut removed = 0;
        for day in days {
            if calendar.get(day) == Some(&provenance) {
                calendar.remove(day);
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
        let guard = self.calendars.lock().expect("calendar mutex poisoned");
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
        let guard = self.calendars.lock().expect("calendar mutex poisoned");
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

pub(crate) fn demo_rate_card() -> RateCard {
    RateCard {
        weekday_rate: Some(120),
        weekend_rate: Some(160),
        monthly_rate: Some(2400),
        min_nights: Some(1),
        max_nights: Some(21),
        ..RateCard::default()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
