use chrono::NaiveDate;

use super::domain::{BlockProvenance, BlockedDay, PropertyId, Reservation, ReservationId};

/// Storage abstraction for reservations so the lifecycle service can be
/// exercised against in-memory doubles and swapped for a relational
/// adapter without touching the state machine.
pub trait ReservationRepository: Send + Sync {
    fn insert(&self, reservation: Reservation) -> Result<Reservation, RepositoryError>;
    fn update(&self, reservation: Reservation) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ReservationId) -> Result<Option<Reservation>, RepositoryError>;
    fn for_property(&self, property: &PropertyId) -> Result<Vec<Reservation>, RepositoryError>;
}

/// Storage abstraction for the per-property blocked-day calendar.
///
/// Implementations must key rows on (property, date) alone: a day already
/// present is never inserted again, whatever the provenance of the second
/// writer. That uniqueness plus serialized access is what makes the
/// confirm-time availability re-check authoritative.
pub trait BlockedDateRepository: Send + Sync {
    /// Returns `false` when the day was already blocked (a no-op insert).
    fn insert_day(&self, property: &PropertyId, day: BlockedDay) -> Result<bool, RepositoryError>;

    /// Removes only rows whose provenance matches; returns how many were
    /// deleted.
    fn remove_days(
        &self,
        property: &PropertyId,
        days: &[NaiveDate],
        provenance: BlockProvenance,
    ) -> Result<usize, RepositoryError>;

    /// Rows for the property with `from <= date <= to`, ascending by date.
    fn days_in_range(
        &self,
        property: &PropertyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BlockedDay>, RepositoryError>;

    /// Every row for the property, ascending by date.
    fn all_days(&self, property: &PropertyId) -> Result<Vec<BlockedDay>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
