use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::domain::{BlockProvenance, BlockedDay, DateRange, PropertyId};
use super::repository::{BlockedDateRepository, RepositoryError};

/// Per-property calendar of unavailable days, each tagged with the origin
/// of the block. The ledger is the single authority consulted both by UI
/// validation and by the confirm-time re-check inside the lifecycle
/// service.
pub struct AvailabilityLedger<B> {
    store: Arc<B>,
}

impl<B> Clone for AvailabilityLedger<B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

/// Outcome of validating a candidate range for the booking UI: whether the
/// range is free, and if not, exactly which days are in the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateValidation {
    pub free: bool,
    pub conflicting_days: Vec<NaiveDate>,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl LedgerError {
    pub(crate) fn into_repository(self) -> RepositoryError {
        match self {
            LedgerError::Repository(err) => err,
        }
    }
}

impl<B> AvailabilityLedger<B>
where
    B: BlockedDateRepository,
{
    pub fn new(store: Arc<B>) -> Self {
        Self { store }
    }

    /// True iff no day of the range is blocked, regardless of provenance.
    pub fn is_range_free(
        &self,
        property: &PropertyId,
        range: &DateRange,
    ) -> Result<bool, LedgerError> {
        Ok(self.conflicting_days(property, range)?.is_empty())
    }

    /// The blocked days inside the range, ascending. Empty means free.
    pub fn conflicting_days(
        &self,
        property: &PropertyId,
        range: &DateRange,
    ) -> Result<Vec<NaiveDate>, LedgerError> {
        let entries = self
            .store
            .days_in_range(property, range.start(), range.end())?;
        Ok(entries.into_iter().map(|entry| entry.date).collect())
    }

    /// Idempotently blocks every day of the range under the given
    /// provenance. Returns how many days were newly blocked; days already
    /// present (under any provenance) are left untouched.
    pub fn block(
        &self,
        property: &PropertyId,
        range: &DateRange,
        provenance: BlockProvenance,
    ) -> Result<usize, LedgerError> {
        let mut added = 0;
        for date in range.days() {
            if self.store.insert_day(property, BlockedDay { date, provenance })? {
                added += 1;
            }
        }
        debug!(
            property = %property.0,
            provenance = provenance.label(),
            added,
            "blocked date range"
        );
        Ok(added)
    }

    /// Blocks one day; returns whether it was newly blocked.
    pub fn block_day(
        &self,
        property: &PropertyId,
        date: NaiveDate,
        provenance: BlockProvenance,
    ) -> Result<bool, LedgerError> {
        Ok(self.store.insert_day(property, BlockedDay { date, provenance })?)
    }

    /// Frees only the days of the range carrying the matching provenance.
    /// A manually blocked day inside a cancelled booking's range stays
    /// blocked.
    pub fn unblock(
        &self,
        property: &PropertyId,
        range: &DateRange,
        provenance: BlockProvenance,
    ) -> Result<usize, LedgerError> {
        let days: Vec<NaiveDate> = range.days().collect();
        let removed = self.store.remove_days(property, &days, provenance)?;
        debug!(
            property = %property.0,
            provenance = provenance.label(),
            removed,
            "unblocked date range"
        );
        Ok(removed)
    }

    /// Blocked dates in the window, for calendar rendering.
    pub fn list_blocked(
        &self,
        property: &PropertyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeSet<NaiveDate>, LedgerError> {
        let entries = self.store.days_in_range(property, from, to)?;
        Ok(entries.into_iter().map(|entry| entry.date).collect())
    }

    /// Blocked dates with their provenance, for operator tooling and the
    /// iCal export path.
    pub fn entries_in_range(
        &self,
        property: &PropertyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BlockedDay>, LedgerError> {
        Ok(self.store.days_in_range(property, from, to)?)
    }

    /// Every blocked date for the property, ascending.
    pub fn all_entries(&self, property: &PropertyId) -> Result<Vec<BlockedDay>, LedgerError> {
        Ok(self.store.all_days(property)?)
    }

    /// Read-only validation surface for booking forms: reports whether the
    /// candidate range is free and, on conflict, the specific days the UI
    /// should explain, without exposing ledger internals.
    pub fn validate_candidate(
        &self,
        property: &PropertyId,
        range: &DateRange,
    ) -> Result<CandidateValidation, LedgerError> {
        let conflicting_days = self.conflicting_days(property, range)?;
        Ok(CandidateValidation {
            free: conflicting_days.is_empty(),
            conflicting_days,
        })
    }
}
