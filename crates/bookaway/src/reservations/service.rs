use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::domain::{
    BlockProvenance, DateRange, GuestContact, PropertyId, Reservation, ReservationId,
    ReservationKind, ReservationStatus,
};
use super::ledger::{AvailabilityLedger, LedgerError};
use super::pricing::{PricingCalendar, QuoteError, RateCard};
use super::repository::{BlockedDateRepository, RepositoryError, ReservationRepository};

static RESERVATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_reservation_id() -> ReservationId {
    let id = RESERVATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReservationId(format!("res-{id:06}"))
}

/// Boundary payload for creating a reservation of either kind.
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub property_id: PropertyId,
    pub range: DateRange,
    pub guest: GuestContact,
    pub occupant_count: u32,
}

/// Error raised by the reservation lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("guest name is required")]
    MissingGuestName,
    #[error("guest email is required")]
    MissingGuestEmail,
    #[error("occupant count must be positive")]
    NoOccupants,
    #[error("stay of {nights} nights is outside the bookable window for this property")]
    StayLengthOutOfBounds {
        nights: u32,
        min: Option<u32>,
        max: Option<u32>,
    },
    #[error("cannot {attempted} a {} reservation", .from.label())]
    InvalidTransition {
        from: ReservationStatus,
        attempted: &'static str,
    },
    #[error("{} of the requested days are no longer available", .days.len())]
    RangeUnavailable { days: Vec<NaiveDate> },
    #[error("confirmation failed while blocking the calendar; the reservation was reverted to pending")]
    ConfirmationFailed {
        #[source]
        source: RepositoryError,
    },
    #[error("reservation was cancelled but its blocked days could not all be released")]
    PartialCancellation {
        #[source]
        source: RepositoryError,
    },
    #[error("reservation {} not found", .id.0)]
    NotFound { id: ReservationId },
    #[error(transparent)]
    Quote(#[from] QuoteError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<LedgerError> for ReservationError {
    fn from(err: LedgerError) -> Self {
        Self::Repository(err.into_repository())
    }
}

/// Service driving a reservation from creation to a terminal state and
/// keeping the availability ledger consistent with every transition.
pub struct ReservationService<R, B> {
    reservations: Arc<R>,
    ledger: AvailabilityLedger<B>,
}

impl<R, B> ReservationService<R, B>
where
    R: ReservationRepository + 'static,
    B: BlockedDateRepository + 'static,
{
    pub fn new(reservations: Arc<R>, blocked_days: Arc<B>) -> Self {
        Self {
            reservations,
            ledger: AvailabilityLedger::new(blocked_days),
        }
    }

    /// The ledger this service mutates, shared with calendar tooling.
    pub fn ledger(&self) -> &AvailabilityLedger<B> {
        &self.ledger
    }

    /// Creates a pending short-stay booking. The total price is computed
    /// once here from the property's rates and overrides, and stored.
    pub fn reserve_short_stay(
        &self,
        request: ReservationRequest,
        rates: &RateCard,
        overrides: &BTreeMap<NaiveDate, u32>,
    ) -> Result<Reservation, ReservationError> {
        validate_request(&request)?;
        let nights = request.range.nights();
        let below = rates.min_nights.is_some_and(|min| nights < min);
        let above = rates.max_nights.is_some_and(|max| nights > max);
        if below || above {
            return Err(ReservationError::StayLengthOutOfBounds {
                nights,
                min: rates.min_nights,
                max: rates.max_nights,
            });
        }

        let total_price = PricingCalendar::new(rates.clone()).quote(&request.range, overrides)?;
        self.insert_pending(request, ReservationKind::ShortStay, total_price)
    }

    /// Creates a pending season rental, priced at months-spanned times the
    /// monthly rate. Season rentals never write to the availability ledger.
    pub fn reserve_season_rental(
        &self,
        request: ReservationRequest,
        rates: &RateCard,
    ) -> Result<Reservation, ReservationError> {
        validate_request(&request)?;
        let total_price = PricingCalendar::new(rates.clone()).monthly_total(&request.range)?;
        self.insert_pending(request, ReservationKind::SeasonRental, total_price)
    }

    pub fn get(&self, id: &ReservationId) -> Result<Reservation, ReservationError> {
        self.fetch_required(id)
    }

    /// Confirms a pending reservation.
    ///
    /// For short stays the availability is re-checked against the ledger
    /// immediately before the status write: a competing reservation may
    /// have been confirmed since the UI-side validation. The status write
    /// and the ledger block form a compensating pair. If blocking fails,
    /// the status is reverted to pending and the failure surfaces as
    /// `ConfirmationFailed`; the reservation is never left confirmed with
    /// an unblocked calendar.
    pub fn confirm(&self, id: &ReservationId) -> Result<Reservation, ReservationError> {
        let mut reservation = self.fetch_required(id)?;
        if reservation.status != ReservationStatus::Pending {
            return Err(ReservationError::InvalidTransition {
                from: reservation.status,
                attempted: "confirm",
            });
        }

        if reservation.kind.blocks_calendar() {
            let conflicts = self
                .ledger
                .conflicting_days(&reservation.property_id, &reservation.range)?;
            if !conflicts.is_empty() {
                return Err(ReservationError::RangeUnavailable { days: conflicts });
            }
        }

        reservation.status = ReservationStatus::Confirmed;
        reservation.updated_at = Utc::now();
        self.reservations.update(reservation.clone())?;

        if reservation.kind.blocks_calendar() {
            if let Err(block_err) = self.ledger.block(
                &reservation.property_id,
                &reservation.range,
                BlockProvenance::Booking,
            ) {
                self.compensate_failed_confirm(&mut reservation);
                return Err(ReservationError::ConfirmationFailed {
                    source: block_err.into_repository(),
                });
            }
        }

        info!(
            reservation = %reservation.id.0,
            property = %reservation.property_id.0,
            kind = reservation.kind.label(),
            "reservation confirmed"
        );
        Ok(reservation)
    }

    /// Declines a pending reservation. Rejection never touched the ledger,
    /// so there is nothing to compensate.
    pub fn reject(
        &self,
        id: &ReservationId,
        note: Option<String>,
    ) -> Result<Reservation, ReservationError> {
        let mut reservation = self.fetch_required(id)?;
        if reservation.status != ReservationStatus::Pending {
            return Err(ReservationError::InvalidTransition {
                from: reservation.status,
                attempted: "reject",
            });
        }

        reservation.status = ReservationStatus::Rejected;
        reservation.status_note = note;
        reservation.updated_at = Utc::now();
        self.reservations.update(reservation.clone())?;

        info!(reservation = %reservation.id.0, "reservation rejected");
        Ok(reservation)
    }

    /// Cancels a confirmed reservation.
    ///
    /// The status write commits first; only then are the reservation's
    /// booking-provenance days released. If the release fails the
    /// cancellation stands (a stale blocked day is recoverable by
    /// re-running the unblock, unlike a phantom booking) and the failure
    /// surfaces as `PartialCancellation` so an operator can intervene.
    pub fn cancel(
        &self,
        id: &ReservationId,
        note: Option<String>,
    ) -> Result<Reservation, ReservationError> {
        let mut reservation = self.fetch_required(id)?;
        if reservation.status != ReservationStatus::Confirmed {
            return Err(ReservationError::InvalidTransition {
                from: reservation.status,
                attempted: "cancel",
            });
        }

        reservation.status = ReservationStatus::Cancelled;
        reservation.status_note = note;
        reservation.updated_at = Utc::now();
        self.reservations.update(reservation.clone())?;

        if reservation.kind.blocks_calendar() {
            if let Err(unblock_err) = self.ledger.unblock(
                &reservation.property_id,
                &reservation.range,
                BlockProvenance::Booking,
            ) {
                warn!(
                    reservation = %reservation.id.0,
                    property = %reservation.property_id.0,
                    "cancelled reservation still holds blocked days"
                );
                return Err(ReservationError::PartialCancellation {
                    source: unblock_err.into_repository(),
                });
            }
        }

        info!(reservation = %reservation.id.0, "reservation cancelled");
        Ok(reservation)
    }

    fn insert_pending(
        &self,
        request: ReservationRequest,
        kind: ReservationKind,
        total_price: u32,
    ) -> Result<Reservation, ReservationError> {
        let now = Utc::now();
        let reservation = Reservation {
            id: next_reservation_id(),
            property_id: request.property_id,
            kind,
            range: request.range,
            guest: request.guest,
            occupant_count: request.occupant_count,
            total_price,
            status: ReservationStatus::Pending,
            status_note: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.reservations.insert(reservation)?;
        info!(
            reservation = %stored.id.0,
            property = %stored.property_id.0,
            kind = stored.kind.label(),
            total_price = stored.total_price,
            "reservation created"
        );
        Ok(stored)
    }

    fn fetch_required(&self, id: &ReservationId) -> Result<Reservation, ReservationError> {
        self.reservations
            .fetch(id)?
            .ok_or_else(|| ReservationError::NotFound { id: id.clone() })
    }

    /// Rolls a failed confirm back to pending. Any booking-provenance days
    /// written before the failure belong to this reservation, since the
    /// range was free at the re-check, so releasing them is safe.
    fn compensate_failed_confirm(&self, reservation: &mut Reservation) {
        if let Err(cleanup_err) = self.ledger.unblock(
            &reservation.property_id,
            &reservation.range,
            BlockProvenance::Booking,
        ) {
            error!(
                reservation = %reservation.id.0,
                error = %cleanup_err,
                "failed to release partially blocked days during confirm rollback"
            );
        }

        reservation.status = ReservationStatus::Pending;
        reservation.updated_at = Utc::now();
        if let Err(revert_err) = self.reservations.update(reservation.clone()) {
            error!(
                reservation = %reservation.id.0,
                error = %revert_err,
                "failed to revert reservation status during confirm rollback"
            );
        }
    }
}

fn validate_request(request: &ReservationRequest) -> Result<(), ReservationError> {
    if request.guest.name.trim().is_empty() {
        return Err(ReservationError::MissingGuestName);
    }
    if request.guest.email.trim().is_empty() {
        return Err(ReservationError::MissingGuestEmail);
    }
    if request.occupant_count == 0 {
        return Err(ReservationError::NoOccupants);
    }
    Ok(())
}
