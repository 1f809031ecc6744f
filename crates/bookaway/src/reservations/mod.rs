//! Reservation lifecycle and availability engine.
//!
//! Everything flows around two shared ideas: the [`domain::DateRange`]
//! value type and the per-property [`ledger::AvailabilityLedger`] of
//! blocked days. The [`service::ReservationService`] couples status
//! transitions to ledger mutations through a compensating protocol;
//! [`ical::CalendarSync`] reads and writes the same ledger as a side
//! channel; [`pricing::PricingCalendar`] is a pure calculator.

pub mod domain;
pub mod ical;
pub mod ledger;
pub mod pricing;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    BlockProvenance, BlockedDay, DateRange, DateRangeError, GuestContact, PriceOverride,
    PropertyId, Reservation, ReservationId, ReservationKind, ReservationStatus,
};
pub use ical::{CalendarSync, IcsImportError, ImportOutcome};
pub use ledger::{AvailabilityLedger, CandidateValidation, LedgerError};
pub use pricing::{month_span, PricingCalendar, QuoteError, RateCard};
pub use repository::{BlockedDateRepository, RepositoryError, ReservationRepository};
pub use router::reservation_router;
pub use service::{ReservationError, ReservationRequest, ReservationService};
