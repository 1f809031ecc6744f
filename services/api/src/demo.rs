use crate::infra::{demo_rate_card, InMemoryBlockedDateRepository, InMemoryReservationRepository};
use bookaway::error::AppError;
use bookaway::reservations::{
    CalendarSync, DateRange, GuestContact, PricingCalendar, PropertyId, RateCard,
    ReservationError, ReservationRequest, ReservationService,
};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Check-in date (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) check_in: NaiveDate,
    /// Check-out date (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) check_out: NaiveDate,
    /// Nightly rate for weekdays
    #[arg(long)]
    pub(crate) weekday_rate: Option<u32>,
    /// Nightly rate for weekend days
    #[arg(long)]
    pub(crate) weekend_rate: Option<u32>,
    /// Flat rate for month-length stays
    #[arg(long)]
    pub(crate) monthly_rate: Option<u32>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Property identifier used throughout the demo
    #[arg(long, default_value = "villa-aurora")]
    pub(crate) property: String,
    /// Check-in date for the demo booking (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) check_in: Option<NaiveDate>,
    /// Length of the demo stay in nights
    #[arg(long, default_value_t = 3)]
    pub(crate) nights: u32,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let range = DateRange::new(args.check_in, args.check_out)?;
    let rates = RateCard {
        weekday_rate: args.weekday_rate,
        weekend_rate: args.weekend_rate,
        monthly_rate: args.monthly_rate,
        ..RateCard::default()
    };

    let total = PricingCalendar::new(rates)
        .quote(&range, &BTreeMap::new())
        .map_err(ReservationError::from)?;

    println!(
        "{} -> {} ({} nights): {}",
        args.check_in,
        args.check_out,
        range.nights(),
        total
    );
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let property = PropertyId(args.property.clone());
    let check_in = args.check_in.unwrap_or_else(|| Local::now().date_naive());
    let check_out = check_in + Duration::days(args.nights.max(1) as i64);
    let stay = DateRange::new(check_in, check_out)?;
    let rates = demo_rate_card();

    let reservations = Arc::new(InMemoryReservationRepository::default());
    let blocked_days = Arc::new(InMemoryBlockedDateRepository::default());
    let service = ReservationService::new(reservations, blocked_days);
    let sync = CalendarSync::new(service.ledger().clone());

    println!("== Bookaway reservation engine demo ==");
    println!("property: {}", property.0);

    let total = PricingCalendar::new(rates.clone())
        .quote(&stay, &BTreeMap::new())
        .map_err(ReservationError::from)?;
    println!("quoted {check_in} -> {check_out}: {total}");

    let booking = service.reserve_short_stay(
        ReservationRequest {
            property_id: property.clone(),
            range: stay,
            guest: GuestContact {
                name: "Demo Guest".to_string(),
                email: "guest@example.com".to_string(),
                phone: None,
            },
            occupant_count: 2,
        },
        &rates,
        &BTreeMap::new(),
    )?;
    println!(
        "created {} ({}, total {})",
        booking.id.0,
        booking.status.label(),
        booking.total_price
    );

    let confirmed = service.confirm(&booking.id)?;
    println!("confirmed {}", confirmed.id.0);

    let competing = service.reserve_short_stay(
        ReservationRequest {
            property_id: property.clone(),
            range: stay,
            guest: GuestContact {
                name: "Second Guest".to_string(),
                email: "second@example.com".to_string(),
                phone: None,
            },
            occupant_count: 3,
        },
        &rates,
        &BTreeMap::new(),
    )?;
    match service.confirm(&competing.id) {
        Err(ReservationError::RangeUnavailable { days }) => {
            println!(
                "competing {} refused: {} conflicting days",
                competing.id.0,
                days.len()
            );
        }
        Ok(_) => println!("competing confirm unexpectedly succeeded"),
        Err(other) => return Err(other.into()),
    }

    let feed_day = check_in + Duration::days(30);
    let feed = format!(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:demo@channel\r\nDTSTART;VALUE=DATE:{}\r\nSUMMARY:Reserved\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
        feed_day.format("%Y%m%d")
    );
    let imported = sync.import_ics(&property, &feed)?;
    println!(
        "imported channel feed: {} events, {} newly blocked",
        imported.events, imported.added
    );

    let exported = sync.export_ics(&property).map_err(ReservationError::from)?;
    println!("exported calendar:\n{exported}");

    let cancelled = service.cancel(&booking.id, Some("demo teardown".to_string()))?;
    println!("cancelled {}", cancelled.id.0);

    let validation = service
        .ledger()
        .validate_candidate(&property, &stay)
        .map_err(ReservationError::from)?;
    println!(
        "range free again after cancellation: {} (conflicts: {})",
        validation.free,
        validation.conflicting_days.len()
    );

    Ok(())
}
