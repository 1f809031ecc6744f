use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::domain::DateRange;

const DEFAULT_MONTHLY_THRESHOLD_NIGHTS: u32 = 28;

/// Nightly and monthly rates for a property, supplied by the surrounding
/// marketplace and treated as read-only input here. Any rate may be left
/// unset; quoting fails only when a missing rate is actually needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCard {
    #[serde(default)]
    pub weekday_rate: Option<u32>,
    #[serde(default)]
    pub weekend_rate: Option<u32>,
    #[serde(default)]
    pub monthly_rate: Option<u32>,
    #[serde(default)]
    pub min_nights: Option<u32>,
    #[serde(default)]
    pub max_nights: Option<u32>,
    /// Days billed at the weekend rate.
    #[serde(default = "default_weekend_days")]
    pub weekend_days: Vec<Weekday>,
    /// Stays of at least this many nights are billed at the flat monthly
    /// rate instead of per night.
    #[serde(default = "default_monthly_threshold")]
    pub monthly_threshold_nights: u32,
}

fn default_weekend_days() -> Vec<Weekday> {
    vec![Weekday::Sat, Weekday::Sun]
}

fn default_monthly_threshold() -> u32 {
    DEFAULT_MONTHLY_THRESHOLD_NIGHTS
}

impl Default for RateCard {
    fn default() -> Self {
        Self {
            weekday_rate: None,
            weekend_rate: None,
            monthly_rate: None,
            min_nights: None,
            max_nights: None,
            weekend_days: default_weekend_days(),
            monthly_threshold_nights: default_monthly_threshold(),
        }
    }
}

impl RateCard {
    fn is_weekend(&self, day: NaiveDate) -> bool {
        self.weekend_days.contains(&day.weekday())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("no nightly rate configured to price {day}")]
    MissingNightlyRate { day: NaiveDate },
    #[error("stay of {nights} nights is billed monthly but no monthly rate is configured")]
    MissingMonthlyRate { nights: u32 },
}

/// Pure price calculator. Never touches persisted state; callers pass the
/// property's rate card and any per-date overrides alongside the range.
#[derive(Debug, Clone)]
pub struct PricingCalendar {
    rates: RateCard,
}

impl PricingCalendar {
    pub fn new(rates: RateCard) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &RateCard {
        &self.rates
    }

    /// Quoted total for a stay over the range (check-in through check-out).
    ///
    /// Stays meeting the monthly threshold are billed the flat monthly
    /// rate. Otherwise each night is priced by override first, then the
    /// weekend rate, then the weekday rate; the checkout day itself is not
    /// a night and is never priced.
    pub fn quote(
        &self,
        range: &DateRange,
        overrides: &BTreeMap<NaiveDate, u32>,
    ) -> Result<u32, QuoteError> {
        let nights = range.nights();
        if nights >= self.rates.monthly_threshold_nights {
            return self
                .rates
                .monthly_rate
                .ok_or(QuoteError::MissingMonthlyRate { nights });
        }

        let mut total = 0u32;
        for night in range.days().take(nights as usize) {
            let rate = match overrides.get(&night) {
                Some(price) => *price,
                None if self.rates.is_weekend(night) => self
                    .rates
                    .weekend_rate
                    .or(self.rates.weekday_rate)
                    .ok_or(QuoteError::MissingNightlyRate { day: night })?,
                None => self
                    .rates
                    .weekday_rate
                    .ok_or(QuoteError::MissingNightlyRate { day: night })?,
            };
            total += rate;
        }
        Ok(total)
    }

    /// Flat total for a season rental: months touched by the tenancy times
    /// the monthly rate.
    pub fn monthly_total(&self, range: &DateRange) -> Result<u32, QuoteError> {
        let monthly = self
            .rates
            .monthly_rate
            .ok_or(QuoteError::MissingMonthlyRate {
                nights: range.nights(),
            })?;
        Ok(monthly * month_span(range))
    }
}

/// Number of distinct calendar months the range touches.
pub fn month_span(range: &DateRange) -> u32 {
    let start = range.start();
    let end = range.end();
    let months =
        (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32 + 1;
    months as u32
}
