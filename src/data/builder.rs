use chrono::{Local, NaiveDate, TimeDelta};
use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::booking::{BookingDates, BookingRecord, PartialBookingRecord};

/// How far back a generated check-in may lie.
pub const MAX_CHECKIN_DAYS_AGO: i64 = 20;
/// Check-out lies between 1 and this many days ahead.
pub const MAX_CHECKOUT_DAYS_AHEAD: i64 = 5;

pub const TOTAL_PRICE_RANGE: (u32, u32) = (1, 2000);
pub const PARTIAL_TOTAL_PRICE_RANGE: (u32, u32) = (100, 5000);
pub const ADDITIONAL_NEEDS: &str = "Breakfast";

/// Anything that can hand out booking bodies for a scenario.
pub trait BookingSource: Send + Sync {
    fn booking(&mut self) -> BookingRecord;
    fn partial_booking(&mut self) -> PartialBookingRecord;
}

/// Randomized booking data over an explicit random source.
#[derive(Debug, Clone)]
pub struct BookingDataBuilder<R> {
    rng: R,
    today: NaiveDate,
}

impl BookingDataBuilder<StdRng> {
    /// Deterministic builder: the same seed and day replay the same records.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> BookingDataBuilder<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            today: Local::now().date_naive(),
        }
    }

    /// Pin the reference day used for the stay window.
    #[cfg(test)]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn generate_booking(&mut self) -> BookingRecord {
        let days_ago = self.rng.gen_range(0..=MAX_CHECKIN_DAYS_AGO);
        let days_ahead = self.rng.gen_range(1..=MAX_CHECKOUT_DAYS_AHEAD);

        BookingRecord {
            firstname: FirstName().fake_with_rng(&mut self.rng),
            lastname: LastName().fake_with_rng(&mut self.rng),
            totalprice: self
                .rng
                .gen_range(TOTAL_PRICE_RANGE.0..=TOTAL_PRICE_RANGE.1),
            depositpaid: true,
            bookingdates: BookingDates {
                checkin: self.today - TimeDelta::days(days_ago),
                checkout: self.today + TimeDelta::days(days_ahead),
            },
            additionalneeds: ADDITIONAL_NEEDS.to_string(),
        }
    }

    pub fn generate_partial_booking(&mut self) -> PartialBookingRecord {
        PartialBookingRecord {
            firstname: FirstName().fake_with_rng(&mut self.rng),
            totalprice: self
                .rng
                .gen_range(PARTIAL_TOTAL_PRICE_RANGE.0..=PARTIAL_TOTAL_PRICE_RANGE.1),
        }
    }
}

impl<R: Rng + Send + Sync> BookingSource for BookingDataBuilder<R> {
    fn booking(&mut self) -> BookingRecord {
        self.generate_booking()
    }

    fn partial_booking(&mut self) -> PartialBookingRecord {
        self.generate_partial_booking()
    }
}

/// Hands out pre-built records in order, for fixed-value scenarios.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedSource {
    pub bookings: std::collections::VecDeque<BookingRecord>,
    pub partials: std::collections::VecDeque<PartialBookingRecord>,
}

#[cfg(test)]
impl BookingSource for ScriptedSource {
    fn booking(&mut self) -> BookingRecord {
        self.bookings.pop_front().expect("scripted booking exhausted")
    }

    fn partial_booking(&mut self) -> PartialBookingRecord {
        self.partials.pop_front().expect("scripted partial booking exhausted")
    }
}
