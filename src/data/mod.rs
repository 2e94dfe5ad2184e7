//! # Booking Test Data
//!
//! Wire records sent to the booking API and the randomized builder that
//! produces them.

pub mod booking;
pub mod builder;

pub use booking::{BookingId, BookingRecord, PartialBookingRecord};
pub use builder::{BookingDataBuilder, BookingSource};
