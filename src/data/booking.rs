use std::fmt::{self, Display};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stay window of a booking. Both dates serialize as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDates {
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
}

/// Full booking body as accepted by `POST /booking` and `PUT /booking/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub firstname: String,
    pub lastname: String,
    pub totalprice: u32,
    pub depositpaid: bool,
    pub bookingdates: BookingDates,
    pub additionalneeds: String,
}

/// Body of `PATCH /booking/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialBookingRecord {
    pub firstname: String,
    pub totalprice: u32,
}

impl BookingRecord {
    /// The record the server is expected to hold after `partial` is applied.
    pub fn merged_with(&self, partial: &PartialBookingRecord) -> BookingRecord {
        BookingRecord {
            firstname: partial.firstname.clone(),
            totalprice: partial.totalprice,
            ..self.clone()
        }
    }
}

/// Server-assigned booking identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub u64);

impl Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> BookingRecord {
        BookingRecord {
            firstname: "Alice".into(),
            lastname: "Smith".into(),
            totalprice: 500,
            depositpaid: true,
            bookingdates: BookingDates {
                checkin: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                checkout: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            },
            additionalneeds: "Breakfast".into(),
        }
    }

    #[test]
    fn serializes_with_wire_names_and_iso_dates() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "firstname": "Alice",
                "lastname": "Smith",
                "totalprice": 500,
                "depositpaid": true,
                "bookingdates": { "checkin": "2024-01-01", "checkout": "2024-01-05" },
                "additionalneeds": "Breakfast"
            })
        );
    }

    #[test]
    fn merged_with_only_touches_partial_fields() {
        let partial = PartialBookingRecord {
            firstname: "Carol".into(),
            totalprice: 4200,
        };
        let merged = sample().merged_with(&partial);

        assert_eq!(merged.firstname, "Carol");
        assert_eq!(merged.totalprice, 4200);
        assert_eq!(merged.lastname, "Smith");
        assert_eq!(merged.bookingdates, sample().bookingdates);
    }

    #[test]
    fn booking_id_is_a_bare_number_on_the_wire() {
        let id: BookingId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(id, BookingId(42));
        assert_eq!(id.to_string(), "42");
    }
}
