//! # Booking API Transport
//!
//! Request/response types and the client that talks to the booking API.
//! Every call is attempted exactly once; status interpretation is left to
//! the assertions in [`crate::testing`].

pub mod client;
pub mod method;
pub mod request;
pub mod response;

pub use client::BookerClient;
pub use response::ApiResponse;
