//! The booking lifecycle chain: authenticate, create, read, update, partially
//! update, delete, and confirm the booking is gone. Every step needs the one
//! before it, so a single failure skips the rest of the chain.

use serde_json::Value;

use crate::auth::{AuthCredentials, AuthToken};
use crate::data::{BookingId, BookingRecord, BookingSource};
use crate::http::BookerClient;
use crate::testing::{Expectations, Failure, FailureKind, Scenario, Severity, StepDef, StepFuture};

pub const SCENARIO_NAME: &str = "booking_lifecycle";

pub struct LifecycleContext {
    client: BookerClient,
    credentials: AuthCredentials,
    data: Box<dyn BookingSource>,
    token: Option<AuthToken>,
    booking_id: Option<BookingId>,
    /// What the server should currently hold for `booking_id`.
    expected: Option<BookingRecord>,
}

impl LifecycleContext {
    pub fn new(client: BookerClient, credentials: AuthCredentials, data: Box<dyn BookingSource>) -> Self {
        Self {
            client,
            credentials,
            data,
            token: None,
            booking_id: None,
            expected: None,
        }
    }

    #[cfg(test)]
    pub fn booking_id(&self) -> Option<BookingId> {
        self.booking_id
    }

    fn token(&self) -> Result<AuthToken, Failure> {
        self.token
            .clone()
            .ok_or_else(|| Failure::setup("no auth token from `authenticate`"))
    }

    fn booking_id_or_fail(&self) -> Result<BookingId, Failure> {
        self.booking_id
            .ok_or_else(|| Failure::setup("no booking id from `create_booking`"))
    }

    fn expected_or_fail(&self) -> Result<BookingRecord, Failure> {
        self.expected
            .clone()
            .ok_or_else(|| Failure::setup("no expected booking state"))
    }
}

/// GET the booking and compare every field with `expected`.
async fn read_back(client: &BookerClient, id: BookingId, expected: &BookingRecord) -> Result<(), Failure> {
    let response = client.get_booking(id).await?;
    Expectations::new()
        .status(200)
        .fields_of("", expected)?
        .check(&response)?;
    Ok(())
}

pub fn scenario() -> Scenario<LifecycleContext> {
    Scenario::new(
        SCENARIO_NAME,
        vec![
            StepDef {
                id: "authenticate",
                description: "Generate an auth token",
                severity: Severity::Blocker,
                priority: 1,
                depends_on: &[],
                run: authenticate,
            },
            StepDef {
                id: "create_booking",
                description: "Create a new booking",
                severity: Severity::Blocker,
                priority: 2,
                depends_on: &["authenticate"],
                run: create_booking,
            },
            StepDef {
                id: "read_booking",
                description: "Get the newly created booking",
                severity: Severity::Critical,
                priority: 3,
                depends_on: &["create_booking"],
                run: read_booking,
            },
            StepDef {
                id: "update_booking",
                description: "Update the booking",
                severity: Severity::Normal,
                priority: 4,
                depends_on: &["read_booking", "authenticate"],
                run: update_booking,
            },
            StepDef {
                id: "partial_update_booking",
                description: "Update the booking partially",
                severity: Severity::Normal,
                priority: 5,
                depends_on: &["update_booking"],
                run: partial_update_booking,
            },
            StepDef {
                id: "delete_booking",
                description: "Delete the booking",
                severity: Severity::Normal,
                priority: 6,
                depends_on: &["partial_update_booking"],
                run: delete_booking,
            },
            StepDef {
                id: "verify_booking_deleted",
                description: "Check the deleted booking is gone",
                severity: Severity::Normal,
                priority: 7,
                depends_on: &["delete_booking"],
                run: verify_booking_deleted,
            },
        ],
    )
}

fn authenticate(ctx: &mut LifecycleContext) -> StepFuture<'_> {
    Box::pin(async move {
        let response = ctx.client.create_token(&ctx.credentials).await?;
        let body = Expectations::new()
            .status(200)
            .not_null("token")
            .check(&response)?;

        let token = body
            .as_ref()
            .and_then(|body| body.get("token"))
            .and_then(Value::as_str)
            .ok_or_else(|| Failure::new(FailureKind::MissingIdentifier, "field `token` is not a string"))?;
        ctx.token = Some(AuthToken::new(token));
        Ok(())
    })
}

fn create_booking(ctx: &mut LifecycleContext) -> StepFuture<'_> {
    Box::pin(async move {
        let booking = ctx.data.booking();
        let response = ctx.client.create_booking(&booking).await?;
        let body = Expectations::new()
            .status(200)
            .not_null("bookingid")
            .fields_of("booking", &booking)?
            .check(&response)?;

        let id = body
            .as_ref()
            .and_then(|body| body.get("bookingid"))
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                Failure::new(FailureKind::MissingIdentifier, "field `bookingid` is not an integer")
            })?;

        tracing::info!(booking_id = id, "booking created");
        ctx.booking_id = Some(BookingId(id));
        ctx.expected = Some(booking);
        Ok(())
    })
}

fn read_booking(ctx: &mut LifecycleContext) -> StepFuture<'_> {
    Box::pin(async move {
        let id = ctx.booking_id_or_fail()?;
        let expected = ctx.expected_or_fail()?;
        read_back(&ctx.client, id, &expected).await
    })
}

fn update_booking(ctx: &mut LifecycleContext) -> StepFuture<'_> {
    Box::pin(async move {
        let id = ctx.booking_id_or_fail()?;
        let token = ctx.token()?;
        let updated = ctx.data.booking();

        let response = ctx.client.update_booking(id, &updated, &token).await?;
        Expectations::new()
            .status(200)
            .fields_of("", &updated)?
            .check(&response)?;

        ctx.expected = Some(updated.clone());
        read_back(&ctx.client, id, &updated).await
    })
}

fn partial_update_booking(ctx: &mut LifecycleContext) -> StepFuture<'_> {
    Box::pin(async move {
        let id = ctx.booking_id_or_fail()?;
        let token = ctx.token()?;
        let current = ctx.expected_or_fail()?;
        let partial = ctx.data.partial_booking();

        let response = ctx.client.partial_update_booking(id, &partial, &token).await?;
        Expectations::new()
            .status(200)
            .field("firstname", partial.firstname.as_str())
            .field("totalprice", partial.totalprice)
            .check(&response)?;

        let merged = current.merged_with(&partial);
        ctx.expected = Some(merged.clone());
        read_back(&ctx.client, id, &merged).await
    })
}

fn delete_booking(ctx: &mut LifecycleContext) -> StepFuture<'_> {
    Box::pin(async move {
        let id = ctx.booking_id_or_fail()?;
        let token = ctx.token()?;

        let response = ctx.client.delete_booking(id, &token).await?;
        Expectations::new().status(201).check(&response)?;

        ctx.expected = None;
        Ok(())
    })
}

fn verify_booking_deleted(ctx: &mut LifecycleContext) -> StepFuture<'_> {
    Box::pin(async move {
        let id = ctx.booking_id_or_fail()?;
        let response = ctx.client.get_booking(id).await?;
        Expectations::new().status(404).check(&response)?;
        Ok(())
    })
}
