//! Contract checks: every endpoint's response body must conform to its schema
//! document. The checks are independent of each other; each one creates
//! whatever booking or token it needs.

use std::sync::Arc;

use serde_json::Value;

use crate::auth::{AuthCredentials, AuthToken};
use crate::data::{BookingId, BookingSource};
use crate::http::{ApiResponse, BookerClient};
use crate::schema::{SchemaName, SchemaStore};
use crate::testing::{Expectations, Failure, FailureKind, Scenario, Severity, StepDef, StepFuture};

pub const SCENARIO_NAME: &str = "schema_validation";

pub struct SchemaCheckContext {
    client: BookerClient,
    credentials: AuthCredentials,
    data: Box<dyn BookingSource>,
    schemas: Arc<SchemaStore>,
    unknown_booking_id: BookingId,
}

impl SchemaCheckContext {
    pub fn new(
        client: BookerClient,
        credentials: AuthCredentials,
        data: Box<dyn BookingSource>,
        schemas: Arc<SchemaStore>,
        unknown_booking_id: BookingId,
    ) -> Self {
        Self {
            client,
            credentials,
            data,
            schemas,
            unknown_booking_id,
        }
    }

    async fn token(&self) -> Result<AuthToken, Failure> {
        let response = self.client.create_token(&self.credentials).await?;
        let body = Expectations::new()
            .status(200)
            .not_null("token")
            .check(&response)?;
        body.as_ref()
            .and_then(|body| body.get("token"))
            .and_then(Value::as_str)
            .map(AuthToken::new)
            .ok_or_else(|| Failure::new(FailureKind::MissingIdentifier, "field `token` is not a string"))
    }

    fn validate(&self, name: SchemaName, response: &ApiResponse) -> Result<(), Failure> {
        let body = Expectations::new().status(200).check(response)?.ok_or_else(|| {
            Failure::new(
                FailureKind::SchemaMismatch,
                format!("response is not JSON, cannot check `{name}`"),
            )
        })?;
        self.schemas.validate(name, &body)
    }
}

/// Create a throwaway booking for checks that need an existing id.
async fn seed_booking(ctx: &mut SchemaCheckContext) -> Result<BookingId, Failure> {
    let booking = ctx.data.booking();
    let response = ctx.client.create_booking(&booking).await?;
    let body = Expectations::new()
        .status(200)
        .not_null("bookingid")
        .check(&response)?;
    body.as_ref()
        .and_then(|body| body.get("bookingid"))
        .and_then(Value::as_u64)
        .map(BookingId)
        .ok_or_else(|| Failure::new(FailureKind::MissingIdentifier, "field `bookingid` is not an integer"))
}

pub fn scenario() -> Scenario<SchemaCheckContext> {
    Scenario::new(
        SCENARIO_NAME,
        vec![
            StepDef {
                id: "create_booking_schema",
                description: "Create booking response matches its schema",
                severity: Severity::Critical,
                priority: 1,
                depends_on: &[],
                run: create_booking_schema,
            },
            StepDef {
                id: "get_booking_schema",
                description: "Get booking response matches its schema",
                severity: Severity::Critical,
                priority: 2,
                depends_on: &[],
                run: get_booking_schema,
            },
            StepDef {
                id: "update_booking_schema",
                description: "Update booking response matches its schema",
                severity: Severity::Normal,
                priority: 3,
                depends_on: &[],
                run: update_booking_schema,
            },
            StepDef {
                id: "partial_update_booking_schema",
                description: "Partial update response matches its schema",
                severity: Severity::Normal,
                priority: 4,
                depends_on: &[],
                run: partial_update_booking_schema,
            },
            StepDef {
                id: "create_token_schema",
                description: "Auth token response matches its schema",
                severity: Severity::Blocker,
                priority: 5,
                depends_on: &[],
                run: create_token_schema,
            },
            StepDef {
                id: "unknown_booking_not_found",
                description: "Reading a never-created booking returns 404",
                severity: Severity::Normal,
                priority: 6,
                depends_on: &[],
                run: unknown_booking_not_found,
            },
        ],
    )
}

fn create_booking_schema(ctx: &mut SchemaCheckContext) -> StepFuture<'_> {
    Box::pin(async move {
        let booking = ctx.data.booking();
        let response = ctx.client.create_booking(&booking).await?;
        ctx.validate(SchemaName::CreateBooking, &response)
    })
}

fn get_booking_schema(ctx: &mut SchemaCheckContext) -> StepFuture<'_> {
    Box::pin(async move {
        let id = seed_booking(ctx).await?;
        let response = ctx.client.get_booking(id).await?;
        ctx.validate(SchemaName::GetBooking, &response)
    })
}

fn update_booking_schema(ctx: &mut SchemaCheckContext) -> StepFuture<'_> {
    Box::pin(async move {
        let token = ctx.token().await?;
        let id = seed_booking(ctx).await?;
        let updated = ctx.data.booking();
        let response = ctx.client.update_booking(id, &updated, &token).await?;
        ctx.validate(SchemaName::UpdateBooking, &response)
    })
}

fn partial_update_booking_schema(ctx: &mut SchemaCheckContext) -> StepFuture<'_> {
    Box::pin(async move {
        let token = ctx.token().await?;
        let id = seed_booking(ctx).await?;
        let partial = ctx.data.partial_booking();
        let response = ctx.client.partial_update_booking(id, &partial, &token).await?;
        ctx.validate(SchemaName::UpdatePartialBooking, &response)
    })
}

fn create_token_schema(ctx: &mut SchemaCheckContext) -> StepFuture<'_> {
    Box::pin(async move {
        let response = ctx.client.create_token(&ctx.credentials).await?;
        ctx.validate(SchemaName::CreateToken, &response)
    })
}

fn unknown_booking_not_found(ctx: &mut SchemaCheckContext) -> StepFuture<'_> {
    Box::pin(async move {
        let response = ctx.client.get_booking(ctx.unknown_booking_id).await?;
        Expectations::new().status(404).check(&response)?;
        Ok(())
    })
}
