//! # Scenarios
//!
//! The booking lifecycle chain and the schema contract checks, each a
//! [`crate::testing::Scenario`] over its own context.

pub mod lifecycle;
pub mod schema_checks;

#[cfg(test)]
pub(crate) mod fake_api;

pub use lifecycle::LifecycleContext;
pub use schema_checks::SchemaCheckContext;
