//! # Testing & Assertions
//!
//! Assertion plumbing for booking API responses, the dependency-ordered step
//! executor, and the run report.
//!
//! A scenario is a set of steps. Each step names the steps it depends on; the
//! executor runs them in topological order and marks every transitive
//! dependent of a failed step as skipped.

pub mod assertion;
pub mod failure;
pub mod report;
pub mod runner;

pub use assertion::Expectations;
pub use failure::{Failure, FailureKind};
pub use report::RunReport;
pub use runner::{Scenario, Severity, StepDef, StepFuture};
