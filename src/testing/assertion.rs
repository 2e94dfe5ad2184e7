use serde::Serialize;
use serde_json::Value;

use crate::http::ApiResponse;

use super::failure::{Failure, FailureKind};

/// Longest slice of a response body quoted in a status failure.
const BODY_EXCERPT_LEN: usize = 200;

/// Target of an assertion within the HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionTarget {
    StatusCode,
    /// Dotted path into the JSON body, e.g. `booking.bookingdates.checkin`.
    JsonPath(String),
}

/// Comparison operator for an assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionOperator {
    Equals,
    NotNull,
}

/// A single assertion that can be evaluated against a response.
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub target: AssertionTarget,
    pub operator: AssertionOperator,
    pub expected: Value,
}

/// Result of evaluating an assertion.
#[derive(Debug, Clone)]
pub struct AssertionResult {
    pub passed: bool,
    pub message: String,
}

impl Assertion {
    pub fn status(code: u16) -> Self {
        Self {
            target: AssertionTarget::StatusCode,
            operator: AssertionOperator::Equals,
            expected: Value::from(code),
        }
    }

    pub fn field(path: impl Into<String>, expected: impl Into<Value>) -> Self {
        Self {
            target: AssertionTarget::JsonPath(path.into()),
            operator: AssertionOperator::Equals,
            expected: expected.into(),
        }
    }

    pub fn not_null(path: impl Into<String>) -> Self {
        Self {
            target: AssertionTarget::JsonPath(path.into()),
            operator: AssertionOperator::NotNull,
            expected: Value::Null,
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match (&self.target, self.operator) {
            (AssertionTarget::StatusCode, _) => FailureKind::Status,
            (AssertionTarget::JsonPath(_), AssertionOperator::NotNull) => {
                FailureKind::MissingIdentifier
            }
            (AssertionTarget::JsonPath(_), AssertionOperator::Equals) => FailureKind::FieldMismatch,
        }
    }

    pub fn evaluate(&self, response: &ApiResponse, body: Option<&Value>) -> AssertionResult {
        let (passed, message) = match &self.target {
            AssertionTarget::StatusCode => {
                let passed = self.expected.as_u64() == Some(u64::from(response.status));
                let actual = format!("{} {}", response.status, response.status_text);
                let message = if passed {
                    String::new()
                } else {
                    format!(
                        "expected status {}, got {actual} after {} ms (body: {})",
                        self.expected,
                        response.duration_ms,
                        excerpt(&response.body)
                    )
                };
                (passed, message)
            }
            AssertionTarget::JsonPath(path) => {
                let found = body.and_then(|body| lookup(body, path));
                let actual = found.map_or_else(|| "<missing>".to_string(), Value::to_string);
                let passed = match self.operator {
                    AssertionOperator::Equals => found == Some(&self.expected),
                    AssertionOperator::NotNull => found.is_some_and(|value| !value.is_null()),
                };
                let message = match (passed, self.operator) {
                    (true, _) => String::new(),
                    (false, AssertionOperator::Equals) => {
                        format!("field `{path}`: expected {}, got {actual}", self.expected)
                    }
                    (false, AssertionOperator::NotNull) => {
                        format!("field `{path}` should not be null, got {actual}")
                    }
                };
                (passed, message)
            }
        };

        AssertionResult { passed, message }
    }
}

/// Ordered set of assertions for one response.
///
/// Status assertions are checked first and stop evaluation, then not-null
/// identifier assertions, then field equality. All field mismatches are
/// reported together.
#[derive(Debug, Clone, Default)]
pub struct Expectations {
    assertions: Vec<Assertion>,
}

impl Expectations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, code: u16) -> Self {
        self.assertions.push(Assertion::status(code));
        self
    }

    pub fn field(mut self, path: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.assertions.push(Assertion::field(path, expected));
        self
    }

    pub fn not_null(mut self, path: impl Into<String>) -> Self {
        self.assertions.push(Assertion::not_null(path));
        self
    }

    /// Expect every leaf of `record` (as serialized) under `prefix`.
    pub fn fields_of<T: Serialize>(mut self, prefix: &str, record: &T) -> Result<Self, Failure> {
        let value = serde_json::to_value(record)
            .map_err(|e| Failure::setup(format!("Failed to serialize expected record: {e}")))?;
        let mut leaves = Vec::new();
        flatten_leaves(prefix, &value, &mut leaves);
        self.assertions.extend(
            leaves
                .into_iter()
                .map(|(path, expected)| Assertion::field(path, expected)),
        );
        Ok(self)
    }

    #[cfg(test)]
    pub fn assertions(&self) -> &[Assertion] {
        &self.assertions
    }

    /// Evaluate against `response`, returning the parsed JSON body (if any).
    pub fn check(&self, response: &ApiResponse) -> Result<Option<Value>, Failure> {
        let body = response.json();

        for kind in [FailureKind::Status, FailureKind::MissingIdentifier] {
            let failed = self
                .assertions
                .iter()
                .filter(|assertion| assertion.failure_kind() == kind)
                .map(|assertion| assertion.evaluate(response, body.as_ref()))
                .find(|result| !result.passed);
            if let Some(result) = failed {
                return Err(Failure::new(kind, result.message));
            }
        }

        let mismatches: Vec<String> = self
            .assertions
            .iter()
            .filter(|assertion| assertion.failure_kind() == FailureKind::FieldMismatch)
            .map(|assertion| assertion.evaluate(response, body.as_ref()))
            .filter(|result| !result.passed)
            .map(|result| result.message)
            .collect();

        if mismatches.is_empty() {
            Ok(body)
        } else {
            Err(Failure::new(FailureKind::FieldMismatch, mismatches.join("; ")))
        }
    }
}

/// Resolve a dotted path (`booking.bookingdates.checkin`, `items.0.id`).
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn flatten_leaves(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_leaves(&path, child, out);
            }
        }
        leaf => out.push((prefix.to_string(), leaf.clone())),
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_LEN {
        return format!("{trimmed:?}");
    }
    let head: String = trimmed.chars().take(BODY_EXCERPT_LEN).collect();
    format!("{head:?}...")
}
