use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::failure::{Failure, FailureKind};
use super::runner::Severity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepOutcome {
    Passed,
    Failed(Failure),
    Skipped { blocked_by: Vec<String> },
}

impl StepOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, StepOutcome::Passed)
    }

    fn label(&self) -> &'static str {
        match self {
            StepOutcome::Passed => "PASS",
            StepOutcome::Failed(_) => "FAIL",
            StepOutcome::Skipped { .. } => "SKIP",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub id: String,
    pub description: String,
    pub severity: Severity,
    pub outcome: StepOutcome,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub duration_ms: u64,
    pub steps: Vec<StepReport>,
}

impl ScenarioReport {
    pub fn passed(&self) -> usize {
        self.count(|outcome| matches!(outcome, StepOutcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, StepOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, StepOutcome::Skipped { .. }))
    }

    #[cfg(test)]
    pub fn step(&self, id: &str) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.id == id)
    }

    fn count(&self, predicate: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|step| predicate(&step.outcome)).count()
    }
}

/// Summary report for one invocation of the runner.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.scenarios.iter().map(|s| s.steps.len()).sum()
    }

    pub fn passed(&self) -> usize {
        self.scenarios.iter().map(ScenarioReport::passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.scenarios.iter().map(ScenarioReport::failed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.scenarios.iter().map(ScenarioReport::skipped).sum()
    }

    /// A run is green only when nothing failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures_by_kind(&self) -> BTreeMap<FailureKind, usize> {
        let mut counts = BTreeMap::new();
        for step in self.scenarios.iter().flat_map(|s| &s.steps) {
            if let StepOutcome::Failed(failure) = &step.outcome {
                *counts.entry(failure.kind).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();

        for scenario in &self.scenarios {
            let _ = writeln!(out, "{} ({} ms)", scenario.scenario, scenario.duration_ms);
            for step in &scenario.steps {
                let _ = write!(
                    out,
                    "  {} {:<32} {:>6} ms",
                    step.outcome.label(),
                    step.id,
                    step.duration_ms
                );
                match &step.outcome {
                    StepOutcome::Passed => {}
                    StepOutcome::Failed(failure) => {
                        let _ = write!(out, "  {failure}");
                    }
                    StepOutcome::Skipped { blocked_by } => {
                        let _ = write!(out, "  blocked by {}", blocked_by.join(", "));
                    }
                }
                out.push('\n');
            }
        }

        let _ = writeln!(
            out,
            "\n{} steps: {} passed, {} failed, {} skipped ({} ms)",
            self.total(),
            self.passed(),
            self.failed(),
            self.skipped(),
            self.duration_ms
        );

        let failures = self.failures_by_kind();
        if !failures.is_empty() {
            let parts: Vec<String> = failures
                .iter()
                .map(|(kind, count)| format!("{kind}={count}"))
                .collect();
            let _ = writeln!(out, "failures by kind: {}", parts.join(", "));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, outcome: StepOutcome) -> StepReport {
        StepReport {
            id: id.into(),
            description: id.into(),
            severity: Severity::Normal,
            outcome,
            duration_ms: 5,
        }
    }

    fn report() -> RunReport {
        RunReport {
            started_at: Utc::now(),
            duration_ms: 40,
            scenarios: vec![
                ScenarioReport {
                    scenario: "booking_lifecycle".into(),
                    duration_ms: 30,
                    steps: vec![
                        step("authenticate", StepOutcome::Passed),
                        step(
                            "create_booking",
                            StepOutcome::Failed(Failure::new(FailureKind::Status, "expected status 200, got 500")),
                        ),
                        step(
                            "read_booking",
                            StepOutcome::Skipped {
                                blocked_by: vec!["create_booking".into()],
                            },
                        ),
                    ],
                },
                ScenarioReport {
                    scenario: "schema_validation".into(),
                    duration_ms: 10,
                    steps: vec![step(
                        "create_token_schema",
                        StepOutcome::Failed(Failure::new(FailureKind::SchemaMismatch, "\"token\" is a required property")),
                    )],
                },
            ],
        }
    }

    #[test]
    fn totals_cover_all_scenarios() {
        let report = report();
        assert_eq!(report.total(), 4);
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.skipped(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn schema_and_status_failures_are_counted_separately() {
        let counts = report().failures_by_kind();
        assert_eq!(counts.get(&FailureKind::Status), Some(&1));
        assert_eq!(counts.get(&FailureKind::SchemaMismatch), Some(&1));
        assert_eq!(counts.get(&FailureKind::FieldMismatch), None);
    }

    #[test]
    fn text_report_lists_every_step() {
        let text = report().render_text();
        assert!(text.contains("PASS authenticate"));
        assert!(text.contains("FAIL create_booking"));
        assert!(text.contains("SKIP read_booking"));
        assert!(text.contains("blocked by create_booking"));
        assert!(text.contains("failures by kind: status=1, schema_mismatch=1"));
    }

    #[test]
    fn json_report_tags_outcomes() {
        let value: serde_json::Value = serde_json::from_str(&report().to_json().unwrap()).unwrap();
        let steps = &value["scenarios"][0]["steps"];

        assert_eq!(steps[0]["outcome"]["status"], "passed");
        assert_eq!(steps[1]["outcome"]["status"], "failed");
        assert_eq!(steps[1]["outcome"]["kind"], "status");
        assert_eq!(steps[2]["outcome"]["blocked_by"][0], "create_booking");
    }
}
