use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{Result, SuiteError};

use super::failure::{Failure, FailureKind};
use super::report::{ScenarioReport, StepOutcome, StepReport};

pub type StepFuture<'a> = Pin<Box<dyn Future<Output = std::result::Result<(), Failure>> + Send + 'a>>;

/// A step body: borrows the scenario context for the duration of the step.
pub type StepFn<C> = for<'a> fn(&'a mut C) -> StepFuture<'a>;

pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Blocker,
    Critical,
    Normal,
}

/// One node of a scenario graph.
pub struct StepDef<C> {
    pub id: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    /// Lower runs first among steps whose predecessors are all done.
    pub priority: u32,
    pub depends_on: &'static [&'static str],
    pub run: StepFn<C>,
}

pub struct Scenario<C> {
    name: &'static str,
    steps: Vec<StepDef<C>>,
    step_timeout: Duration,
}

impl<C: Send> Scenario<C> {
    pub fn new(name: &'static str, steps: Vec<StepDef<C>>) -> Self {
        Self {
            name,
            steps,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn steps(&self) -> &[StepDef<C>] {
        &self.steps
    }

    /// Topological order of the steps; among ready steps, lower priority
    /// first, then declaration order.
    pub fn execution_order(&self) -> Result<Vec<usize>> {
        let mut index_of = HashMap::new();
        for (index, step) in self.steps.iter().enumerate() {
            if index_of.insert(step.id, index).is_some() {
                return Err(SuiteError::Plan(format!(
                    "duplicate step `{}` in scenario `{}`",
                    step.id, self.name
                )));
            }
        }

        let mut pending = vec![0usize; self.steps.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.steps.len()];
        for (index, step) in self.steps.iter().enumerate() {
            for dep in step.depends_on {
                let &dep_index = index_of.get(dep).ok_or_else(|| {
                    SuiteError::Plan(format!(
                        "step `{}` depends on unknown step `{dep}`",
                        step.id
                    ))
                })?;
                pending[index] += 1;
                dependents[dep_index].push(index);
            }
        }

        let mut ready: BTreeSet<(u32, usize)> = self
            .steps
            .iter()
            .enumerate()
            .filter(|(index, _)| pending[*index] == 0)
            .map(|(index, step)| (step.priority, index))
            .collect();

        let mut order = Vec::with_capacity(self.steps.len());
        while let Some((_, index)) = ready.pop_first() {
            order.push(index);
            for &next in &dependents[index] {
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.insert((self.steps[next].priority, next));
                }
            }
        }

        if order.len() != self.steps.len() {
            let stuck: Vec<&str> = self
                .steps
                .iter()
                .enumerate()
                .filter(|(index, _)| pending[*index] > 0)
                .map(|(_, step)| step.id)
                .collect();
            return Err(SuiteError::Plan(format!(
                "dependency cycle in scenario `{}` involving {}",
                self.name,
                stuck.join(", ")
            )));
        }

        Ok(order)
    }

    /// Run every step against `ctx`. A step runs only when all of its
    /// predecessors passed; otherwise it is reported as skipped.
    pub async fn run(&self, ctx: &mut C) -> Result<ScenarioReport> {
        let order = self.execution_order()?;
        let started = Instant::now();
        let mut outcomes: HashMap<&str, StepOutcome> = HashMap::new();
        let mut reports = Vec::with_capacity(order.len());

        tracing::info!(scenario = self.name, steps = order.len(), "scenario started");

        for index in order {
            let step = &self.steps[index];
            let blocked_by: Vec<String> = step
                .depends_on
                .iter()
                .filter(|dep| !outcomes.get(**dep).is_some_and(StepOutcome::is_passed))
                .map(|dep| dep.to_string())
                .collect();

            let step_started = Instant::now();
            let outcome = if !blocked_by.is_empty() {
                tracing::warn!(
                    scenario = self.name,
                    step = step.id,
                    blocked_by = %blocked_by.join(","),
                    "step skipped"
                );
                StepOutcome::Skipped { blocked_by }
            } else {
                match tokio::time::timeout(self.step_timeout, (step.run)(ctx)).await {
                    Ok(Ok(())) => {
                        tracing::info!(scenario = self.name, step = step.id, "step passed");
                        StepOutcome::Passed
                    }
                    Ok(Err(failure)) => {
                        tracing::warn!(
                            scenario = self.name,
                            step = step.id,
                            kind = %failure.kind,
                            "step failed: {}",
                            failure.message
                        );
                        StepOutcome::Failed(failure)
                    }
                    Err(_) => {
                        let failure = Failure::new(
                            FailureKind::Timeout,
                            format!("step exceeded {} ms", self.step_timeout.as_millis()),
                        );
                        tracing::warn!(scenario = self.name, step = step.id, "step timed out");
                        StepOutcome::Failed(failure)
                    }
                }
            };

            outcomes.insert(step.id, outcome.clone());
            reports.push(StepReport {
                id: step.id.to_string(),
                description: step.description.to_string(),
                severity: step.severity,
                outcome,
                duration_ms: step_started.elapsed().as_millis() as u64,
            });
        }

        Ok(ScenarioReport {
            scenario: self.name.to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
            steps: reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Trace {
        ran: Vec<&'static str>,
    }

    fn ok_a(ctx: &mut Trace) -> StepFuture<'_> {
        Box::pin(async move {
            ctx.ran.push("a");
            Ok(())
        })
    }

    fn ok_b(ctx: &mut Trace) -> StepFuture<'_> {
        Box::pin(async move {
            ctx.ran.push("b");
            Ok(())
        })
    }

    fn ok_c(ctx: &mut Trace) -> StepFuture<'_> {
        Box::pin(async move {
            ctx.ran.push("c");
            Ok(())
        })
    }

    fn fail_b(ctx: &mut Trace) -> StepFuture<'_> {
        Box::pin(async move {
            ctx.ran.push("b");
            Err(Failure::new(FailureKind::Status, "expected status 200, got 500"))
        })
    }

    fn slow(ctx: &mut Trace) -> StepFuture<'_> {
        Box::pin(async move {
            ctx.ran.push("slow");
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
    }

    fn step(
        id: &'static str,
        priority: u32,
        depends_on: &'static [&'static str],
        run: StepFn<Trace>,
    ) -> StepDef<Trace> {
        StepDef {
            id,
            description: id,
            severity: Severity::Normal,
            priority,
            depends_on,
            run,
        }
    }

    #[test]
    fn order_follows_dependencies_then_priority() {
        let scenario = Scenario::new(
            "order",
            vec![
                step("c", 1, &["b"], ok_c),
                step("b", 3, &[], ok_b),
                step("a", 2, &[], ok_a),
            ],
        );
        let order: Vec<_> = scenario
            .execution_order()
            .unwrap()
            .into_iter()
            .map(|i| scenario.steps()[i].id)
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn rejects_unknown_dependency() {
        let scenario = Scenario::new("bad", vec![step("a", 1, &["ghost"], ok_a)]);
        let err = scenario.execution_order().unwrap_err();
        assert!(err.to_string().contains("unknown step `ghost`"));
    }

    #[test]
    fn rejects_cycles() {
        let scenario = Scenario::new(
            "cycle",
            vec![step("a", 1, &["b"], ok_a), step("b", 2, &["a"], ok_b)],
        );
        assert!(matches!(scenario.execution_order(), Err(SuiteError::Plan(_))));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let scenario = Scenario::new("dup", vec![step("a", 1, &[], ok_a), step("a", 2, &[], ok_b)]);
        assert!(matches!(scenario.execution_order(), Err(SuiteError::Plan(_))));
    }

    #[tokio::test]
    async fn failure_skips_transitive_dependents() {
        let scenario = Scenario::new(
            "chain",
            vec![
                step("a", 1, &[], ok_a),
                step("b", 2, &["a"], fail_b),
                step("c", 3, &["b"], ok_c),
                step("d", 4, &["c", "a"], ok_c),
            ],
        );
        let mut trace = Trace::default();
        let report = scenario.run(&mut trace).await.unwrap();

        assert_eq!(trace.ran, vec!["a", "b"]);
        assert!(report.steps[0].outcome.is_passed());
        assert!(matches!(report.steps[1].outcome, StepOutcome::Failed(_)));
        assert_eq!(
            report.steps[2].outcome,
            StepOutcome::Skipped {
                blocked_by: vec!["b".into()]
            }
        );
        assert_eq!(
            report.steps[3].outcome,
            StepOutcome::Skipped {
                blocked_by: vec!["c".into()]
            }
        );
    }

    #[tokio::test]
    async fn independent_steps_all_run() {
        let scenario = Scenario::new(
            "independent",
            vec![step("a", 1, &[], ok_a), step("b", 2, &[], fail_b), step("c", 3, &[], ok_c)],
        );
        let mut trace = Trace::default();
        let report = scenario.run(&mut trace).await.unwrap();

        assert_eq!(trace.ran, vec!["a", "b", "c"]);
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_step_times_out() {
        let scenario = Scenario::new(
            "slow",
            vec![step("slow", 1, &[], slow), step("after", 2, &["slow"], ok_a)],
        )
        .with_step_timeout(Duration::from_millis(100));
        let mut trace = Trace::default();
        let report = scenario.run(&mut trace).await.unwrap();

        match &report.steps[0].outcome {
            StepOutcome::Failed(failure) => assert_eq!(failure.kind, FailureKind::Timeout),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(report.skipped(), 1);
    }
}
