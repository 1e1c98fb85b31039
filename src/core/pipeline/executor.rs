use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::builder::Pipeline;
use super::context::{ExecutionContext, PolicyRecord, RunMode, StepStatus};
use super::step::{Step, StepOutcome};
use crate::error::{Error, Hint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRunStatus {
    Success,
    Skipped,
    NotApplicable,
    Failed,
    /// Never reached because an earlier step failed.
    NotRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub position: usize,
    pub name: String,
    pub status: StepRunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Running,
    Aborted,
    Completed,
}

impl PipelineState {
    /// Next state after an applicable step finishes with `outcome`.
    /// Terminal states never change.
    pub fn after(self, outcome: StepStatus) -> Self {
        match (self, outcome) {
            (PipelineState::Running, StepStatus::Failure) => PipelineState::Aborted,
            (state, _) => state,
        }
    }

    /// State once the step list is exhausted.
    pub fn finish(self) -> Self {
        match self {
            PipelineState::Running => PipelineState::Completed,
            state => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineState::Running)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunSummary {
    pub total_steps: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub not_applicable: usize,
    pub failed: usize,
    pub not_run: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunResult {
    pub mode: RunMode,
    pub state: PipelineState,
    pub success: bool,
    pub steps: Vec<StepReport>,
    pub policies: Vec<PolicyRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: PipelineRunSummary,
}

/// Final context plus the report of one execution.
#[derive(Debug)]
pub struct PipelineRun {
    pub context: ExecutionContext,
    pub result: PipelineRunResult,
}

/// Run every step in order against `context`, stopping at the first failure.
///
/// Non-applicable steps are reported and do not touch `last_outcome`. An `Err`
/// or a panic inside a step is converted to a failure at the step boundary.
pub fn execute(pipeline: Pipeline, mut context: ExecutionContext) -> PipelineRun {
    let mode = context.run_mode();
    let started_at = Utc::now();
    let mut state = PipelineState::Running;
    let mut reports = Vec::with_capacity(pipeline.len());

    for (index, step) in pipeline.steps().iter().enumerate() {
        let position = index + 1;

        if state.is_terminal() {
            reports.push(report(position, step.name(), StepRunStatus::NotRun));
            continue;
        }

        if !step.applies_to(mode) {
            log_status!(
                "pipeline",
                "[{}] {} not applicable ({})",
                position,
                step.name(),
                mode
            );
            reports.push(report(position, step.name(), StepRunStatus::NotApplicable));
            continue;
        }

        log_status!(
            "pipeline",
            "[{}/{}] {}",
            position,
            pipeline.len(),
            step.name()
        );
        let started = Instant::now();
        let mut entry = execute_step(step.as_ref(), &mut context, position);
        entry.duration_ms = started.elapsed().as_millis() as u64;

        let status = if entry.status == StepRunStatus::Failed {
            log_status!(
                "pipeline",
                "{} failed: {}",
                step.name(),
                entry
                    .error
                    .as_deref()
                    .or(entry.reason.as_deref())
                    .unwrap_or("unknown error")
            );
            StepStatus::Failure
        } else {
            StepStatus::Success
        };
        context.set_last_outcome(status);
        state = state.after(status);
        reports.push(entry);
    }

    let state = state.finish();
    let summary = build_summary(&reports, state);
    let result = PipelineRunResult {
        mode,
        state,
        success: state == PipelineState::Completed,
        steps: reports,
        policies: context.policy_records().to_vec(),
        started_at,
        finished_at: Utc::now(),
        summary,
    };

    PipelineRun { context, result }
}

fn execute_step(step: &dyn Step, context: &mut ExecutionContext, position: usize) -> StepReport {
    let mut entry = report(position, step.name(), StepRunStatus::Success);

    match panic::catch_unwind(AssertUnwindSafe(|| step.run(context))) {
        Ok(Ok(StepOutcome::Success)) => {}
        Ok(Ok(StepOutcome::Skipped { reason })) => {
            entry.status = StepRunStatus::Skipped;
            entry.reason = Some(reason);
        }
        Ok(Ok(StepOutcome::Failed { reason })) => {
            entry.status = StepRunStatus::Failed;
            entry.reason = Some(reason);
        }
        Ok(Err(err)) => fail_with(&mut entry, &err),
        Err(payload) => {
            let err = Error::internal_unexpected(format!(
                "step panicked: {}",
                panic_message(payload.as_ref())
            ));
            fail_with(&mut entry, &err);
        }
    }

    entry
}

fn fail_with(entry: &mut StepReport, err: &Error) {
    entry.status = StepRunStatus::Failed;
    entry.error = Some(err.summary());
    entry.error_code = Some(err.code.as_str().to_string());
    entry.hints = err.hints.clone();
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn report(position: usize, name: &str, status: StepRunStatus) -> StepReport {
    StepReport {
        position,
        name: name.to_string(),
        status,
        reason: None,
        error: None,
        error_code: None,
        hints: Vec::new(),
        duration_ms: 0,
    }
}

fn build_summary(reports: &[StepReport], state: PipelineState) -> PipelineRunSummary {
    let count = |status: StepRunStatus| reports.iter().filter(|r| r.status == status).count();

    let failed_step = reports
        .iter()
        .find(|r| r.status == StepRunStatus::Failed)
        .map(|r| r.name.clone());

    let next_actions = match state {
        PipelineState::Aborted => vec![
            "Environment is partially provisioned: policies and tokens created before the failure remain in the registry".to_string(),
            "Fix the failing step and re-run against a fresh discovery server".to_string(),
        ],
        _ => Vec::new(),
    };

    PipelineRunSummary {
        total_steps: reports.len(),
        succeeded: count(StepRunStatus::Success),
        skipped: count(StepRunStatus::Skipped),
        not_applicable: count(StepRunStatus::NotApplicable),
        failed: count(StepRunStatus::Failed),
        not_run: count(StepRunStatus::NotRun),
        failed_step,
        next_actions,
    }
}
