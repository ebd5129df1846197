//! Workflow execution.
//!
//! A run moves through [`RunPhase::Idle`] → [`RunPhase::Running`] → one of
//! [`RunPhase::Completed`] or [`RunPhase::Aborted`]. Only an unknown task name
//! aborts; failing steps are recorded and the run continues with the next step.
//! Step outputs are not chained into later steps: every step is interpolated
//! against the caller-supplied variables only.

use std::sync::Arc;

use devdeck_api::records::RecordStore;
use devdeck_types::{ActionStatus, NewAction, RunReport, StepOutcome, StepRecord, TaskDefinition};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::catalog::TaskCatalog;
use crate::executor::{RunContext, StepExecutor};
use crate::interpolate::interpolate;
use crate::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Aborted,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// Transcript and phase of a single run.
#[derive(Debug)]
struct WorkflowRun {
    task: String,
    phase: RunPhase,
    results: Vec<StepRecord>,
}

impl WorkflowRun {
    fn new(task: &str) -> Self {
        Self {
            task: task.to_string(),
            phase: RunPhase::Idle,
            results: Vec::new(),
        }
    }

    fn transition(&mut self, next: RunPhase) {
        debug!(task = %self.task, from = ?self.phase, to = ?next, "workflow phase change");
        self.phase = next;
    }

    fn record(&mut self, action: &str, outcome: StepOutcome) {
        self.results.push(StepRecord {
            action: action.to_string(),
            result: outcome,
        });
    }

    fn finish(mut self) -> RunReport {
        self.transition(RunPhase::Completed);
        RunReport::new(self.task, self.results)
    }
}

pub struct WorkflowEngine {
    catalog: Arc<TaskCatalog>,
    executor: Arc<StepExecutor>,
    records: Arc<dyn RecordStore>,
}

impl WorkflowEngine {
    pub fn new(catalog: Arc<TaskCatalog>, executor: Arc<StepExecutor>) -> Self {
        let records = Arc::clone(&executor.capabilities().records);
        Self { catalog, executor, records }
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    /// Run `task_name` to completion.
    ///
    /// Returns [`EngineError::UnknownTask`] before any step runs or any record
    /// is written when the task does not exist.
    pub async fn run(&self, task_name: &str, context: RunContext) -> Result<RunReport, EngineError> {
        let output = self.catalog.output();
        let mut run = WorkflowRun::new(task_name);
        let Some(task) = self.catalog.get(task_name) else {
            run.transition(RunPhase::Aborted);
            error!("{} Task failed: Task '{task_name}' not found", output.emoji_status.error);
            return Err(EngineError::UnknownTask(task_name.to_string()));
        };

        run.transition(RunPhase::Running);
        info!(task = %task_name, steps = task.steps.len(), "{} Starting task: {task_name}", output.console_prefix);
        self.run_steps(task, &context, &mut run).await;

        let report = run.finish();
        if report.success {
            info!(task = %task_name, "{} Task completed: {task_name}", output.emoji_status.success);
        } else {
            let failed = report.results.iter().filter(|record| !record.result.is_success()).count();
            warn!(task = %task_name, failed, "{} Task completed with failed steps: {task_name}", output.emoji_status.error);
        }
        Ok(report)
    }

    async fn run_steps(&self, task: &TaskDefinition, context: &RunContext, run: &mut WorkflowRun) {
        let output = self.catalog.output();
        for step in &task.steps {
            info!(action = %step.action, "{} Executing: {}", output.emoji_status.building, step.action);
            let params = interpolate(&step.params, &context.variables);
            let outcome = self.executor.execute(&step.action, &params, context).await;

            if output.log_to_supabase
                && let Some(project_id) = context.project_id.as_deref()
            {
                self.persist(project_id, &step.action, &params, &outcome).await;
            }
            run.record(&step.action, outcome);
        }
    }

    /// Best-effort write of one step outcome; failures are logged only.
    async fn persist(&self, project_id: &str, action: &str, params: &serde_json::Map<String, Value>, outcome: &StepOutcome) {
        let row = NewAction {
            project_id: project_id.to_string(),
            action_type: action.to_string(),
            payload: Some(Value::Object(params.clone())),
            result: Some(outcome.to_value()),
            status: if outcome.is_success() { ActionStatus::Success } else { ActionStatus::Failed },
        };
        if let Err(write_error) = self.records.insert_action(&row).await {
            let error = EngineError::Persistence(write_error);
            warn!(project_id, action, error = %error, "could not persist step outcome");
        }
    }
}
