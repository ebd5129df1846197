//! Task configuration and run transcript types.
//!
//! A task configuration document is loaded once at process start. Its steps keep the
//! raw action identifier so that unknown actions can be reported per step when the
//! task runs instead of failing the whole document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level task configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskConfiguration {
    /// Task definitions in authoring order.
    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
    /// Operational output settings.
    #[serde(default)]
    pub output: OutputConfiguration,
}

/// Named, ordered list of steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDefinition {
    /// Unique task name used by callers.
    pub name: String,
    /// Optional descriptive copy for listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Steps executed strictly in declaration order.
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

/// Action identifier plus parameter template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepDefinition {
    /// Capability operation identifier, e.g. `github_create_repo`.
    pub action: String,
    /// Parameter template. String values of the form `{{name}}` are placeholders.
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Output settings. Only `log_to_supabase` changes behavior; the rest is cosmetic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfiguration {
    /// Persist each step outcome to the record store when the run has a project id.
    #[serde(default)]
    pub log_to_supabase: bool,
    /// Prefix for workflow log lines.
    #[serde(default = "default_console_prefix")]
    pub console_prefix: String,
    /// Status labels woven into workflow log lines.
    #[serde(default)]
    pub emoji_status: EmojiStatus,
}

impl Default for OutputConfiguration {
    fn default() -> Self {
        Self {
            log_to_supabase: false,
            console_prefix: default_console_prefix(),
            emoji_status: EmojiStatus::default(),
        }
    }
}

fn default_console_prefix() -> String {
    "[devdeck]".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmojiStatus {
    #[serde(default = "default_building")]
    pub building: String,
    #[serde(default = "default_success")]
    pub success: String,
    #[serde(default = "default_error")]
    pub error: String,
}

impl Default for EmojiStatus {
    fn default() -> Self {
        Self {
            building: default_building(),
            success: default_success(),
            error: default_error(),
        }
    }
}

fn default_building() -> String {
    "🔨".to_string()
}

fn default_success() -> String {
    "✅".to_string()
}

fn default_error() -> String {
    "❌".to_string()
}

/// Failure descriptor for one step.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StepFailure {
    /// Human-readable failure message.
    pub error: String,
    /// Status code reported by the external service, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Result of one executed step.
///
/// Serializes as the bare success payload, or as `{ "error": ..., "status": ... }`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum StepOutcome {
    Success(Value),
    Failure(StepFailure),
}

impl StepOutcome {
    pub fn failure(error: impl Into<String>, status: Option<u16>) -> Self {
        Self::Failure(StepFailure {
            error: error.into(),
            status,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Payload on success.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// Failure message, if the step failed.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.error.as_str()),
        }
    }

    /// JSON form of the outcome, as persisted and returned to callers.
    pub fn to_value(&self) -> Value {
        // Serializing a `Value` or a string/u16 struct cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// One transcript entry: the action that ran and its outcome.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepRecord {
    pub action: String,
    pub result: StepOutcome,
}

/// Full transcript of a completed run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunReport {
    /// True only when every step succeeded.
    pub success: bool,
    /// Name of the task that ran.
    pub task: String,
    /// Outcomes in step order.
    pub results: Vec<StepRecord>,
}

impl RunReport {
    pub fn new(task: impl Into<String>, results: Vec<StepRecord>) -> Self {
        let success = results.iter().all(|record| record.result.is_success());
        Self {
            success,
            task: task.into(),
            results,
        }
    }
}
