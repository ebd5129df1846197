//! Step dispatch: maps an action identifier and resolved parameters onto a
//! capability call, and turns every failure into a [`StepOutcome`].

use std::sync::Arc;

use devdeck_api::github::{CommitFile, CreateBranch, CreateRepository, SourceControl};
use devdeck_api::ServiceError;
use devdeck_api::records::RecordStore;
use devdeck_api::vercel::{AppendEnvVar, CreateDeployment, Deployment};
use devdeck_types::{ActionStatus, NewAction, ServiceId, StepOutcome};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::mobile::BuildService;
use crate::{Action, EngineError};

/// Per-invocation bindings: caller-supplied variables and the optional project
/// association used for persistence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunContext {
    pub variables: Map<String, Value>,
    pub project_id: Option<String>,
}

impl RunContext {
    pub fn new(variables: Map<String, Value>, project_id: Option<String>) -> Self {
        Self { variables, project_id }
    }
}

/// Capability handles the executor dispatches to.
#[derive(Clone)]
pub struct Capabilities {
    pub source_control: Arc<dyn SourceControl>,
    pub deployment: Arc<dyn Deployment>,
    pub records: Arc<dyn RecordStore>,
    pub builds: Arc<BuildService>,
}

pub struct StepExecutor {
    capabilities: Capabilities,
}

impl StepExecutor {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Execute one step. Never fails: unknown actions, bad parameters and
    /// capability errors all come back as [`StepOutcome::Failure`].
    pub async fn execute(&self, action: &str, params: &Map<String, Value>, context: &RunContext) -> StepOutcome {
        let action = match action.parse::<Action>() {
            Ok(action) => action,
            Err(error) => {
                warn!(action, "step references an unknown action");
                return StepOutcome::failure(error.to_string(), None);
            }
        };
        debug!(%action, "dispatching step");
        match self.dispatch(action, params, context).await {
            Ok(payload) => StepOutcome::Success(payload),
            Err(error) => {
                debug!(%action, error = %error, "step failed");
                StepOutcome::failure(error.to_string(), error.upstream_status().or_else(|| request_status(&error)))
            }
        }
    }

    async fn dispatch(&self, action: Action, params: &Map<String, Value>, context: &RunContext) -> Result<Value, EngineError> {
        let capabilities = &self.capabilities;
        match action {
            Action::GitHubCreateRepo => {
                let request: CreateRepository = decode_params(params)?;
                Ok(capabilities.source_control.create_repository(&request).await?)
            }
            Action::GitHubCreateBranch => {
                let request: CreateBranch = decode_params(params)?;
                Ok(capabilities.source_control.create_branch(&request).await?)
            }
            Action::GitHubPushFiles => {
                let request: CommitFile = decode_params(params)?;
                Ok(capabilities.source_control.commit_file(&request).await?)
            }
            Action::VercelDeploy => {
                let request: CreateDeployment = decode_params(params)?;
                Ok(capabilities.deployment.create_deployment(&request).await?)
            }
            Action::VercelSyncEnv => {
                let request: AppendEnvVar = decode_params(params)?;
                Ok(capabilities.deployment.append_env_var(&request).await?)
            }
            Action::MobileBuild => {
                let project_id = context
                    .project_id
                    .clone()
                    .or_else(|| params.get("projectId").and_then(Value::as_str).map(str::to_string))
                    .ok_or_else(|| EngineError::InvalidRequest("projectId is required".into()))?;
                let platform = params.get("platform").and_then(Value::as_str).unwrap_or_default();
                let started = capabilities.builds.start_build(&project_id, platform).await?;
                Ok(json!(started))
            }
            Action::SupabaseLog => {
                let Some(project_id) = context.project_id.as_deref() else {
                    return Ok(json!({"success": true}));
                };
                let action_type = params.get("type").and_then(Value::as_str).unwrap_or(action.as_str());
                let record = capabilities
                    .records
                    .insert_action(&NewAction {
                        project_id: project_id.to_string(),
                        action_type: action_type.to_string(),
                        payload: params.get("payload").cloned(),
                        result: None,
                        status: ActionStatus::Success,
                    })
                    .await?;
                record_value(&record)
            }
        }
    }
}

fn decode_params<T: DeserializeOwned>(params: &Map<String, Value>) -> Result<T, EngineError> {
    serde_json::from_value(Value::Object(params.clone())).map_err(|error| EngineError::InvalidRequest(format!("invalid parameters: {error}")))
}

/// Re-encode a record-store row as a step payload. A failure here is a decode
/// problem on our side, not a caller error.
fn record_value<T: Serialize>(record: &T) -> Result<Value, EngineError> {
    serde_json::to_value(record).map_err(|error| EngineError::Service(ServiceError::decode(ServiceId::Supabase, error.to_string())))
}

fn request_status(error: &EngineError) -> Option<u16> {
    match error {
        EngineError::InvalidPlatform(_) | EngineError::InvalidRequest(_) => Some(400),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoToolchain, FakeDeployment, FakeSourceControl, MemoryRecords};
    use devdeck_types::BuildStatus;

    struct Harness {
        source_control: Arc<FakeSourceControl>,
        deployment: Arc<FakeDeployment>,
        records: Arc<MemoryRecords>,
        executor: StepExecutor,
    }

    fn harness(source_control: FakeSourceControl) -> Harness {
        let source_control = Arc::new(source_control);
        let deployment = Arc::new(FakeDeployment::default());
        let records = Arc::new(MemoryRecords::default());
        let builds = Arc::new(BuildService::new(records.clone(), Arc::new(EchoToolchain)));
        let executor = StepExecutor::new(Capabilities {
            source_control: source_control.clone(),
            deployment: deployment.clone(),
            records: records.clone(),
            builds,
        });
        Harness {
            source_control,
            deployment,
            records,
            executor,
        }
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn unencodable_record_is_not_a_caller_error() {
        let mut row = std::collections::HashMap::new();
        row.insert((1u8, 2u8), "build");
        let error = record_value(&row).unwrap_err();
        assert!(matches!(error, EngineError::Service(ServiceError::Decode { .. })), "{error:?}");
        assert_eq!(request_status(&error), None);
        assert_eq!(error.upstream_status(), None);
    }

    #[tokio::test]
    async fn unknown_action_is_a_reported_failure() {
        let harness = harness(FakeSourceControl::default());
        let outcome = harness.executor.execute("ftp_upload", &Map::new(), &RunContext::default()).await;
        assert_eq!(outcome, StepOutcome::failure("Unknown action: ftp_upload", None));
    }

    #[tokio::test]
    async fn create_repo_forwards_params_to_source_control() {
        let harness = harness(FakeSourceControl::default());
        let outcome = harness
            .executor
            .execute("github_create_repo", &params(json!({"name": "demo", "description": "Demo App"})), &RunContext::default())
            .await;
        assert_eq!(outcome.payload().and_then(|p| p["html_url"].as_str()), Some("https://github.com/devdeck/demo"));
        let calls = harness.source_control.calls();
        assert_eq!(calls[0].0, "create_repository");
        assert_eq!(calls[0].1["auto_init"], true);
    }

    #[tokio::test]
    async fn capability_errors_keep_upstream_status() {
        let harness = harness(FakeSourceControl::rejecting_create());
        let outcome = harness
            .executor
            .execute("github_create_repo", &params(json!({"name": "taken"})), &RunContext::default())
            .await;
        assert_eq!(outcome, StepOutcome::failure("name already exists on this account", Some(422)));
    }

    #[tokio::test]
    async fn missing_required_params_fail_the_step() {
        let harness = harness(FakeSourceControl::default());
        let outcome = harness.executor.execute("vercel_deploy", &Map::new(), &RunContext::default()).await;
        let message = outcome.error_message().unwrap_or_default();
        assert!(message.starts_with("invalid parameters:"), "{message}");
        assert!(harness.deployment.calls().is_empty());
    }

    #[tokio::test]
    async fn supabase_log_without_project_skips_the_store() {
        let harness = harness(FakeSourceControl::default());
        let outcome = harness
            .executor
            .execute("supabase_log", &params(json!({"type": "note", "payload": {"a": 1}})), &RunContext::default())
            .await;
        assert_eq!(outcome, StepOutcome::Success(json!({"success": true})));
        assert!(harness.records.actions().is_empty());
    }

    #[tokio::test]
    async fn supabase_log_with_project_inserts_success_row() {
        let harness = harness(FakeSourceControl::default());
        let context = RunContext::new(Map::new(), Some("p1".into()));
        let outcome = harness
            .executor
            .execute("supabase_log", &params(json!({"type": "note", "payload": {"a": 1}})), &context)
            .await;
        assert!(outcome.is_success());
        let actions = harness.records.actions();
        assert_eq!(actions[0].action_type, "note");
        assert_eq!(actions[0].payload, Some(json!({"a": 1})));
        assert_eq!(actions[0].status, ActionStatus::Success);
    }

    #[tokio::test]
    async fn mobile_build_prefers_run_project_id() {
        let harness = harness(FakeSourceControl::default());
        let context = RunContext::new(Map::new(), Some("from-run".into()));
        let outcome = harness
            .executor
            .execute("mobile_build", &params(json!({"projectId": "from-params", "platform": "ios"})), &context)
            .await;
        assert_eq!(outcome.payload().map(|p| p["message"].clone()), Some(json!("ios build started")));
        let builds = harness.records.builds();
        assert_eq!(builds[0].project_id, "from-run");
        assert_eq!(builds[0].status, BuildStatus::Building);
    }

    #[tokio::test]
    async fn mobile_build_rejects_unknown_platform_with_400() {
        let harness = harness(FakeSourceControl::default());
        let outcome = harness
            .executor
            .execute("mobile_build", &params(json!({"projectId": "demo", "platform": "windows"})), &RunContext::default())
            .await;
        assert_eq!(outcome, StepOutcome::failure("Platform must be 'android' or 'ios'", Some(400)));
        assert!(harness.records.builds().is_empty());
    }
}
