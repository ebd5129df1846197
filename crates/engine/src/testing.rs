//! In-memory capability fakes shared by the engine's unit tests.

use std::sync::Mutex;

use anyhow::{Result, bail};
use async_trait::async_trait;
use devdeck_api::ServiceError;
use devdeck_api::github::{CommitFile, CreateBranch, CreateRepository, SourceControl};
use devdeck_api::planning::Planner;
use devdeck_api::records::RecordStore;
use devdeck_api::vercel::{AppendEnvVar, CreateDeployment, Deployment};
use devdeck_types::{
    ActionRecord, BuildPatch, BuildRecord, ChatMessage, FunctionDefinition, NewAction, NewBuild, NewProject, ProjectPatch, ProjectRecord,
    ServiceId,
};
use serde_json::{Value, json};
use tokio::sync::Notify;

use crate::mobile::{BuildStage, BuildToolchain};

#[derive(Default)]
struct RecordState {
    projects: Vec<ProjectRecord>,
    actions: Vec<NewAction>,
    builds: Vec<BuildRecord>,
    last_updated_build: Option<String>,
    next_id: u64,
}

impl RecordState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }
}

#[derive(Default)]
pub struct MemoryRecords {
    state: Mutex<RecordState>,
    build_updated: Notify,
    fail_writes: bool,
}

impl MemoryRecords {
    /// Store whose action and build writes fail with a 503.
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn actions(&self) -> Vec<NewAction> {
        self.state.lock().expect("lock").actions.clone()
    }

    pub fn builds(&self) -> Vec<BuildRecord> {
        self.state.lock().expect("lock").builds.clone()
    }

    /// Wait for the next `update_build` call and return the updated row.
    pub async fn wait_for_build_update(&self) -> BuildRecord {
        self.build_updated.notified().await;
        let state = self.state.lock().expect("lock");
        let id = state.last_updated_build.clone().expect("updated build id");
        state.builds.iter().find(|build| build.id == id).cloned().expect("updated build")
    }

    fn write_error() -> ServiceError {
        ServiceError::external(ServiceId::Supabase, 503, "record store unavailable")
    }
}

#[async_trait]
impl RecordStore for MemoryRecords {
    async fn list_projects(&self, user_id: &str) -> Result<Vec<ProjectRecord>, ServiceError> {
        let state = self.state.lock().expect("lock");
        Ok(state.projects.iter().rev().filter(|project| project.user_id == user_id).cloned().collect())
    }

    async fn create_project(&self, project: &NewProject) -> Result<ProjectRecord, ServiceError> {
        let mut state = self.state.lock().expect("lock");
        let record = ProjectRecord {
            id: state.next_id("p"),
            user_id: project.user_id.clone(),
            name: project.name.clone(),
            repo_url: project.repo_url.clone(),
            owner: project.owner.clone(),
            status: project.status.clone(),
            created_at: None,
        };
        state.projects.push(record.clone());
        Ok(record)
    }

    async fn update_project(&self, id: &str, patch: &ProjectPatch) -> Result<ProjectRecord, ServiceError> {
        let mut state = self.state.lock().expect("lock");
        let project = state
            .projects
            .iter_mut()
            .find(|project| project.id == id)
            .ok_or_else(|| ServiceError::external(ServiceId::Supabase, 406, "project not found"))?;
        if let Some(name) = &patch.name {
            project.name = name.clone();
        }
        if patch.status.is_some() {
            project.status = patch.status.clone();
        }
        Ok(project.clone())
    }

    async fn insert_action(&self, action: &NewAction) -> Result<ActionRecord, ServiceError> {
        if self.fail_writes {
            return Err(Self::write_error());
        }
        let mut state = self.state.lock().expect("lock");
        state.actions.push(action.clone());
        Ok(ActionRecord {
            id: state.next_id("a"),
            project_id: action.project_id.clone(),
            action_type: action.action_type.clone(),
            payload: action.payload.clone().unwrap_or_default(),
            result: action.result.clone().unwrap_or_default(),
            status: Some(action.status),
            created_at: None,
        })
    }

    async fn create_build(&self, build: &NewBuild) -> Result<BuildRecord, ServiceError> {
        let mut state = self.state.lock().expect("lock");
        let record = BuildRecord {
            id: state.next_id("b"),
            project_id: build.project_id.clone(),
            platform: build.platform,
            status: build.status,
            output_url: None,
            logs: None,
            created_at: None,
        };
        state.builds.push(record.clone());
        Ok(record)
    }

    async fn update_build(&self, id: &str, patch: &BuildPatch) -> Result<BuildRecord, ServiceError> {
        if self.fail_writes {
            self.build_updated.notify_one();
            return Err(Self::write_error());
        }
        let updated = {
            let mut state = self.state.lock().expect("lock");
            let build = state
                .builds
                .iter_mut()
                .find(|build| build.id == id)
                .ok_or_else(|| ServiceError::external(ServiceId::Supabase, 406, "build not found"))?;
            if let Some(status) = patch.status {
                build.status = status;
            }
            if patch.output_url.is_some() {
                build.output_url = patch.output_url.clone();
            }
            if patch.logs.is_some() {
                build.logs = patch.logs.clone();
            }
            let updated = build.clone();
            state.last_updated_build = Some(id.to_string());
            updated
        };
        self.build_updated.notify_one();
        Ok(updated)
    }

    async fn get_build(&self, id: &str) -> Result<BuildRecord, ServiceError> {
        let state = self.state.lock().expect("lock");
        state
            .builds
            .iter()
            .find(|build| build.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::external(ServiceId::Supabase, 406, "build not found"))
    }
}

/// Source control that answers from memory and records every call.
#[derive(Default)]
pub struct FakeSourceControl {
    calls: Mutex<Vec<(String, Value)>>,
    reject_create: bool,
}

impl FakeSourceControl {
    /// Fake whose repository creation fails with a 422.
    pub fn rejecting_create() -> Self {
        Self {
            reject_create: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().expect("lock").clone()
    }

    fn record(&self, operation: &str, payload: Value) {
        self.calls.lock().expect("lock").push((operation.to_string(), payload));
    }
}

#[async_trait]
impl SourceControl for FakeSourceControl {
    async fn list_repositories(&self) -> Result<Value, ServiceError> {
        self.record("list_repositories", Value::Null);
        Ok(json!([]))
    }

    async fn create_repository(&self, request: &CreateRepository) -> Result<Value, ServiceError> {
        self.record("create_repository", json!(request));
        if self.reject_create {
            return Err(ServiceError::external(ServiceId::GitHub, 422, "name already exists on this account"));
        }
        Ok(json!({"name": request.name, "html_url": format!("https://github.com/devdeck/{}", request.name)}))
    }

    async fn create_branch(&self, request: &CreateBranch) -> Result<Value, ServiceError> {
        self.record("create_branch", json!(request));
        Ok(json!({"ref": format!("refs/heads/{}", request.branch)}))
    }

    async fn commit_file(&self, request: &CommitFile) -> Result<Value, ServiceError> {
        self.record("commit_file", json!(request));
        Ok(json!({"content": {"path": request.path}}))
    }
}

/// Deployment service that answers from memory and records every call.
#[derive(Default)]
pub struct FakeDeployment {
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeDeployment {
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Deployment for FakeDeployment {
    async fn create_deployment(&self, request: &CreateDeployment) -> Result<Value, ServiceError> {
        self.calls.lock().expect("lock").push(("create_deployment".into(), json!(request)));
        Ok(json!({"name": request.project_name, "url": format!("{}.vercel.app", request.project_name)}))
    }

    async fn append_env_var(&self, request: &AppendEnvVar) -> Result<Value, ServiceError> {
        self.calls.lock().expect("lock").push(("append_env_var".into(), json!(request)));
        Ok(json!({"key": request.key, "type": "encrypted"}))
    }

    async fn list_projects(&self) -> Result<Value, ServiceError> {
        Ok(json!([]))
    }
}

/// Planner that returns a canned reply and counts invocations.
pub struct ScriptedPlanner {
    reply: ChatMessage,
    calls: Mutex<usize>,
}

impl ScriptedPlanner {
    pub fn replying(reply: ChatMessage) -> Self {
        Self {
            reply,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("lock")
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn complete(&self, _messages: &[ChatMessage], _functions: &[FunctionDefinition]) -> Result<ChatMessage, ServiceError> {
        *self.calls.lock().expect("lock") += 1;
        Ok(self.reply.clone())
    }
}

/// Toolchain that succeeds every stage with `ran <command>` as output.
pub struct EchoToolchain;

#[async_trait]
impl BuildToolchain for EchoToolchain {
    async fn run(&self, stage: &BuildStage) -> Result<String> {
        Ok(format!("ran {}", stage.command_line()))
    }
}

/// Toolchain that fails once it reaches the given command.
pub struct FailToolchain {
    command: &'static str,
}

impl FailToolchain {
    pub fn at(command: &'static str) -> Self {
        Self { command }
    }
}

#[async_trait]
impl BuildToolchain for FailToolchain {
    async fn run(&self, stage: &BuildStage) -> Result<String> {
        let command = stage.command_line();
        if command == self.command {
            bail!("Command failed: {command}");
        }
        Ok(format!("ran {command}"))
    }
}
