#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use devdeck_api::ServiceError;
use devdeck_api::github::{CommitFile, CreateBranch, CreateRepository, SourceControl};
use devdeck_api::planning::Planner;
use devdeck_api::records::RecordStore;
use devdeck_api::vercel::{AppendEnvVar, CreateDeployment, Deployment};
use devdeck_engine::{BuildStage, BuildToolchain, TaskCatalog};
use devdeck_server::{AppState, DevdeckServer, RunningServer, Services};
use devdeck_types::{
    ActionRecord, BuildPatch, BuildRecord, ChatMessage, FunctionDefinition, NewAction, NewBuild, NewProject, ProjectPatch, ProjectRecord,
    ServiceId,
};
use serde_json::{Value, json};

pub struct StubSourceControl;

#[async_trait]
impl SourceControl for StubSourceControl {
    async fn list_repositories(&self) -> Result<Value, ServiceError> {
        Ok(json!([{"name": "demo", "html_url": "https://github.com/devdeck/demo"}]))
    }

    async fn create_repository(&self, request: &CreateRepository) -> Result<Value, ServiceError> {
        if request.name == "taken" {
            return Err(ServiceError::external(ServiceId::GitHub, 422, "name already exists on this account"));
        }
        Ok(json!({"name": request.name, "html_url": format!("https://github.com/devdeck/{}", request.name)}))
    }

    async fn create_branch(&self, request: &CreateBranch) -> Result<Value, ServiceError> {
        Ok(json!({"ref": format!("refs/heads/{}", request.branch)}))
    }

    async fn commit_file(&self, request: &CommitFile) -> Result<Value, ServiceError> {
        Ok(json!({"content": {"path": request.path}}))
    }
}

pub struct StubDeployment;

#[async_trait]
impl Deployment for StubDeployment {
    async fn create_deployment(&self, request: &CreateDeployment) -> Result<Value, ServiceError> {
        Ok(json!({"url": format!("{}.vercel.app", request.project_name)}))
    }

    async fn append_env_var(&self, request: &AppendEnvVar) -> Result<Value, ServiceError> {
        Ok(json!({"key": request.key, "target": request.target}))
    }

    async fn list_projects(&self) -> Result<Value, ServiceError> {
        Ok(json!([]))
    }
}

pub struct StubPlanner {
    pub reply: ChatMessage,
}

#[async_trait]
impl Planner for StubPlanner {
    async fn complete(&self, _messages: &[ChatMessage], _functions: &[FunctionDefinition]) -> Result<ChatMessage, ServiceError> {
        Ok(self.reply.clone())
    }
}

#[derive(Default)]
pub struct StubRecords {
    pub actions: Mutex<Vec<NewAction>>,
    pub builds: Mutex<Vec<BuildRecord>>,
}

impl StubRecords {
    pub fn action_count(&self) -> usize {
        self.actions.lock().expect("lock").len()
    }

    pub fn build_count(&self) -> usize {
        self.builds.lock().expect("lock").len()
    }
}

fn not_found(what: &str) -> ServiceError {
    ServiceError::external(ServiceId::Supabase, 406, format!("{what} not found"))
}

#[async_trait]
impl RecordStore for StubRecords {
    async fn list_projects(&self, user_id: &str) -> Result<Vec<ProjectRecord>, ServiceError> {
        Ok(vec![ProjectRecord {
            id: "p1".into(),
            user_id: user_id.into(),
            name: "demo".into(),
            repo_url: None,
            owner: None,
            status: None,
            created_at: None,
        }])
    }

    async fn create_project(&self, project: &NewProject) -> Result<ProjectRecord, ServiceError> {
        Ok(ProjectRecord {
            id: "p2".into(),
            user_id: project.user_id.clone(),
            name: project.name.clone(),
            repo_url: project.repo_url.clone(),
            owner: project.owner.clone(),
            status: project.status.clone(),
            created_at: None,
        })
    }

    async fn update_project(&self, id: &str, patch: &ProjectPatch) -> Result<ProjectRecord, ServiceError> {
        Ok(ProjectRecord {
            id: id.into(),
            user_id: "u1".into(),
            name: patch.name.clone().unwrap_or_else(|| "demo".into()),
            repo_url: patch.repo_url.clone(),
            owner: patch.owner.clone(),
            status: patch.status.clone(),
            created_at: None,
        })
    }

    async fn insert_action(&self, action: &NewAction) -> Result<ActionRecord, ServiceError> {
        self.actions.lock().expect("lock").push(action.clone());
        Ok(ActionRecord {
            id: "a1".into(),
            project_id: action.project_id.clone(),
            action_type: action.action_type.clone(),
            payload: action.payload.clone().unwrap_or_default(),
            result: action.result.clone().unwrap_or_default(),
            status: Some(action.status),
            created_at: None,
        })
    }

    async fn create_build(&self, build: &NewBuild) -> Result<BuildRecord, ServiceError> {
        let mut builds = self.builds.lock().expect("lock");
        let record = BuildRecord {
            id: format!("b{}", builds.len() + 1),
            project_id: build.project_id.clone(),
            platform: build.platform,
            status: build.status,
            output_url: None,
            logs: None,
            created_at: None,
        };
        builds.push(record.clone());
        Ok(record)
    }

    async fn update_build(&self, id: &str, patch: &BuildPatch) -> Result<BuildRecord, ServiceError> {
        let mut builds = self.builds.lock().expect("lock");
        let build = builds.iter_mut().find(|build| build.id == id).ok_or_else(|| not_found("build"))?;
        if let Some(status) = patch.status {
            build.status = status;
        }
        build.output_url = patch.output_url.clone().or(build.output_url.take());
        build.logs = patch.logs.clone().or(build.logs.take());
        Ok(build.clone())
    }

    async fn get_build(&self, id: &str) -> Result<BuildRecord, ServiceError> {
        let builds = self.builds.lock().expect("lock");
        builds.iter().find(|build| build.id == id).cloned().ok_or_else(|| not_found("build"))
    }
}

pub struct InstantToolchain;

#[async_trait]
impl BuildToolchain for InstantToolchain {
    async fn run(&self, stage: &BuildStage) -> Result<String> {
        Ok(format!("ran {}", stage.command_line()))
    }
}

pub const TASKS: &str = r#"
tasks:
  - name: create-full-app
    description: Create repository and deploy
    steps:
      - action: github_create_repo
        params:
          name: "{{project_name}}"
          description: "{{project_description}}"
      - action: vercel_deploy
        params:
          projectName: "{{project_name}}"
output:
  log_to_supabase: true
"#;

pub struct TestServer {
    pub base_url: String,
    pub records: Arc<StubRecords>,
    pub client: reqwest::Client,
    running: RunningServer,
}

impl TestServer {
    pub async fn start(planner_reply: ChatMessage) -> Self {
        let records = Arc::new(StubRecords::default());
        let services = Services {
            source_control: Arc::new(StubSourceControl),
            deployment: Arc::new(StubDeployment),
            planner: Arc::new(StubPlanner { reply: planner_reply }),
            records: records.clone(),
            toolchain: Arc::new(InstantToolchain),
        };
        let catalog = Arc::new(TaskCatalog::parse(TASKS).expect("catalog"));
        let state = AppState::new(services, catalog);
        let running = DevdeckServer::new("127.0.0.1:0".parse().expect("addr"), state)
            .start()
            .await
            .expect("start server");
        Self {
            base_url: format!("http://{}", running.bound_address()),
            records,
            client: reqwest::Client::new(),
            running,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn stop(self) {
        self.running.stop().await.expect("stop server");
    }
}
