//! HTTP handlers. Each capability endpoint forwards its body to one client
//! operation and returns the upstream payload unchanged.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use devdeck_api::github::{CommitFile, CreateBranch, CreateRepository};
use devdeck_api::vercel::{AppendEnvVar, CreateDeployment};
use devdeck_engine::{BuildStarted, RunContext};
use devdeck_types::{BuildRecord, ChatMessage, NewProject, ProjectPatch, ProjectRecord, RunReport, TaskDefinition};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::{ApiError, AppState};

type ApiResult<T> = Result<Json<T>, ApiError>;
type Body<T> = Result<Json<T>, JsonRejection>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/github/repos", get(list_repositories).post(create_repository))
        .route("/api/github/branches", post(create_branch))
        .route("/api/github/files", post(commit_file))
        .route("/api/vercel/deploy", post(create_deployment))
        .route("/api/vercel/env", post(append_env_var))
        .route("/api/vercel/projects", get(list_vercel_projects))
        .route("/api/gpt/chat", post(chat))
        .route("/api/mobile/build", post(start_mobile_build))
        .route("/api/builds/{id}", get(get_build))
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/{id}", patch(update_project))
        .route("/api/workflows", get(list_workflows))
        .route("/api/workflows/execute", post(execute_workflow))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn list_repositories(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(Json(state.source_control.list_repositories().await?))
}

async fn create_repository(State(state): State<AppState>, body: Body<CreateRepository>) -> ApiResult<Value> {
    let Json(request) = body?;
    Ok(Json(state.source_control.create_repository(&request).await?))
}

async fn create_branch(State(state): State<AppState>, body: Body<CreateBranch>) -> ApiResult<Value> {
    let Json(request) = body?;
    Ok(Json(state.source_control.create_branch(&request).await?))
}

async fn commit_file(State(state): State<AppState>, body: Body<CommitFile>) -> ApiResult<Value> {
    let Json(request) = body?;
    Ok(Json(state.source_control.commit_file(&request).await?))
}

async fn create_deployment(State(state): State<AppState>, body: Body<CreateDeployment>) -> ApiResult<Value> {
    let Json(request) = body?;
    Ok(Json(state.deployment.create_deployment(&request).await?))
}

async fn append_env_var(State(state): State<AppState>, body: Body<AppendEnvVar>) -> ApiResult<Value> {
    let Json(request) = body?;
    Ok(Json(state.deployment.append_env_var(&request).await?))
}

async fn list_vercel_projects(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(Json(state.deployment.list_projects().await?))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

async fn chat(State(state): State<AppState>, body: Body<ChatRequest>) -> ApiResult<ChatMessage> {
    let Json(request) = body?;
    Ok(Json(state.planning.respond(&request.messages).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MobileBuildRequest {
    project_id: String,
    #[serde(default)]
    platform: String,
}

async fn start_mobile_build(State(state): State<AppState>, body: Body<MobileBuildRequest>) -> ApiResult<BuildStarted> {
    let Json(request) = body?;
    Ok(Json(state.builds.start_build(&request.project_id, &request.platform).await?))
}

async fn get_build(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<BuildRecord> {
    Ok(Json(state.records.get_build(&id).await?))
}

#[derive(Debug, Deserialize)]
struct ProjectQuery {
    #[serde(rename = "userId")]
    user_id: String,
}

async fn list_projects(State(state): State<AppState>, query: Result<Query<ProjectQuery>, QueryRejection>) -> ApiResult<Vec<ProjectRecord>> {
    let Query(query) = query?;
    Ok(Json(state.records.list_projects(&query.user_id).await?))
}

#[derive(Debug, Deserialize)]
struct CreateProjectRequest {
    #[serde(rename = "userId", alias = "user_id")]
    user_id: String,
    name: String,
    #[serde(default)]
    repo_url: Option<String>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

async fn create_project(State(state): State<AppState>, body: Body<CreateProjectRequest>) -> ApiResult<ProjectRecord> {
    let Json(request) = body?;
    let project = NewProject {
        user_id: request.user_id,
        name: request.name,
        repo_url: request.repo_url,
        owner: request.owner,
        status: request.status,
    };
    Ok(Json(state.records.create_project(&project).await?))
}

async fn update_project(State(state): State<AppState>, Path(id): Path<String>, body: Body<ProjectPatch>) -> ApiResult<ProjectRecord> {
    let Json(patch) = body?;
    Ok(Json(state.records.update_project(&id, &patch).await?))
}

async fn list_workflows(State(state): State<AppState>) -> Json<Vec<TaskDefinition>> {
    Json(state.workflows.catalog().tasks().cloned().collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteWorkflowRequest {
    task_name: String,
    #[serde(default)]
    params: Map<String, Value>,
    #[serde(default)]
    project_id: Option<String>,
}

async fn execute_workflow(State(state): State<AppState>, body: Body<ExecuteWorkflowRequest>) -> ApiResult<RunReport> {
    let Json(request) = body?;
    info!(task = %request.task_name, project_id = ?request.project_id, "workflow run requested");
    let context = RunContext::new(request.params, request.project_id);
    Ok(Json(state.workflows.run(&request.task_name, context).await?))
}
