//! Record-store capability backed by the Supabase PostgREST interface.

use async_trait::async_trait;
use devdeck_types::{
    ActionRecord, BuildPatch, BuildRecord, NewAction, NewBuild, NewProject, ProjectPatch, ProjectRecord, ServiceId, ToServiceIdInfo,
};
use reqwest::{Method, RequestBuilder, header};

use crate::client::ServiceClient;
use crate::{ServiceEndpoint, ServiceError};

/// Media type asking PostgREST for a single JSON object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Projects owned by `user_id`, newest first.
    async fn list_projects(&self, user_id: &str) -> Result<Vec<ProjectRecord>, ServiceError>;
    async fn create_project(&self, project: &NewProject) -> Result<ProjectRecord, ServiceError>;
    async fn update_project(&self, id: &str, patch: &ProjectPatch) -> Result<ProjectRecord, ServiceError>;
    async fn insert_action(&self, action: &NewAction) -> Result<ActionRecord, ServiceError>;
    async fn create_build(&self, build: &NewBuild) -> Result<BuildRecord, ServiceError>;
    async fn update_build(&self, id: &str, patch: &BuildPatch) -> Result<BuildRecord, ServiceError>;
    async fn get_build(&self, id: &str) -> Result<BuildRecord, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: ServiceClient,
}

impl SupabaseClient {
    /// `endpoint.base_url` is the project URL; the REST prefix is appended here.
    pub fn new(endpoint: &ServiceEndpoint) -> Result<Self, ServiceError> {
        let key = endpoint.token.as_deref().ok_or_else(|| {
            ServiceError::not_configured(ServiceId::Supabase, format!("{} is not set", ServiceId::Supabase.token_env_var()))
        })?;
        let mut headers = header::HeaderMap::new();
        let api_key = header::HeaderValue::from_str(key)
            .map_err(|_| ServiceError::not_configured(ServiceId::Supabase, "service key contains invalid characters"))?;
        headers.insert("apikey", api_key);
        headers.insert("prefer", header::HeaderValue::from_static("return=representation"));

        let rest = ServiceEndpoint::new(
            endpoint.service,
            format!("{}/rest/v1", endpoint.base_url.trim_end_matches('/')),
            endpoint.token.clone(),
        );
        Ok(Self {
            client: ServiceClient::with_headers(&rest, headers)?,
        })
    }

    fn single(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, path).header(header::ACCEPT, SINGLE_OBJECT)
    }
}

fn eq_filter(id: &str) -> String {
    format!("eq.{id}")
}

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn list_projects(&self, user_id: &str) -> Result<Vec<ProjectRecord>, ServiceError> {
        let builder = self
            .client
            .request(Method::GET, "/projects")
            .query(&[("select", "*".to_string()), ("user_id", eq_filter(user_id)), ("order", "created_at.desc".to_string())]);
        self.client.send_typed(builder, "Failed to fetch projects").await
    }

    async fn create_project(&self, project: &NewProject) -> Result<ProjectRecord, ServiceError> {
        let builder = self.single(Method::POST, "/projects").json(project);
        self.client.send_typed(builder, "Failed to create project").await
    }

    async fn update_project(&self, id: &str, patch: &ProjectPatch) -> Result<ProjectRecord, ServiceError> {
        let builder = self.single(Method::PATCH, "/projects").query(&[("id", eq_filter(id))]).json(patch);
        self.client.send_typed(builder, "Failed to update project").await
    }

    async fn insert_action(&self, action: &NewAction) -> Result<ActionRecord, ServiceError> {
        let builder = self.single(Method::POST, "/actions").json(action);
        self.client.send_typed(builder, "Failed to log action").await
    }

    async fn create_build(&self, build: &NewBuild) -> Result<BuildRecord, ServiceError> {
        let builder = self.single(Method::POST, "/builds").json(build);
        self.client.send_typed(builder, "Failed to create build").await
    }

    async fn update_build(&self, id: &str, patch: &BuildPatch) -> Result<BuildRecord, ServiceError> {
        let builder = self.single(Method::PATCH, "/builds").query(&[("id", eq_filter(id))]).json(patch);
        self.client.send_typed(builder, "Failed to update build").await
    }

    async fn get_build(&self, id: &str) -> Result<BuildRecord, ServiceError> {
        let builder = self
            .single(Method::GET, "/builds")
            .query(&[("select", "*".to_string()), ("id", eq_filter(id))]);
        self.client.send_typed(builder, "Build not found").await
    }
}

/// Record store used when `SUPABASE_URL` is unset; every call fails with
/// [`ServiceError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredRecordStore;

impl UnconfiguredRecordStore {
    fn error() -> ServiceError {
        ServiceError::not_configured(ServiceId::Supabase, format!("{} is not set", ServiceId::Supabase.env_var()))
    }
}

#[async_trait]
impl RecordStore for UnconfiguredRecordStore {
    async fn list_projects(&self, _user_id: &str) -> Result<Vec<ProjectRecord>, ServiceError> {
        Err(Self::error())
    }

    async fn create_project(&self, _project: &NewProject) -> Result<ProjectRecord, ServiceError> {
        Err(Self::error())
    }

    async fn update_project(&self, _id: &str, _patch: &ProjectPatch) -> Result<ProjectRecord, ServiceError> {
        Err(Self::error())
    }

    async fn insert_action(&self, _action: &NewAction) -> Result<ActionRecord, ServiceError> {
        Err(Self::error())
    }

    async fn create_build(&self, _build: &NewBuild) -> Result<BuildRecord, ServiceError> {
        Err(Self::error())
    }

    async fn update_build(&self, _id: &str, _patch: &BuildPatch) -> Result<BuildRecord, ServiceError> {
        Err(Self::error())
    }

    async fn get_build(&self, _id: &str) -> Result<BuildRecord, ServiceError> {
        Err(Self::error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use devdeck_types::{ActionStatus, BuildStatus, Platform};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    async fn serve(router: Router) -> SupabaseClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        let endpoint = ServiceEndpoint::new(ServiceId::Supabase, format!("http://{address}"), Some("service-key".into()));
        SupabaseClient::new(&endpoint).expect("client")
    }

    #[test]
    fn missing_service_key_is_not_configured() {
        let endpoint = ServiceEndpoint::new(ServiceId::Supabase, "https://abc.supabase.co", None);
        let error = SupabaseClient::new(&endpoint).unwrap_err();
        assert!(matches!(error, ServiceError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn list_projects_filters_by_user_and_orders_newest_first() {
        let router = Router::new().route(
            "/rest/v1/projects",
            get(|headers: HeaderMap, Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(headers.get("apikey").and_then(|v| v.to_str().ok()), Some("service-key"));
                assert_eq!(query.get("user_id").map(String::as_str), Some("eq.u1"));
                assert_eq!(query.get("order").map(String::as_str), Some("created_at.desc"));
                Json(json!([
                    {"id": "p2", "user_id": "u1", "name": "newer", "created_at": "2025-02-01T00:00:00Z"},
                    {"id": "p1", "user_id": "u1", "name": "older", "created_at": "2025-01-01T00:00:00Z"}
                ]))
            }),
        );
        let client = serve(router).await;
        let projects = client.list_projects("u1").await.expect("projects");
        assert_eq!(projects.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), ["newer", "older"]);
    }

    #[tokio::test]
    async fn create_build_requests_single_row_representation() {
        let router = Router::new().route(
            "/rest/v1/builds",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers.get("accept").and_then(|v| v.to_str().ok()), Some(SINGLE_OBJECT));
                assert_eq!(headers.get("prefer").and_then(|v| v.to_str().ok()), Some("return=representation"));
                Json(json!({"id": "b1", "project_id": body["project_id"], "platform": body["platform"], "status": body["status"]}))
            }),
        );
        let client = serve(router).await;
        let build = client
            .create_build(&NewBuild {
                project_id: "p1".into(),
                platform: Platform::Android,
                status: BuildStatus::Building,
            })
            .await
            .expect("build");
        assert_eq!(build.id, "b1");
        assert_eq!(build.status, BuildStatus::Building);
    }

    #[tokio::test]
    async fn update_build_targets_row_by_id() {
        let router = Router::new().route(
            "/rest/v1/builds",
            axum::routing::patch(|Query(query): Query<HashMap<String, String>>, Json(body): Json<Value>| async move {
                Json(json!({
                    "id": query.get("id").cloned().unwrap_or_default().trim_start_matches("eq.").to_string(),
                    "project_id": "p1",
                    "platform": "ios",
                    "status": body["status"],
                    "logs": body["logs"],
                }))
            }),
        );
        let client = serve(router).await;
        let build = client.update_build("b9", &BuildPatch::failed("boom")).await.expect("update");
        assert_eq!(build.id, "b9");
        assert_eq!(build.status, BuildStatus::Failed);
        assert_eq!(build.logs.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn insert_action_surfaces_postgrest_errors() {
        let router = Router::new().route(
            "/rest/v1/actions",
            post(|| async { (StatusCode::CONFLICT, Json(json!({"message": "duplicate key value", "code": "23505"}))) }),
        );
        let client = serve(router).await;
        let error = client
            .insert_action(&NewAction {
                project_id: "p1".into(),
                action_type: "vercel_deploy".into(),
                payload: None,
                result: None,
                status: ActionStatus::Success,
            })
            .await
            .unwrap_err();
        assert_eq!(error.status(), Some(409));
        assert_eq!(error.to_string(), "duplicate key value");
    }

    #[tokio::test]
    async fn unconfigured_store_fails_every_call() {
        let store = UnconfiguredRecordStore;
        let error = store.get_build("b1").await.unwrap_err();
        assert!(error.to_string().contains("SUPABASE_URL"), "{error}");
        assert!(store.list_projects("u1").await.is_err());
    }
}
