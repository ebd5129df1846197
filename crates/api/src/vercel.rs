//! Deployment capability backed by the Vercel REST API.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::client::{ServiceClient, encode_segment};
use crate::{ServiceEndpoint, ServiceError};

/// Git reference a deployment is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "ref")]
    pub reference: String,
}

impl Default for GitSource {
    fn default() -> Self {
        Self {
            kind: "github".to_string(),
            reference: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeployment {
    pub project_name: String,
    #[serde(default)]
    pub git_source: GitSource,
}

/// One environment variable to append to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendEnvVar {
    pub project_id: String,
    pub key: String,
    pub value: String,
    #[serde(default = "default_targets")]
    pub target: Vec<String>,
}

fn default_targets() -> Vec<String> {
    ["production", "preview", "development"].map(String::from).to_vec()
}

#[async_trait]
pub trait Deployment: Send + Sync {
    /// Trigger a production deployment; returns the deployment descriptor.
    async fn create_deployment(&self, request: &CreateDeployment) -> Result<Value, ServiceError>;
    /// Append an encrypted environment variable; never replaces existing ones.
    async fn append_env_var(&self, request: &AppendEnvVar) -> Result<Value, ServiceError>;
    /// The project list, or an empty array when the response has none.
    async fn list_projects(&self) -> Result<Value, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct VercelClient {
    client: ServiceClient,
}

impl VercelClient {
    pub fn new(endpoint: &ServiceEndpoint) -> Result<Self, ServiceError> {
        Ok(Self {
            client: ServiceClient::new(endpoint)?,
        })
    }
}

#[async_trait]
impl Deployment for VercelClient {
    async fn create_deployment(&self, request: &CreateDeployment) -> Result<Value, ServiceError> {
        let body = json!({
            "name": request.project_name,
            "gitSource": request.git_source,
            "target": "production",
        });
        let builder = self.client.request(Method::POST, "/v13/deployments").json(&body);
        self.client.send_json(builder, "Vercel deployment failed").await
    }

    async fn append_env_var(&self, request: &AppendEnvVar) -> Result<Value, ServiceError> {
        let body = json!({
            "key": request.key,
            "value": request.value,
            "type": "encrypted",
            "target": request.target,
        });
        let path = format!("/v10/projects/{}/env", encode_segment(&request.project_id));
        let builder = self.client.request(Method::POST, &path).json(&body);
        self.client.send_json(builder, "ENV sync failed").await
    }

    async fn list_projects(&self) -> Result<Value, ServiceError> {
        let builder = self.client.request(Method::GET, "/v9/projects");
        let body = self.client.send_json(builder, "Failed to fetch projects").await?;
        Ok(match body.get("projects") {
            Some(projects @ Value::Array(_)) => projects.clone(),
            _ => Value::Array(Vec::new()),
        })
    }
}
