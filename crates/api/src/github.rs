//! Source-control capability backed by the GitHub REST API.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use devdeck_types::ServiceId;
use reqwest::{Method, header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{ServiceClient, encode_path, encode_segment};
use crate::{ServiceEndpoint, ServiceError};

const GITHUB_API_VERSION: &str = "2022-11-28";
const FALLBACK_MESSAGE: &str = "GitHub request failed";

/// Repository creation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRepository {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default = "default_true")]
    pub auto_init: bool,
}

/// Branch creation parameters; the new branch starts at `from_branch`'s head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBranch {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    #[serde(default = "default_branch")]
    pub from_branch: String,
}

/// Create-or-update parameters for a single file. `content` is plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFile {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub content: String,
    pub message: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_true() -> bool {
    true
}

fn default_branch() -> String {
    "main".to_string()
}

#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Repositories of the authenticated user, most recently updated first.
    async fn list_repositories(&self) -> Result<Value, ServiceError>;
    async fn create_repository(&self, request: &CreateRepository) -> Result<Value, ServiceError>;
    async fn create_branch(&self, request: &CreateBranch) -> Result<Value, ServiceError>;
    async fn commit_file(&self, request: &CommitFile) -> Result<Value, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: ServiceClient,
}

impl GitHubClient {
    pub fn new(endpoint: &ServiceEndpoint) -> Result<Self, ServiceError> {
        let mut headers = header::HeaderMap::new();
        headers.insert("x-github-api-version", header::HeaderValue::from_static(GITHUB_API_VERSION));
        Ok(Self {
            client: ServiceClient::with_headers(endpoint, headers)?,
        })
    }

    fn repo_path(owner: &str, repo: &str) -> String {
        format!("/repos/{}/{}", encode_segment(owner), encode_segment(repo))
    }

    /// Sha of an existing file, or `None` when the file does not exist yet.
    async fn existing_file_sha(&self, request: &CommitFile) -> Option<String> {
        let path = format!("{}/contents/{}", Self::repo_path(&request.owner, &request.repo), encode_path(&request.path));
        let lookup = self.client.request(Method::GET, &path).query(&[("ref", request.branch.as_str())]);
        match self.client.send_json(lookup, FALLBACK_MESSAGE).await {
            Ok(body) => body.get("sha").and_then(Value::as_str).map(str::to_string),
            Err(error) => {
                debug!(path = %request.path, error = %error, "file lookup failed; creating new file");
                None
            }
        }
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    async fn list_repositories(&self) -> Result<Value, ServiceError> {
        let request = self
            .client
            .request(Method::GET, "/user/repos")
            .query(&[("sort", "updated"), ("per_page", "100")]);
        self.client.send_json(request, FALLBACK_MESSAGE).await
    }

    async fn create_repository(&self, request: &CreateRepository) -> Result<Value, ServiceError> {
        let body = json!({
            "name": request.name,
            "description": request.description,
            "private": request.private,
            "auto_init": request.auto_init,
        });
        let builder = self.client.request(Method::POST, "/user/repos").json(&body);
        self.client.send_json(builder, FALLBACK_MESSAGE).await
    }

    async fn create_branch(&self, request: &CreateBranch) -> Result<Value, ServiceError> {
        let repo_path = Self::repo_path(&request.owner, &request.repo);
        let source_ref = format!("{repo_path}/git/ref/heads/{}", encode_path(&request.from_branch));
        let source = self
            .client
            .send_json(self.client.request(Method::GET, &source_ref), FALLBACK_MESSAGE)
            .await?;
        let sha = source
            .pointer("/object/sha")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::decode(ServiceId::GitHub, format!("ref heads/{} has no object sha", request.from_branch)))?;

        let body = json!({
            "ref": format!("refs/heads/{}", request.branch),
            "sha": sha,
        });
        let builder = self.client.request(Method::POST, &format!("{repo_path}/git/refs")).json(&body);
        self.client.send_json(builder, FALLBACK_MESSAGE).await
    }

    async fn commit_file(&self, request: &CommitFile) -> Result<Value, ServiceError> {
        let sha = self.existing_file_sha(request).await;
        let mut body = json!({
            "message": request.message,
            "content": BASE64.encode(request.content.as_bytes()),
            "branch": request.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = Value::String(sha);
        }
        let path = format!("{}/contents/{}", Self::repo_path(&request.owner, &request.repo), encode_path(&request.path));
        let builder = self.client.request(Method::PUT, &path).json(&body);
        self.client.send_json(builder, FALLBACK_MESSAGE).await
    }
}
