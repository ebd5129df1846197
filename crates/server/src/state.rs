use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use devdeck_api::github::{GitHubClient, SourceControl};
use devdeck_api::planning::{ChatCompletionsClient, Planner};
use devdeck_api::records::{RecordStore, SupabaseClient, UnconfiguredRecordStore};
use devdeck_api::vercel::{Deployment, VercelClient};
use devdeck_api::{ServiceConfig, ServiceEndpoint};
use devdeck_engine::{
    BuildService, BuildToolchain, Capabilities, PlanningAdapter, ProcessToolchain, StepExecutor, TaskCatalog, WorkflowEngine,
};
use devdeck_types::ServiceId;
use tracing::{info, warn};

/// Capability implementations the server is assembled from.
pub struct Services {
    pub source_control: Arc<dyn SourceControl>,
    pub deployment: Arc<dyn Deployment>,
    pub planner: Arc<dyn Planner>,
    pub records: Arc<dyn RecordStore>,
    pub toolchain: Arc<dyn BuildToolchain>,
}

impl Services {
    /// Real clients built from environment configuration.
    ///
    /// Without `SUPABASE_URL` the record store is a stub that fails every call.
    pub fn from_config(config: &ServiceConfig, mobile_dir: &Path) -> Result<Self> {
        let github = endpoint(config.github.as_ref(), ServiceId::GitHub)?;
        let vercel = endpoint(config.vercel.as_ref(), ServiceId::Vercel)?;
        let openai = endpoint(config.openai.as_ref(), ServiceId::OpenAi)?;

        let records: Arc<dyn RecordStore> = match config.supabase.as_ref() {
            Some(endpoint) => Arc::new(SupabaseClient::new(endpoint).context("configure record store")?),
            None => {
                warn!("SUPABASE_URL is not set; record store calls will fail");
                Arc::new(UnconfiguredRecordStore)
            }
        };

        Ok(Self {
            source_control: Arc::new(GitHubClient::new(github).context("configure GitHub client")?),
            deployment: Arc::new(VercelClient::new(vercel).context("configure Vercel client")?),
            planner: Arc::new(ChatCompletionsClient::new(openai, config.openai_model.clone()).context("configure chat client")?),
            records,
            toolchain: Arc::new(ProcessToolchain::new(mobile_dir)),
        })
    }
}

fn endpoint(endpoint: Option<&ServiceEndpoint>, service: ServiceId) -> Result<&ServiceEndpoint> {
    endpoint.with_context(|| format!("no base url configured for {service}"))
}

/// Shared handler state. Everything is behind `Arc`; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub source_control: Arc<dyn SourceControl>,
    pub deployment: Arc<dyn Deployment>,
    pub records: Arc<dyn RecordStore>,
    pub builds: Arc<BuildService>,
    pub workflows: Arc<WorkflowEngine>,
    pub planning: Arc<PlanningAdapter>,
}

impl AppState {
    pub fn new(services: Services, catalog: Arc<TaskCatalog>) -> Self {
        let Services {
            source_control,
            deployment,
            planner,
            records,
            toolchain,
        } = services;
        let builds = Arc::new(BuildService::new(Arc::clone(&records), toolchain));
        let executor = Arc::new(StepExecutor::new(Capabilities {
            source_control: Arc::clone(&source_control),
            deployment: Arc::clone(&deployment),
            records: Arc::clone(&records),
            builds: Arc::clone(&builds),
        }));
        info!(tasks = catalog.len(), "task catalog loaded");
        Self {
            source_control,
            deployment,
            records,
            builds,
            workflows: Arc::new(WorkflowEngine::new(catalog, Arc::clone(&executor))),
            planning: Arc::new(PlanningAdapter::new(planner, executor)),
        }
    }
}
