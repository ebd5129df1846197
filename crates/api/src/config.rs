//! Environment-driven service configuration.

use std::env;

use devdeck_types::{ServiceId, ToServiceIdInfo};

/// Default chat-completion model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";

/// Base URL and credential for one external service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub service: ServiceId,
    pub base_url: String,
    pub token: Option<String>,
}

impl ServiceEndpoint {
    pub fn new(service: ServiceId, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            service,
            base_url: base_url.into(),
            token,
        }
    }

    /// Resolve an endpoint from the service's environment variables.
    ///
    /// Returns `None` when neither an override nor a default base URL exists.
    pub fn from_env(service: ServiceId) -> Option<Self> {
        let base_url = non_blank_env(service.env_var()).or_else(|| service.default_base_url().map(str::to_string))?;
        let token = non_blank_env(service.token_env_var());
        Some(Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

/// Endpoints for every capability client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub github: Option<ServiceEndpoint>,
    pub vercel: Option<ServiceEndpoint>,
    pub openai: Option<ServiceEndpoint>,
    pub supabase: Option<ServiceEndpoint>,
    pub openai_model: String,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self {
            github: ServiceEndpoint::from_env(ServiceId::GitHub),
            vercel: ServiceEndpoint::from_env(ServiceId::Vercel),
            openai: ServiceEndpoint::from_env(ServiceId::OpenAi),
            supabase: ServiceEndpoint::from_env(ServiceId::Supabase),
            openai_model: non_blank_env("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        }
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    env::var(name).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}
