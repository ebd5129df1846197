//! Chat-driven planning.
//!
//! The planner is offered a fixed set of functions. A proposed call is mapped
//! onto step actions through an explicit table; the outcome goes back to the
//! caller as a `function` transcript entry whose content is the serialized
//! result.

use std::{fmt, str::FromStr, sync::Arc};

use devdeck_api::planning::Planner;
use devdeck_types::{ChatMessage, FunctionDefinition, StepOutcome};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::executor::{RunContext, StepExecutor};
use crate::{Action, EngineError};

/// Functions the planner may propose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedFunction {
    CreateProject,
    DeployProject,
    BuildMobile,
}

impl PlannedFunction {
    pub const ALL: [PlannedFunction; 3] = [Self::CreateProject, Self::DeployProject, Self::BuildMobile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateProject => "create_project",
            Self::DeployProject => "deploy_project",
            Self::BuildMobile => "build_mobile",
        }
    }

    pub fn definition(&self) -> FunctionDefinition {
        let (description, parameters) = match self {
            Self::CreateProject => (
                "Create a new project with a GitHub repository and a Vercel deployment",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "Project name, also used as the repository name"},
                        "description": {"type": "string", "description": "Project description"},
                        "template": {"type": "string", "enum": ["next", "react", "vue", "node"], "description": "Project template"}
                    },
                    "required": ["name", "template"]
                }),
            ),
            Self::DeployProject => (
                "Deploy an existing project to Vercel",
                json!({
                    "type": "object",
                    "properties": {
                        "projectName": {"type": "string", "description": "Project name"}
                    },
                    "required": ["projectName"]
                }),
            ),
            Self::BuildMobile => (
                "Start a native mobile build (Android or iOS)",
                json!({
                    "type": "object",
                    "properties": {
                        "projectId": {"type": "string", "description": "Project id"},
                        "platform": {"type": "string", "enum": ["android", "ios"], "description": "Target platform"}
                    },
                    "required": ["projectId", "platform"]
                }),
            ),
        };
        FunctionDefinition {
            name: self.as_str().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

impl fmt::Display for PlannedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlannedFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|function| function.as_str() == s)
            .ok_or_else(|| format!("Unknown function: {s}"))
    }
}

/// What the planner asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    Invoke { function: String, params: Map<String, Value> },
    Message(ChatMessage),
}

/// Parse the planner's reply into a [`Proposal`].
pub fn propose(reply: ChatMessage) -> Result<Proposal, EngineError> {
    let call = match reply.function_call {
        Some(ref call) => call.clone(),
        None => return Ok(Proposal::Message(reply)),
    };
    let arguments = if call.arguments.trim().is_empty() { "{}" } else { call.arguments.as_str() };
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(params)) => Ok(Proposal::Invoke { function: call.name, params }),
        Ok(other) => Err(EngineError::MalformedPlan {
            function: call.name.clone(),
            message: format!("expected a JSON object, got {other}"),
        }),
        Err(error) => Err(EngineError::MalformedPlan {
            function: call.name.clone(),
            message: error.to_string(),
        }),
    }
}

pub struct PlanningAdapter {
    planner: Arc<dyn Planner>,
    executor: Arc<StepExecutor>,
}

impl PlanningAdapter {
    pub fn new(planner: Arc<dyn Planner>, executor: Arc<StepExecutor>) -> Self {
        Self { planner, executor }
    }

    pub fn functions() -> Vec<FunctionDefinition> {
        PlannedFunction::ALL.iter().map(PlannedFunction::definition).collect()
    }

    /// One chat turn: plain replies pass through unchanged, proposed calls are
    /// executed and answered with a function-result message.
    pub async fn respond(&self, transcript: &[ChatMessage]) -> Result<ChatMessage, EngineError> {
        let reply = self.planner.complete(transcript, &Self::functions()).await?;
        match propose(reply)? {
            Proposal::Message(message) => {
                debug!("planner replied without a function call");
                Ok(message)
            }
            Proposal::Invoke { function, params } => {
                info!(function = %function, "planner proposed a function call");
                let result = self.invoke(&function, &params).await;
                Ok(ChatMessage::function_result(function, result.to_string()))
            }
        }
    }

    async fn invoke(&self, function: &str, params: &Map<String, Value>) -> Value {
        let function = match function.parse::<PlannedFunction>() {
            Ok(function) => function,
            Err(message) => return json!({"error": message}),
        };
        let context = RunContext::default();
        match function {
            PlannedFunction::CreateProject => {
                let name = params.get("name").cloned().unwrap_or(Value::Null);
                let mut repo_params = Map::new();
                repo_params.insert("name".into(), name.clone());
                if let Some(description) = params.get("description") {
                    repo_params.insert("description".into(), description.clone());
                }
                repo_params.insert("auto_init".into(), Value::Bool(true));
                let repo = match self.step(Action::GitHubCreateRepo, repo_params, &context).await {
                    Ok(repo) => repo,
                    Err(failure) => return failure,
                };

                let mut deploy_params = Map::new();
                deploy_params.insert("projectName".into(), name);
                match self.step(Action::VercelDeploy, deploy_params, &context).await {
                    Ok(deployment) => json!({
                        "success": true,
                        "repo": repo.get("html_url").cloned().unwrap_or(Value::Null),
                        "deployment": deployment.get("url").cloned().unwrap_or(Value::Null),
                    }),
                    Err(failure) => failure,
                }
            }
            PlannedFunction::DeployProject => {
                let mut deploy_params = Map::new();
                deploy_params.insert("projectName".into(), params.get("projectName").cloned().unwrap_or(Value::Null));
                match self.step(Action::VercelDeploy, deploy_params, &context).await {
                    Ok(deployment) => json!({"success": true, "deployment": deployment}),
                    Err(failure) => failure,
                }
            }
            PlannedFunction::BuildMobile => match self.step(Action::MobileBuild, params.clone(), &context).await {
                Ok(build) => json!({"success": true, "build": build}),
                Err(failure) => failure,
            },
        }
    }

    /// Run one action; failures come back as `{success: false, error}`.
    async fn step(&self, action: Action, params: Map<String, Value>, context: &RunContext) -> Result<Value, Value> {
        match self.executor.execute(action.as_str(), &params, context).await {
            StepOutcome::Success(payload) => Ok(payload),
            StepOutcome::Failure(failure) => Err(json!({"success": false, "error": failure.error})),
        }
    }
}
