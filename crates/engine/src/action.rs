use std::{fmt, str::FromStr};

use crate::EngineError;

/// Step actions the executor knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    GitHubCreateRepo,
    GitHubCreateBranch,
    GitHubPushFiles,
    VercelDeploy,
    VercelSyncEnv,
    MobileBuild,
    SupabaseLog,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Self::GitHubCreateRepo,
        Self::GitHubCreateBranch,
        Self::GitHubPushFiles,
        Self::VercelDeploy,
        Self::VercelSyncEnv,
        Self::MobileBuild,
        Self::SupabaseLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHubCreateRepo => "github_create_repo",
            Self::GitHubCreateBranch => "github_create_branch",
            Self::GitHubPushFiles => "github_push_files",
            Self::VercelDeploy => "vercel_deploy",
            Self::VercelSyncEnv => "vercel_sync_env",
            Self::MobileBuild => "mobile_build",
            Self::SupabaseLog => "supabase_log",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| EngineError::UnknownAction(s.to_string()))
    }
}
