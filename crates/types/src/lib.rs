//! Shared type definitions for the devdeck workspace.
//!
//! Everything in this crate is plain serde data: task configuration documents,
//! step outcomes and run reports, chat transcripts, and the rows of the external
//! record store. Behavior lives in `devdeck-engine` and `devdeck-api`.

use std::{error::Error, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod chat;
pub mod records;
pub mod workflow;

pub use chat::{ChatMessage, ChatRole, FunctionCall, FunctionDefinition};
pub use records::{
    ActionRecord, ActionStatus, BuildPatch, BuildRecord, BuildStatus, NewAction, NewBuild, NewProject, ProjectPatch, ProjectRecord,
};
pub use workflow::{
    EmojiStatus, OutputConfiguration, RunReport, StepDefinition, StepFailure, StepOutcome, StepRecord, TaskConfiguration, TaskDefinition,
};

/// External services the dashboard talks to.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceId {
    GitHub,   // https://api.github.com
    Vercel,   // https://api.vercel.com
    OpenAi,   // https://api.openai.com
    Supabase, // no public default; SUPABASE_URL is required
}

impl ServiceId {
    pub const ALL: [ServiceId; 4] = [Self::GitHub, Self::Vercel, Self::OpenAi, Self::Supabase];
}

pub trait ToServiceIdInfo {
    fn env_var(&self) -> &str;
    fn token_env_var(&self) -> &str;
    fn default_base_url(&self) -> Option<&str>;
    fn accept_header(&self) -> &'static str;
}

impl ToServiceIdInfo for ServiceId {
    fn env_var(&self) -> &str {
        match self {
            Self::GitHub => "GITHUB_API_BASE",
            Self::Vercel => "VERCEL_API_BASE",
            Self::OpenAi => "OPENAI_API_BASE",
            Self::Supabase => "SUPABASE_URL",
        }
    }

    fn token_env_var(&self) -> &str {
        match self {
            Self::GitHub => "GITHUB_TOKEN",
            Self::Vercel => "VERCEL_TOKEN",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Supabase => "SUPABASE_SERVICE_ROLE_KEY",
        }
    }

    fn default_base_url(&self) -> Option<&str> {
        match self {
            Self::GitHub => Some("https://api.github.com"),
            Self::Vercel => Some("https://api.vercel.com"),
            Self::OpenAi => Some("https://api.openai.com"),
            Self::Supabase => None,
        }
    }

    fn accept_header(&self) -> &'static str {
        match self {
            Self::GitHub => "application/vnd.github+json",
            Self::Vercel | Self::OpenAi | Self::Supabase => "application/json",
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::GitHub => "github",
            Self::Vercel => "vercel",
            Self::OpenAi => "openai",
            Self::Supabase => "supabase",
        };
        f.write_str(label)
    }
}

impl FromStr for ServiceId {
    type Err = ParseServiceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(Self::GitHub),
            "vercel" => Ok(Self::Vercel),
            "openai" => Ok(Self::OpenAi),
            "supabase" => Ok(Self::Supabase),
            _ => Err(ParseServiceIdError),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseServiceIdError;

impl fmt::Display for ParseServiceIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid service id; expected 'github', 'vercel', 'openai' or 'supabase'")
    }
}

impl Error for ParseServiceIdError {}

/// Target platform of a native mobile build.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ParsePlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            _ => Err(ParsePlatformError),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsePlatformError;

impl fmt::Display for ParsePlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Platform must be 'android' or 'ios'")
    }
}

impl Error for ParsePlatformError {}
