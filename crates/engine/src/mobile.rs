//! Detached native mobile build pipeline.
//!
//! [`BuildService::start_build`] records a `building` row and returns at once;
//! the pipeline runs on a spawned task and writes the final status and logs back
//! through the record store. Callers poll the build row for completion.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use devdeck_api::records::RecordStore;
use devdeck_types::{BuildPatch, BuildStatus, NewBuild, Platform};
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::EngineError;

/// One external command of the build pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStage {
    /// Log line written before the stage output.
    pub header: String,
    pub program: &'static str,
    pub args: Vec<String>,
    /// Directory relative to the mobile project root, if not the root itself.
    pub subdirectory: Option<&'static str>,
}

impl BuildStage {
    fn new(header: impl Into<String>, program: &'static str, args: &[&str]) -> Self {
        Self {
            header: header.into(),
            program,
            args: args.iter().map(|arg| arg.to_string()).collect(),
            subdirectory: None,
        }
    }

    fn in_directory(mut self, subdirectory: &'static str) -> Self {
        self.subdirectory = Some(subdirectory);
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string()).chain(self.args.iter().cloned()).collect::<Vec<_>>().join(" ")
    }
}

/// Ordered stages for `platform`.
pub fn pipeline(platform: Platform) -> Vec<BuildStage> {
    let mut stages = vec![
        BuildStage::new("📦 Building Next.js app...", "npm", &["run", "build"]),
        BuildStage::new("📤 Exporting static files...", "npx", &["next", "export"]),
        BuildStage::new(format!("🔄 Syncing to Capacitor ({platform})..."), "npx", &["cap", "sync", platform.as_str()]),
    ];
    stages.push(match platform {
        Platform::Android => BuildStage::new("🤖 Building Android APK...", "./gradlew", &["assembleRelease"]).in_directory("android"),
        Platform::Ios => {
            BuildStage::new("🍎 Building iOS app...", "xcodebuild", &["-scheme", "App", "-configuration", "Release"]).in_directory("ios")
        }
    });
    stages
}

/// Artifact location reported on a successful build.
pub fn output_path(platform: Platform) -> &'static str {
    match platform {
        Platform::Android => "./android/app/build/outputs/apk/release/app-release.apk",
        Platform::Ios => "./ios/build/Release-iphoneos/App.app",
    }
}

/// Runs a single pipeline stage and returns its captured stdout.
#[async_trait]
pub trait BuildToolchain: Send + Sync {
    async fn run(&self, stage: &BuildStage) -> Result<String>;
}

/// Toolchain that spawns real processes inside the mobile project directory.
#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    root: PathBuf,
}

impl ProcessToolchain {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BuildToolchain for ProcessToolchain {
    async fn run(&self, stage: &BuildStage) -> Result<String> {
        let directory = match stage.subdirectory {
            Some(subdirectory) => self.root.join(subdirectory),
            None => self.root.clone(),
        };
        debug!(command = %stage.command_line(), directory = %directory.display(), "running build stage");
        let output = Command::new(stage.program)
            .args(&stage.args)
            .current_dir(&directory)
            .output()
            .await
            .map_err(|error| anyhow::anyhow!("Command failed: {}: {error}", stage.command_line()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("Command failed: {}\n{}", stage.command_line(), stderr.trim_end());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Immediate answer to a build request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStarted {
    pub success: bool,
    pub build_id: String,
    pub message: String,
}

pub struct BuildService {
    records: Arc<dyn RecordStore>,
    toolchain: Arc<dyn BuildToolchain>,
}

impl BuildService {
    pub fn new(records: Arc<dyn RecordStore>, toolchain: Arc<dyn BuildToolchain>) -> Self {
        Self { records, toolchain }
    }

    /// Validate the platform, record a `building` row and spawn the pipeline.
    ///
    /// An invalid platform fails before anything is written. There is no handle
    /// to the spawned pipeline; completion is observable only through the row.
    pub async fn start_build(&self, project_id: &str, platform: &str) -> Result<BuildStarted, EngineError> {
        let platform: Platform = platform.parse()?;
        let build = self
            .records
            .create_build(&NewBuild {
                project_id: project_id.to_string(),
                platform,
                status: BuildStatus::Building,
            })
            .await?;
        info!(build_id = %build.id, project_id, %platform, "mobile build started");

        let records = Arc::clone(&self.records);
        let toolchain = Arc::clone(&self.toolchain);
        let build_id = build.id.clone();
        tokio::spawn(async move {
            run_pipeline(records, toolchain, build_id, platform).await;
        });

        Ok(BuildStarted {
            success: true,
            build_id: build.id,
            message: format!("{platform} build started"),
        })
    }
}

async fn run_pipeline(records: Arc<dyn RecordStore>, toolchain: Arc<dyn BuildToolchain>, build_id: String, platform: Platform) {
    let patch = match run_stages(toolchain.as_ref(), platform).await {
        Ok(logs) => {
            info!(build_id = %build_id, %platform, "mobile build completed");
            BuildPatch::completed(output_path(platform), logs)
        }
        Err(failure) => {
            error!(build_id = %build_id, %platform, error = %failure, "mobile build failed");
            BuildPatch::failed(failure.to_string())
        }
    };
    if let Err(write_error) = records.update_build(&build_id, &patch).await {
        let error = EngineError::Persistence(write_error);
        warn!(build_id = %build_id, error = %error, "could not record build result");
    }
}

async fn run_stages(toolchain: &dyn BuildToolchain, platform: Platform) -> Result<String> {
    let mut logs = String::new();
    for (index, stage) in pipeline(platform).iter().enumerate() {
        if index > 0 {
            logs.push('\n');
        }
        logs.push_str(&stage.header);
        logs.push('\n');
        logs.push_str(&toolchain.run(stage).await?);
    }
    Ok(logs)
}
