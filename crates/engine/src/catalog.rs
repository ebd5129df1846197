//! Task configuration loading.
//!
//! The catalog is parsed once at startup and never mutated; callers share it
//! behind an `Arc`. Documents are JSON or YAML (`serde_yaml` accepts both).

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use devdeck_types::{OutputConfiguration, TaskConfiguration, TaskDefinition};
use devdeck_util::{config_file_path, expand_tilde};
use indexmap::{IndexMap, map::Entry};
use tracing::{debug, warn};

use crate::{Action, EngineError};

/// Environment variable naming a task configuration file.
pub const TASKS_PATH_ENV: &str = "DEVDECK_TASKS_PATH";
const TASKS_FILE_NAME: &str = "tasks.json";
const EMBEDDED_TASKS: &str = include_str!("../tasks/default.json");

/// Named task definitions in declaration order plus the output settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskCatalog {
    tasks: IndexMap<String, TaskDefinition>,
    output: OutputConfiguration,
}

impl TaskCatalog {
    /// Build a catalog, rejecting duplicate task names.
    ///
    /// Steps naming an unknown action are kept and reported when they run.
    pub fn from_configuration(configuration: TaskConfiguration) -> Result<Self, EngineError> {
        let mut tasks = IndexMap::with_capacity(configuration.tasks.len());
        for task in configuration.tasks {
            for step in &task.steps {
                if step.action.parse::<Action>().is_err() {
                    warn!(task = %task.name, action = %step.action, "task references an unknown action");
                }
            }
            match tasks.entry(task.name.clone()) {
                Entry::Occupied(_) => return Err(EngineError::Config(format!("duplicate task name '{}'", task.name))),
                Entry::Vacant(slot) => {
                    slot.insert(task);
                }
            }
        }
        Ok(Self {
            tasks,
            output: configuration.output,
        })
    }

    /// Parse a JSON or YAML task document.
    pub fn parse(document: &str) -> Result<Self> {
        let configuration: TaskConfiguration = serde_yaml::from_str(document).context("Failed to parse task configuration")?;
        Ok(Self::from_configuration(configuration)?)
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read task configuration: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid task configuration: {}", path.display()))
    }

    /// The catalog compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::parse(EMBEDDED_TASKS)
    }

    /// Resolve and load the catalog.
    ///
    /// Order: `explicit`, then [`TASKS_PATH_ENV`], then
    /// `<config_dir>/devdeck/tasks.json`, then the embedded default. An explicit
    /// or environment path must exist; the config-directory file is optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            debug!(path = %path.display(), "loading task configuration from --tasks");
            return Self::load_file(path);
        }
        if let Some(path) = env_path() {
            debug!(path = %path.display(), "loading task configuration from {TASKS_PATH_ENV}");
            return Self::load_file(path);
        }
        let default_path = config_file_path(TASKS_PATH_ENV, TASKS_FILE_NAME);
        if default_path.is_file() {
            debug!(path = %default_path.display(), "loading task configuration from config directory");
            return Self::load_file(default_path);
        }
        debug!("using embedded task configuration");
        Self::embedded()
    }

    pub fn get(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.get(name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn output(&self) -> &OutputConfiguration {
        &self.output
    }
}

fn env_path() -> Option<PathBuf> {
    std::env::var(TASKS_PATH_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(|value| expand_tilde(&value))
}
