//! # Devdeck Engine
//!
//! Runs named tasks against the devdeck capability clients.
//!
//! ## Key Features
//!
//! - **Task catalog**: JSON/YAML task documents loaded once into an immutable [`TaskCatalog`]
//! - **Interpolation**: whole-value `{{ name }}` placeholders resolved against run variables
//! - **Step dispatch**: [`Action`] identifiers mapped onto capability calls by [`StepExecutor`]
//! - **Workflow runs**: sequential execution with per-step outcome persistence ([`WorkflowEngine`])
//! - **Planning**: chat turns whose proposed function calls are routed to step actions ([`PlanningAdapter`])
//! - **Mobile builds**: detached multi-stage native builds reporting through the record store ([`BuildService`])
//!
//! ## Usage
//!
//! ```rust
//! use devdeck_engine::TaskCatalog;
//!
//! let catalog = TaskCatalog::parse(r#"
//! tasks:
//!   - name: deploy
//!     steps:
//!       - action: vercel_deploy
//!         params:
//!           projectName: "{{project_name}}"
//! "#)?;
//! assert_eq!(catalog.get("deploy").map(|task| task.steps.len()), Some(1));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod action;
pub mod catalog;
mod error;
pub mod executor;
pub mod interpolate;
pub mod mobile;
pub mod planning;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use action::Action;
pub use catalog::TaskCatalog;
pub use error::EngineError;
pub use executor::{Capabilities, RunContext, StepExecutor};
pub use mobile::{BuildService, BuildStage, BuildStarted, BuildToolchain, ProcessToolchain};
pub use planning::{PlannedFunction, PlanningAdapter, Proposal};
pub use workflow::{RunPhase, WorkflowEngine};
