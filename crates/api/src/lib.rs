//! Capability clients for the services devdeck orchestrates.
//!
//! Each external service sits behind an `async_trait` seam so the engine and
//! server can be exercised with in-memory fakes:
//!
//! - [`github::SourceControl`] backed by [`github::GitHubClient`]
//! - [`vercel::Deployment`] backed by [`vercel::VercelClient`]
//! - [`planning::Planner`] backed by [`planning::ChatCompletionsClient`]
//! - [`records::RecordStore`] backed by [`records::SupabaseClient`]
//!
//! Every operation is a single round trip with no retries. A non-success
//! response becomes [`ServiceError::External`] carrying the upstream status and
//! message.
//!
//! # Example
//!
//! ```ignore
//! use devdeck_api::{ServiceConfig, github::{GitHubClient, SourceControl}};
//!
//! async fn repos() -> anyhow::Result<()> {
//!     let config = ServiceConfig::from_env();
//!     let endpoint = config.github.expect("github has a default base url");
//!     let client = GitHubClient::new(&endpoint)?;
//!     println!("{}", client.list_repositories().await?);
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
pub mod github;
pub mod planning;
pub mod records;
pub mod vercel;

pub use client::ServiceClient;
pub use config::{DEFAULT_OPENAI_MODEL, ServiceConfig, ServiceEndpoint};
pub use error::ServiceError;
