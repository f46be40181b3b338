//! repodrive - repository-backed file storage gateway
//!
//! Serves aggregated details (total size, file count, last modification) of
//! paths in a GitHub repository, computed on demand from the contents and
//! commits APIs.

pub mod config;
pub mod details;
pub mod error;
pub mod logging;
pub mod upstream;
pub mod web;

pub use config::Config;
pub use details::{Aggregator, CommitDateResolver, Details, Summary};
pub use error::{ErrorKind, RepoDriveError, Result};
pub use upstream::{ContentStore, Entry, EntryKind, GitHubClient};
pub use web::WebServer;
