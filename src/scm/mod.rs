//! Version control client capability
//!
//! The activity pipeline only depends on the [`ScmClient`] trait: building a
//! repository handle from a connection URL and running blame against it.
//! [`ScmManager`] is the production implementation, dispatching to registered
//! providers (currently git, via libgit2).
//!
//! # Example
//!
//! ```no_run
//! use scm_activity::scm::{BlameRequest, ScmClient, ScmManager};
//! use std::sync::Arc;
//!
//! let manager = ScmManager::with_default_providers();
//! let repository = manager.make_repository("scm:git:/path/to/repo").unwrap();
//! let request = BlameRequest::new(Arc::new(repository), "/path/to/repo/src")
//!     .with_filename("main.rs")
//!     .with_ignore_whitespace(true);
//! let outcome = manager.blame(&request).unwrap();
//! println!("{} lines attributed", outcome.lines.len());
//! ```

mod blame;
pub mod git;
mod manager;
mod repository;

pub use blame::{BlameLine, BlameOutcome, BlameRequest};
pub use manager::{ProviderSettings, ScmManager, ScmProvider};
pub use repository::{ProviderKind, ProviderRepository, ScmRepository, ScmUrl, TrustPolicy};

use thiserror::Error;

/// Errors raised by the version control client
#[derive(Error, Debug)]
pub enum ScmError {
    /// The connection URL or provider configuration failed validation
    #[error("Invalid repository '{url}': {}", .validation_messages.join(" "))]
    Repository {
        url: String,
        validation_messages: Vec<String>,
    },

    #[error("No such provider: {0}")]
    NoSuchProvider(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScmError {
    pub(crate) fn invalid_url(url: &str, validation_messages: Vec<String>) -> Self {
        ScmError::Repository {
            url: url.to_string(),
            validation_messages,
        }
    }
}

pub type ScmResult<T> = Result<T, ScmError>;

/// The external version control capability used by the activity pipeline.
pub trait ScmClient: Send + Sync {
    /// Build a repository handle from a connection URL
    fn make_repository(&self, url: &str) -> ScmResult<ScmRepository>;

    /// Run blame for the file named by the request
    fn blame(&self, request: &BlameRequest) -> ScmResult<BlameOutcome>;

    /// Process-wide switch for trusting server certificates from unknown CAs
    fn set_trust_server_cert(&self, trust: bool);
}
