//! SCM activity pipeline
//!
//! Turns per-line blame into measures for an analyzed resource:
//!
//! 1. [`RepositoryResolver`] builds the configured repository handle once
//! 2. [`Blame`] runs blame for a file against that handle
//! 3. The blame lines are folded into a [`MeasureUpdate`](crate::measures::MeasureUpdate)
//!
//! Resolution failures are fatal and returned as [`ResolveError`]. Blame
//! failures are logged and leave the resource's previous measures untouched.
//!
//! Blame calls block the calling thread; there is no timeout at this layer.

mod blame;
#[cfg(test)]
pub(crate) mod mock;
mod resolver;

pub use blame::Blame;
pub use resolver::RepositoryResolver;

use thiserror::Error;

use crate::scm::ScmError;

/// Failure to build the repository handle
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("SCM connection URL is not configured")]
    MissingUrl,

    #[error("Invalid SCM configuration: {}", .validation_messages.join(" "))]
    Configuration {
        validation_messages: Vec<String>,
        #[source]
        source: ScmError,
    },

    #[error("Unable to create SCM repository: {0}")]
    Client(#[source] ScmError),
}

impl From<ScmError> for ResolveError {
    fn from(err: ScmError) -> Self {
        match err {
            ScmError::Repository {
                ref validation_messages,
                ..
            } => ResolveError::Configuration {
                validation_messages: validation_messages.clone(),
                source: err,
            },
            other => ResolveError::Client(other),
        }
    }
}

impl ResolveError {
    /// Whether this is a configuration/validation problem
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ResolveError::MissingUrl | ResolveError::Configuration { .. }
        )
    }
}
