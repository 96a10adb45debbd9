//! Blame request and result types

use chrono::{DateTime, FixedOffset};
use std::path::PathBuf;
use std::sync::Arc;

use super::ScmRepository;

/// A blame request scoped to one file inside a directory.
#[derive(Debug, Clone)]
pub struct BlameRequest {
    pub repository: Arc<ScmRepository>,
    /// Root directory of the file set
    pub file_set_root: PathBuf,
    /// File name relative to `file_set_root`
    pub filename: String,
    /// Attribute whitespace-only edits to the previous substantive change
    pub ignore_whitespace: bool,
}

impl BlameRequest {
    pub fn new(repository: Arc<ScmRepository>, file_set_root: impl Into<PathBuf>) -> Self {
        Self {
            repository,
            file_set_root: file_set_root.into(),
            filename: String::new(),
            ignore_whitespace: false,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_ignore_whitespace(mut self, ignore: bool) -> Self {
        self.ignore_whitespace = ignore;
        self
    }

    /// Full path of the blamed file
    pub fn path(&self) -> PathBuf {
        self.file_set_root.join(&self.filename)
    }
}

/// Attribution for a single source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    pub author: String,
    pub date: DateTime<FixedOffset>,
    pub revision: String,
}

impl BlameLine {
    pub fn new(author: impl Into<String>, date: DateTime<FixedOffset>, revision: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            date,
            revision: revision.into(),
        }
    }
}

/// Result of a blame operation.
///
/// Either every line of the file is attributed, or none is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameOutcome {
    pub success: bool,
    /// Provider's explanation of a failure
    pub provider_message: Option<String>,
    /// Raw diagnostic output from the provider
    pub command_output: String,
    /// One entry per source line, in file order
    pub lines: Vec<BlameLine>,
}

impl BlameOutcome {
    pub fn success(lines: Vec<BlameLine>, command_output: impl Into<String>) -> Self {
        Self {
            success: true,
            provider_message: None,
            command_output: command_output.into(),
            lines,
        }
    }

    pub fn failure(provider_message: impl Into<String>, command_output: impl Into<String>) -> Self {
        Self {
            success: false,
            provider_message: Some(provider_message.into()),
            command_output: command_output.into(),
            lines: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}
