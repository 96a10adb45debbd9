//! SCM connection settings
//!
//! Supports loading config from (lowest to highest priority):
//! - ~/.config/scm-activity/config.toml
//! - `scm-activity.toml` in the project base directory
//! - Environment variables (`SCM_URL`, `SCM_PROVIDER`, `SCM_USER`, `SCM_PASSWORD`)
//!
//! ```toml
//! [scm]
//! url = "scm:git:https://example.com/project.git"
//! provider = "git"
//! user = "ci"
//! password = ""
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::scm::{ProviderKind, ScmUrl};

/// Project-level config file name
pub const PROJECT_CONFIG_FILE: &str = "scm-activity.toml";

#[derive(Debug, Default, Deserialize, Serialize)]
struct ConfigFile {
    #[serde(default)]
    scm: ScmSection,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
struct ScmSection {
    url: Option<String>,
    provider: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

/// Connection settings for the analyzed project's repository.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScmConfiguration {
    url: Option<String>,
    provider: Option<String>,
    user: Option<String>,
    password: Option<String>,
    /// URL guessed from the project layout, used when none is configured
    guessed_url: Option<String>,
}

impl ScmConfiguration {
    /// Load settings for the project rooted at `basedir`.
    pub fn load(basedir: &Path) -> Self {
        let user_file = Self::user_config_path();
        Self::load_from(basedir, user_file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Load settings with an explicit user config file and environment lookup.
    pub fn load_from<F>(basedir: &Path, user_file: Option<&Path>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ScmConfiguration::default();

        if let Some(section) = user_file.and_then(read_config_file) {
            config.merge(section);
        }
        if let Some(section) = read_config_file(&basedir.join(PROJECT_CONFIG_FILE)) {
            config.merge(section);
        }

        // Environment variables override everything
        config.merge(ScmSection {
            url: env("SCM_URL"),
            provider: env("SCM_PROVIDER"),
            user: env("SCM_USER"),
            password: env("SCM_PASSWORD"),
        });

        config.guessed_url = guess_url(basedir);
        config
    }

    /// Build a configuration directly, without guessing.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("scm-activity").join("config.toml"))
    }

    fn merge(&mut self, other: ScmSection) {
        if other.url.is_some() {
            self.url = other.url;
        }
        if other.provider.is_some() {
            self.provider = other.provider;
        }
        if other.user.is_some() {
            self.user = other.user;
        }
        if other.password.is_some() {
            self.password = other.password;
        }
    }

    /// Connection URL, falling back to the guessed one
    pub fn url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .or(self.guessed_url.as_deref())
    }

    /// Provider kind, falling back to the provider segment of the URL
    pub fn provider(&self) -> Option<ProviderKind> {
        self.provider
            .as_deref()
            .and_then(ProviderKind::parse)
            .or_else(|| self.url().and_then(|u| ScmUrl::parse(u).ok()).map(|u| u.provider))
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

fn read_config_file(path: &Path) -> Option<ScmSection> {
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            debug!("Loaded SCM config from {}", path.display());
            Some(file.scm)
        }
        Err(e) => {
            warn!("Failed to load {}: {}", path.display(), e);
            None
        }
    }
}

/// Guess a connection URL from version control metadata in `basedir` or its parents.
pub fn guess_url(basedir: &Path) -> Option<String> {
    let basedir = basedir.canonicalize().unwrap_or_else(|_| basedir.to_path_buf());
    for dir in basedir.ancestors() {
        if dir.join(".git").exists() {
            return Some(format!("scm:git:{}", dir.display()));
        }
        if dir.join(".hg").is_dir() {
            return Some(format!("scm:hg:{}", dir.display()));
        }
    }
    None
}
