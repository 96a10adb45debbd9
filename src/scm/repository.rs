//! Repository handles and SCM connection URLs
//!
//! Connection URLs follow the `scm:<provider>:<provider-specific>` layout.
//! A `|` may replace `:` as the delimiter when the URL itself contains colons
//! in awkward places (`scm|svn|http://host/repo`).

use std::fmt;

use super::ScmError;

/// Trust initialization applied before a repository handle is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustPolicy {
    /// Leave the client's trust settings alone
    Default,
    /// Accept server certificates signed by an unknown CA.
    ///
    /// Hostname and expiry checks still apply.
    TrustServerCertificate,
}

/// Version control provider kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Git,
    Svn,
    Hg,
    Cvs,
    Other(String),
}

impl ProviderKind {
    /// Parse a provider name (case-insensitive). Blank input yields `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let kind = match name.to_ascii_lowercase().as_str() {
            "git" => ProviderKind::Git,
            "svn" => ProviderKind::Svn,
            "hg" => ProviderKind::Hg,
            "cvs" => ProviderKind::Cvs,
            other => ProviderKind::Other(other.to_string()),
        };
        Some(kind)
    }

    /// Trust initialization table
    pub fn trust_policy(&self) -> TrustPolicy {
        match self {
            ProviderKind::Svn => TrustPolicy::TrustServerCertificate,
            ProviderKind::Git | ProviderKind::Hg | ProviderKind::Cvs | ProviderKind::Other(_) => {
                TrustPolicy::Default
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProviderKind::Git => "git",
            ProviderKind::Svn => "svn",
            ProviderKind::Hg => "hg",
            ProviderKind::Cvs => "cvs",
            ProviderKind::Other(name) => name,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed `scm:` connection URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScmUrl {
    pub provider: ProviderKind,
    /// Everything after the provider segment
    pub provider_specific: String,
}

impl ScmUrl {
    /// Parse and validate a connection URL.
    ///
    /// All problems are collected so the caller can report them together.
    pub fn parse(url: &str) -> Result<Self, ScmError> {
        let url = url.trim();
        let mut messages = Vec::new();

        let Some(rest) = url.strip_prefix("scm") else {
            messages.push("The scm url must start with 'scm'.".to_string());
            return Err(ScmError::invalid_url(url, messages));
        };

        let delimiter = match rest.chars().next() {
            Some(c @ (':' | '|')) => c,
            _ => {
                messages.push("The scm url must use ':' or '|' as delimiter.".to_string());
                return Err(ScmError::invalid_url(url, messages));
            }
        };

        let rest = &rest[1..];
        let (provider, provider_specific) = match rest.split_once(delimiter) {
            Some((provider, specific)) => (provider, specific),
            None => (rest, ""),
        };

        let provider = ProviderKind::parse(provider);
        if provider.is_none() {
            messages.push("The scm url does not contain a valid provider.".to_string());
        }
        if provider_specific.trim().is_empty() {
            messages.push("The scm url does not contain a provider-specific part.".to_string());
        }

        match provider {
            Some(provider) if messages.is_empty() => Ok(Self {
                provider,
                provider_specific: provider_specific.to_string(),
            }),
            _ => Err(ScmError::invalid_url(url, messages)),
        }
    }
}

/// Provider-specific connection details, including credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderRepository {
    /// Provider-specific location (path or remote URL)
    pub location: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ProviderRepository {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            user: None,
            password: None,
        }
    }

    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = Some(user.into());
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = Some(password.into());
    }
}

/// A configured connection to a version-control repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScmRepository {
    pub provider: ProviderKind,
    /// The connection URL this handle was built from
    pub url: String,
    pub provider_repository: ProviderRepository,
}

impl ScmRepository {
    pub fn new(provider: ProviderKind, url: impl Into<String>, provider_repository: ProviderRepository) -> Self {
        Self {
            provider,
            url: url.into(),
            provider_repository,
        }
    }

    pub fn provider_repository_mut(&mut self) -> &mut ProviderRepository {
        &mut self.provider_repository
    }
}
