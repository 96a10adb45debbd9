//! Lazily-built, shared repository handle

use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, info};

use super::ResolveError;
use crate::config::ScmConfiguration;
use crate::scm::{ScmClient, ScmRepository, TrustPolicy};

/// Builds the configured repository handle on first use and caches it.
///
/// Concurrent callers wait for a single in-flight resolution and all observe
/// the same handle. A failed resolution is not cached; the next call retries.
pub struct RepositoryResolver {
    client: Arc<dyn ScmClient>,
    configuration: ScmConfiguration,
    repository: OnceCell<Arc<ScmRepository>>,
}

impl RepositoryResolver {
    pub fn new(client: Arc<dyn ScmClient>, configuration: ScmConfiguration) -> Self {
        Self {
            client,
            configuration,
            repository: OnceCell::new(),
        }
    }

    pub fn client(&self) -> &dyn ScmClient {
        self.client.as_ref()
    }

    pub fn configuration(&self) -> &ScmConfiguration {
        &self.configuration
    }

    /// Get the repository handle, building it on the first call.
    pub fn resolve(&self) -> Result<Arc<ScmRepository>, ResolveError> {
        self.repository
            .get_or_try_init(|| self.build().map(Arc::new))
            .map(Arc::clone)
    }

    /// Whether a handle has been built already
    pub fn is_resolved(&self) -> bool {
        self.repository.get().is_some()
    }

    fn build(&self) -> Result<ScmRepository, ResolveError> {
        let url = self.configuration.url().ok_or(ResolveError::MissingUrl)?;

        // Trust settings must be in place before the handle exists
        if let Some(provider) = self.configuration.provider() {
            self.apply_trust_policy(provider.trust_policy());
        }

        let mut repository = self.client.make_repository(url)?;

        if let Some(user) = self.configuration.user().filter(|u| !u.trim().is_empty()) {
            let provider_repository = repository.provider_repository_mut();
            provider_repository.set_user(user);
            provider_repository.set_password(self.configuration.password().unwrap_or(""));
        }

        info!("SCM repository: {} ({})", repository.url, repository.provider);
        Ok(repository)
    }

    fn apply_trust_policy(&self, policy: TrustPolicy) {
        match policy {
            TrustPolicy::TrustServerCertificate => {
                debug!("Trusting server certificates from unknown CAs");
                self.client.set_trust_server_cert(true);
            }
            TrustPolicy::Default => {}
        }
    }
}

impl std::fmt::Debug for RepositoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryResolver")
            .field("configuration", &self.configuration)
            .field("repository", &self.repository.get())
            .finish()
    }
}
