//! Provider registry implementing [`ScmClient`]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::git::GitScmProvider;
use super::{
    BlameOutcome, BlameRequest, ProviderKind, ProviderRepository, ScmClient, ScmError,
    ScmRepository, ScmResult, ScmUrl,
};

/// A single version control backend.
pub trait ScmProvider: Send + Sync {
    /// Build the provider-specific part of a repository handle
    fn make_provider_repository(&self, provider_specific: &str) -> ScmResult<ProviderRepository>;

    fn blame(
        &self,
        repository: &ScmRepository,
        request: &BlameRequest,
        settings: &ProviderSettings,
    ) -> ScmResult<BlameOutcome>;
}

/// Client settings shared by every provider of a manager.
#[derive(Debug, Default)]
pub struct ProviderSettings {
    trust_server_cert: AtomicBool,
}

impl ProviderSettings {
    pub fn is_trust_server_cert(&self) -> bool {
        self.trust_server_cert.load(Ordering::SeqCst)
    }

    pub fn set_trust_server_cert(&self, trust: bool) {
        self.trust_server_cert.store(trust, Ordering::SeqCst);
    }
}

/// Dispatches repository construction and blame to registered providers.
#[derive(Default)]
pub struct ScmManager {
    providers: HashMap<ProviderKind, Box<dyn ScmProvider>>,
    settings: ProviderSettings,
}

impl ScmManager {
    /// Create a manager with no providers registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager with every built-in provider registered.
    pub fn with_default_providers() -> Self {
        let mut manager = Self::new();
        manager.register(ProviderKind::Git, Box::new(GitScmProvider::new()));
        manager
    }

    pub fn register(&mut self, kind: ProviderKind, provider: Box<dyn ScmProvider>) {
        debug!("Registered SCM provider: {}", kind);
        self.providers.insert(kind, provider);
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn provider(&self, kind: &ProviderKind) -> ScmResult<&dyn ScmProvider> {
        self.providers
            .get(kind)
            .map(|p| &**p)
            .ok_or_else(|| ScmError::NoSuchProvider(kind.to_string()))
    }
}

impl std::fmt::Debug for ScmManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.providers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("ScmManager")
            .field("providers", &kinds)
            .field("settings", &self.settings)
            .finish()
    }
}

impl ScmClient for ScmManager {
    fn make_repository(&self, url: &str) -> ScmResult<ScmRepository> {
        let parsed = ScmUrl::parse(url)?;
        let provider = self.provider(&parsed.provider)?;
        let provider_repository = provider.make_provider_repository(&parsed.provider_specific)?;
        Ok(ScmRepository::new(parsed.provider, url, provider_repository))
    }

    fn blame(&self, request: &BlameRequest) -> ScmResult<BlameOutcome> {
        let repository = request.repository.as_ref();
        let provider = self.provider(&repository.provider)?;
        provider.blame(repository, request, &self.settings)
    }

    fn set_trust_server_cert(&self, trust: bool) {
        self.settings.set_trust_server_cert(trust);
    }
}
