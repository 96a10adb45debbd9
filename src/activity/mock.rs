//! In-memory [`ScmClient`] for pipeline tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::scm::{
    BlameOutcome, BlameRequest, ProviderKind, ProviderRepository, ScmClient, ScmRepository,
    ScmResult,
};

type MakeFn = dyn Fn(&str, &MockScmClient) -> ScmResult<ScmRepository> + Send + Sync;
type BlameFn = dyn Fn(&BlameRequest) -> ScmResult<BlameOutcome> + Send + Sync;

pub(crate) struct MockScmClient {
    pub make_calls: AtomicUsize,
    pub trust_calls: AtomicUsize,
    pub trust_server_cert: AtomicBool,
    pub requests: Mutex<Vec<BlameRequest>>,
    make: Box<MakeFn>,
    blame: Box<BlameFn>,
}

impl MockScmClient {
    pub fn new() -> Self {
        Self {
            make_calls: AtomicUsize::new(0),
            trust_calls: AtomicUsize::new(0),
            trust_server_cert: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
            make: Box::new(|url: &str, _: &MockScmClient| Ok(Self::repository(url))),
            blame: Box::new(|_: &BlameRequest| Ok(BlameOutcome::success(Vec::new(), ""))),
        }
    }

    pub fn repository(url: &str) -> ScmRepository {
        ScmRepository::new(ProviderKind::Git, url, ProviderRepository::new(url))
    }

    pub fn with_make<F>(mut self, make: F) -> Self
    where
        F: Fn(&str, &MockScmClient) -> ScmResult<ScmRepository> + Send + Sync + 'static,
    {
        self.make = Box::new(make);
        self
    }

    pub fn with_blame<F>(mut self, blame: F) -> Self
    where
        F: Fn(&BlameRequest) -> ScmResult<BlameOutcome> + Send + Sync + 'static,
    {
        self.blame = Box::new(blame);
        self
    }

    pub fn last_request(&self) -> Option<BlameRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl ScmClient for MockScmClient {
    fn make_repository(&self, url: &str) -> ScmResult<ScmRepository> {
        self.make_calls.fetch_add(1, Ordering::SeqCst);
        (self.make)(url, self)
    }

    fn blame(&self, request: &BlameRequest) -> ScmResult<BlameOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        (self.blame)(request)
    }

    fn set_trust_server_cert(&self, trust: bool) {
        self.trust_calls.fetch_add(1, Ordering::SeqCst);
        self.trust_server_cert.store(trust, Ordering::SeqCst);
    }
}
