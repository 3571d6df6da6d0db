//! Scope lifecycle: pairs every `begin` with exactly one `end`

use std::sync::Arc;

use crate::provider::ConnectionProvider;
use crate::scope::{Scope, ScopeCounters, ScopeHandle};

pub struct ScopeLifecycle<P: ConnectionProvider> {
    provider: Arc<P>,
    counters: Arc<ScopeCounters>,
}

impl<P: ConnectionProvider> Clone for ScopeLifecycle<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<P: ConnectionProvider> ScopeLifecycle<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            counters: Arc::new(ScopeCounters::default()),
        }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Open a fresh scope for one request. No connection is made yet.
    pub fn begin(&self) -> ScopeHandle<P> {
        let scope = Scope::open(Arc::clone(&self.provider), Arc::clone(&self.counters));
        tracing::trace!(scope_id = %scope.id(), "scope opened");
        ScopeHandle::new(scope)
    }

    /// Tear the scope down: roll back a unit of work left open, then release
    /// the connection. Never fails; teardown problems are logged.
    pub async fn end(&self, handle: ScopeHandle<P>) {
        let mut scope = handle.lock().await;
        scope.close().await;
        tracing::trace!(scope_id = %scope.id(), "scope closed");
    }

    pub fn counters(&self) -> &ScopeCounters {
        &self.counters
    }
}
