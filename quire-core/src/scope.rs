//! Request scope: one connection slot, one identity slot
//!
//! A [`Scope`] lives exactly as long as one inbound request. It is passed
//! explicitly (through a [`ScopeHandle`]) to everything that needs the
//! connection or the resolved identity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::Result;
use crate::identity::Identity;
use crate::provider::{ConnectionProvider, StoreConnection};

/// Open/close bookkeeping shared between a lifecycle and its scopes.
#[derive(Debug, Default)]
pub struct ScopeCounters {
    opened: AtomicU64,
    closed: AtomicU64,
}

impl ScopeCounters {
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> u64 {
        self.closed.load(Ordering::SeqCst)
    }

    /// Scopes begun but not yet ended
    pub fn active(&self) -> u64 {
        self.opened().saturating_sub(self.closed())
    }
}

pub struct Scope<P: ConnectionProvider> {
    id: Uuid,
    provider: Arc<P>,
    counters: Arc<ScopeCounters>,
    conn: Option<P::Conn>,
    identity: Option<Identity>,
    in_unit_of_work: bool,
    // connection state unknown after a failed commit/rollback
    tainted: bool,
    closed: bool,
}

impl<P: ConnectionProvider> Scope<P> {
    pub(crate) fn open(provider: Arc<P>, counters: Arc<ScopeCounters>) -> Self {
        counters.opened.fetch_add(1, Ordering::SeqCst);
        Self {
            id: Uuid::new_v4(),
            provider,
            counters,
            conn: None,
            identity: None,
            in_unit_of_work: false,
            tainted: false,
            closed: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The scope's connection, established on first call and reused after.
    pub async fn acquire(&mut self) -> Result<&mut P::Conn> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                tracing::debug!(scope_id = %self.id, "opening database connection");
                self.provider.connect().await?
            }
        };
        Ok(self.conn.insert(conn))
    }

    pub fn has_connection(&self) -> bool {
        self.conn.is_some()
    }

    /// Identity resolved for this scope; `None` until the resolver has run.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.identity.is_some()
    }

    pub fn in_unit_of_work(&self) -> bool {
        self.in_unit_of_work
    }

    pub(crate) fn set_identity(&mut self, identity: Identity) -> &Identity {
        self.identity.insert(identity)
    }

    pub(crate) fn connection_mut(&mut self) -> Option<&mut P::Conn> {
        self.conn.as_mut()
    }

    pub(crate) fn set_in_unit_of_work(&mut self, active: bool) {
        self.in_unit_of_work = active;
    }

    pub(crate) fn taint(&mut self) {
        self.tainted = true;
    }

    fn mark_closed(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Release the connection. Failures are logged, never returned.
    pub(crate) async fn close(&mut self) {
        if !self.mark_closed() {
            return;
        }

        let Some(mut conn) = self.conn.take() else {
            return;
        };

        if self.in_unit_of_work {
            tracing::warn!(
                scope_id = %self.id,
                "unit of work still open at scope end, rolling back"
            );
            self.in_unit_of_work = false;
            if let Err(e) = conn.rollback().await {
                tracing::warn!(
                    scope_id = %self.id,
                    error = %e,
                    "rollback during scope teardown failed"
                );
                self.tainted = true;
            }
        }

        if self.tainted {
            conn.abandon();
            return;
        }

        match conn.release().await {
            Ok(()) => tracing::debug!(scope_id = %self.id, "database connection released"),
            Err(e) => {
                tracing::warn!(
                    scope_id = %self.id,
                    error = %e,
                    "failed to release database connection"
                )
            }
        }
    }
}

impl<P: ConnectionProvider> Drop for Scope<P> {
    fn drop(&mut self) {
        if !self.mark_closed() {
            return;
        }
        let Some(conn) = self.conn.take() else {
            return;
        };
        // request future dropped mid-flight
        if self.in_unit_of_work || self.tainted {
            tracing::warn!(
                scope_id = %self.id,
                in_unit_of_work = self.in_unit_of_work,
                "scope dropped without teardown, discarding connection"
            );
            conn.abandon();
        } else {
            tracing::debug!(scope_id = %self.id, "scope dropped without teardown");
            drop(conn);
        }
    }
}

/// Shared, serialized access to one [`Scope`].
pub struct ScopeHandle<P: ConnectionProvider> {
    id: Uuid,
    inner: Arc<Mutex<Scope<P>>>,
}

impl<P: ConnectionProvider> Clone for ScopeHandle<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: ConnectionProvider> ScopeHandle<P> {
    pub(crate) fn new(scope: Scope<P>) -> Self {
        Self {
            id: scope.id(),
            inner: Arc::new(Mutex::new(scope)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Lock the scope. Only one flow of control touches it at a time.
    pub async fn lock(&self) -> MutexGuard<'_, Scope<P>> {
        self.inner.lock().await
    }
}
