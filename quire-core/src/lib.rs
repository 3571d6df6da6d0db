//! quire-core: request-scoped connections, units of work and session identity
//!
//! Every inbound request gets one [`Scope`]. The scope owns at most one
//! connection (opened lazily through a [`ConnectionProvider`]), the identity
//! resolved from the request's session token, and any [`UnitOfWork`] that
//! runs on it. [`ScopeLifecycle`] guarantees the connection is released when
//! the request is done.

pub mod auth;
pub mod error;
pub mod gate;
pub mod identity;
pub mod lifecycle;
pub mod pg;
pub mod provider;
pub mod scope;
pub mod session;
pub mod unit_of_work;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthResolver, IdentityStore};
pub use error::{DbError, Result, TxOp};
pub use gate::{AccessDenied, AccessGate};
pub use identity::{Identity, User};
pub use lifecycle::ScopeLifecycle;
pub use pg::{create_pool, PgConn, PgProvider};
pub use provider::{ConnectionProvider, StoreConnection};
pub use scope::{Scope, ScopeCounters, ScopeHandle};
pub use session::{SessionError, SessionKeys, SessionToken};
pub use unit_of_work::UnitOfWork;
