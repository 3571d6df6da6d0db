//! Access gate for protected operations

use std::future::Future;

use thiserror::Error;

use crate::identity::{Identity, User};
use crate::provider::ConnectionProvider;
use crate::scope::Scope;

/// The scope has no authenticated user. A normal outcome, recovered by the
/// caller into a redirect or a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("authentication required")]
pub struct AccessDenied;

pub struct AccessGate;

impl AccessGate {
    /// The authenticated user of `scope`, or [`AccessDenied`].
    ///
    /// An unresolved scope is treated as anonymous.
    pub fn authorize<P: ConnectionProvider>(scope: &Scope<P>) -> Result<User, AccessDenied> {
        match scope.identity() {
            Some(Identity::Authenticated(user)) => Ok(user.clone()),
            _ => {
                tracing::warn!(
                    scope_id = %scope.id(),
                    "unauthenticated access to protected operation"
                );
                Err(AccessDenied)
            }
        }
    }

    /// Run `next` with the current user, or short-circuit without calling it.
    pub async fn require<P, F, Fut, T>(scope: &Scope<P>, next: F) -> Result<T, AccessDenied>
    where
        P: ConnectionProvider,
        F: FnOnce(User) -> Fut,
        Fut: Future<Output = T>,
    {
        let user = Self::authorize(scope)?;
        Ok(next(user).await)
    }
}
