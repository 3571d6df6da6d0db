//! Per-request identity resolution

use async_trait::async_trait;

use crate::error::Result;
use crate::identity::{Identity, User};
use crate::provider::ConnectionProvider;
use crate::scope::Scope;
use crate::session::{SessionKeys, SessionToken};

/// User lookup the resolver needs from a connection
#[async_trait]
pub trait IdentityStore: Send {
    async fn find_user(&mut self, id: i32) -> Result<Option<User>>;
}

/// Turns a session token into the scope's [`Identity`], once per scope.
#[derive(Clone)]
pub struct AuthResolver {
    keys: SessionKeys,
}

impl AuthResolver {
    pub fn new(keys: SessionKeys) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Resolve and cache the identity for `scope`.
    ///
    /// Anonymous traffic never touches the store. A token that fails
    /// verification, or names a user that no longer exists, resolves to
    /// [`Identity::Anonymous`]. Later calls return the cached identity.
    ///
    /// # Errors
    ///
    /// Store failures while looking the user up.
    pub async fn resolve<P>(
        &self,
        scope: &mut Scope<P>,
        token: Option<&SessionToken>,
    ) -> Result<Identity>
    where
        P: ConnectionProvider,
        P::Conn: IdentityStore,
    {
        if let Some(identity) = scope.identity() {
            return Ok(identity.clone());
        }

        let identity = match token {
            None => Identity::Anonymous,
            Some(token) => match self.keys.verify(token) {
                Err(e) => {
                    tracing::debug!(
                        scope_id = %scope.id(),
                        error = %e,
                        "ignoring unusable session token"
                    );
                    Identity::Anonymous
                }
                Ok(user_id) => {
                    let user = scope.acquire().await?.find_user(user_id).await?;
                    if user.is_none() {
                        tracing::debug!(
                            scope_id = %scope.id(),
                            user_id,
                            "session names unknown user"
                        );
                    } else {
                        tracing::debug!(scope_id = %scope.id(), user_id, "loaded user");
                    }
                    Identity::from(user)
                }
            },
        };

        Ok(scope.set_identity(identity).clone())
    }
}
