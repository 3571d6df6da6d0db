//! Atomic write boundaries on a scope's connection
//!
//! ```ignore
//! let post = UnitOfWork::new("create_post")
//!     .run(&mut scope, move |scope| Box::pin(async move {
//!         let conn = scope.acquire().await?;
//!         PostRepo::new(conn).create(title, content, author_id).await
//!     }))
//!     .await?;
//! ```

use std::fmt::Display;

use futures::future::BoxFuture;

use crate::error::{DbError, TxOp};
use crate::provider::{ConnectionProvider, StoreConnection};
use crate::scope::Scope;

/// One commit-or-rollback decision. Consumed by [`UnitOfWork::run`].
#[derive(Debug)]
#[must_use = "a unit of work does nothing until run"]
pub struct UnitOfWork {
    label: &'static str,
}

impl UnitOfWork {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }

    /// Run `body` inside BEGIN ... COMMIT on the scope's connection.
    ///
    /// `Ok` commits. `Err` rolls back and returns the body's own error
    /// unchanged. Calling `run` on a scope that already has a unit of work
    /// open fails with [`DbError::IllegalState`] without touching the store.
    ///
    /// # Errors
    ///
    /// - the body's error, after rollback
    /// - [`DbError::Connection`] if no connection could be established
    /// - [`DbError::Transaction`] if BEGIN or COMMIT fails
    pub async fn run<P, T, E, F>(self, scope: &mut Scope<P>, body: F) -> Result<T, E>
    where
        P: ConnectionProvider,
        T: Send,
        E: From<DbError> + Display + Send,
        F: for<'s> FnOnce(&'s mut Scope<P>) -> BoxFuture<'s, Result<T, E>> + Send,
    {
        let label = self.label;
        let scope_id = scope.id();

        if scope.in_unit_of_work() {
            tracing::error!(%scope_id, unit = label, "unit of work opened inside another");
            return Err(DbError::IllegalState("unit of work already active on this scope").into());
        }

        scope.acquire().await?;
        // flagged before BEGIN is sent: a cancelled BEGIN must still roll back
        scope.set_in_unit_of_work(true);
        let begun = match scope.connection_mut() {
            Some(conn) => conn.begin().await,
            None => {
                scope.set_in_unit_of_work(false);
                return Err(DbError::IllegalState("connection missing after acquire").into());
            }
        };
        if let Err(source) = begun {
            scope.set_in_unit_of_work(false);
            scope.taint();
            let err = DbError::transaction(TxOp::Begin, source);
            tracing::error!(%scope_id, unit = label, error = %err, "begin failed");
            return Err(err.into());
        }
        tracing::debug!(%scope_id, unit = label, "unit of work started");

        let outcome = body(scope).await;

        let Some(conn) = scope.connection_mut() else {
            scope.set_in_unit_of_work(false);
            return Err(DbError::IllegalState("connection released inside unit of work").into());
        };

        match outcome {
            Ok(value) => {
                let committed = conn.commit().await;
                scope.set_in_unit_of_work(false);
                match committed {
                    Ok(()) => {
                        tracing::debug!(%scope_id, unit = label, "unit of work committed");
                        Ok(value)
                    }
                    Err(source) => {
                        scope.taint();
                        let err = DbError::transaction(TxOp::Commit, source);
                        tracing::error!(%scope_id, unit = label, error = %err, "commit failed");
                        Err(err.into())
                    }
                }
            }
            Err(cause) => {
                let rolled_back = conn.rollback().await;
                scope.set_in_unit_of_work(false);
                match rolled_back {
                    Ok(()) => {
                        tracing::debug!(
                            %scope_id,
                            unit = label,
                            error = %cause,
                            "unit of work rolled back"
                        );
                    }
                    Err(source) => {
                        scope.taint();
                        let err = DbError::transaction(TxOp::Rollback, source);
                        tracing::error!(
                            %scope_id,
                            unit = label,
                            error = %err,
                            cause = %cause,
                            "rollback failed"
                        );
                    }
                }
                Err(cause)
            }
        }
    }
}
