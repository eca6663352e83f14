//! Request-scoped unit of work. A session owns one pooled connection for its whole life and
//! gives it back when dropped, whichever way the owner exits.

use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::any::Any;
use sqlx::pool::PoolConnection;
use sqlx::{AnyConnection, Transaction};
use std::ops::{Deref, DerefMut};
use std::time::Instant;
use uuid::Uuid;

pub struct Session {
    id: Uuid,
    opened_at: Instant,
    conn: PoolConnection<Any>,
}

impl Session {
    pub(crate) fn new(conn: PoolConnection<Any>) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(session = %id, "session opened");
        Session {
            id,
            opened_at: Instant::now(),
            conn,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Start a transaction on this session. Work not committed is rolled back when the
    /// transaction is dropped.
    pub async fn begin(&mut self) -> Result<Transaction<'_, Any>, AppError> {
        let tx = sqlx::Connection::begin(&mut *self.conn).await?;
        Ok(tx)
    }

    /// Release the session now instead of at end of scope.
    pub fn close(self) {}
}

impl Deref for Session {
    type Target = AnyConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        tracing::debug!(
            session = %self.id,
            elapsed_ms = self.opened_at.elapsed().as_millis() as u64,
            "session released"
        );
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}

/// Handlers that name `Session` get one per request; it is released when the handler returns.
#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        state.engine.session().await
    }
}
